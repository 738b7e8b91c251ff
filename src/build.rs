//! Converts a parsed [`FileDescriptorProto`] into a [`ProtoFile`] and populates the symbol table.

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use prost_types::{
    field_descriptor_proto::{Label, Type},
    source_code_info::Location,
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileOptions, MethodDescriptorProto,
    UninterpretedOption,
};

use crate::{
    file::File,
    model::{
        Comments, Enum, EnumValue, ErrCodeSet, Field, Message, MessageId, ProtoFile, RpcMethod,
    },
    symbols::SymbolTable,
    tag,
};

const CMD_ID_OPTION: &str = "CmdID";
const URL_OPTION: &str = "Url";
const FLAGS_OPTION: &str = "Flags";
const GO_PACKAGE_OPTION: &str = "go_package";

/// Walks a parsed file once, registering its messages and enums in `symbols`.
///
/// Import edges are left empty: they depend on other files of the import closure and are
/// filled in by the compiler.
pub(crate) fn build_file(file: &File, symbols: &mut SymbolTable) -> ProtoFile {
    let descriptor = file.file_descriptor_proto();
    let locations = descriptor
        .source_code_info
        .as_ref()
        .map(|info| {
            info.location
                .iter()
                .map(|location| (location.path.as_slice(), location))
                .collect()
        })
        .unwrap_or_default();

    let mut builder = Builder {
        symbols,
        locations,
        path: Vec::new(),
        file: ProtoFile {
            name: file.name().to_owned(),
            module: file.module().to_owned(),
            package: descriptor.package().to_owned(),
            go_package: go_package(descriptor.options.as_ref()).unwrap_or_default(),
            dependencies: descriptor.dependency.clone(),
            ..Default::default()
        },
    };

    for (index, message) in descriptor.message_type.iter().enumerate() {
        builder.path.extend([tag::file::MESSAGE_TYPE, index as i32]);
        builder.add_message(message, None);
        builder.pop_path();
    }

    for (index, enu) in descriptor.enum_type.iter().enumerate() {
        builder.path.extend([tag::file::ENUM_TYPE, index as i32]);
        builder.add_enum(enu, None);
        builder.pop_path();
    }

    for (service_index, service) in descriptor.service.iter().enumerate() {
        if builder.file.service.is_empty() {
            builder.file.service = service.name().to_owned();
        }

        for (index, method) in service.method.iter().enumerate() {
            builder.path.extend([
                tag::file::SERVICE,
                service_index as i32,
                tag::service::METHOD,
                index as i32,
            ]);
            builder.add_method(method);
            builder.path.truncate(builder.path.len() - 4);
        }
    }

    builder.file
}

struct Builder<'a, 'd> {
    symbols: &'a mut SymbolTable,
    locations: HashMap<&'d [i32], &'d Location>,
    path: Vec<i32>,
    file: ProtoFile,
}

impl<'a, 'd> Builder<'a, 'd> {
    fn pop_path(&mut self) {
        self.path.truncate(self.path.len() - 2);
    }

    fn comments(&self) -> Comments {
        match self.locations.get(self.path.as_slice()) {
            Some(location) => Comments::new(
                location.leading_comments.as_deref(),
                location.trailing_comments.as_deref(),
            ),
            None => Comments::default(),
        }
    }

    fn add_message(&mut self, message: &DescriptorProto, parent: Option<MessageId>) {
        let mut fields = Vec::with_capacity(message.field.len());
        for (index, field) in message.field.iter().enumerate() {
            self.path.extend([tag::message::FIELD, index as i32]);
            fields.push(self.field(message, field));
            self.pop_path();
        }

        let id = self.symbols.add_message(Message {
            name: message.name().to_owned(),
            module: self.file.module.clone(),
            parent,
            fields,
            nested: Vec::new(),
            enums: Vec::new(),
            comments: self.comments(),
            dup_count: 0,
        });
        self.file.messages.push(id);
        if let Some(parent) = parent {
            self.symbols.message_mut(parent).nested.push(id);
        }

        for (index, nested) in message.nested_type.iter().enumerate() {
            if is_map_entry(nested) {
                continue;
            }

            self.path.extend([tag::message::NESTED_TYPE, index as i32]);
            self.add_message(nested, Some(id));
            self.pop_path();
        }

        for (index, enu) in message.enum_type.iter().enumerate() {
            self.path.extend([tag::message::ENUM_TYPE, index as i32]);
            self.add_enum(enu, Some(id));
            self.pop_path();
        }
    }

    fn field(&self, message: &DescriptorProto, field: &FieldDescriptorProto) -> Field {
        let comments = self.comments();
        let repeated = field.label() == Label::Repeated;

        if repeated {
            if let Some(entry) = field
                .type_name
                .as_deref()
                .and_then(|type_name| map_entry(message, type_name))
            {
                let (key_ty, value_ty) = map_entry_types(entry);
                return Field::Map {
                    name: field.name().to_owned(),
                    key_ty,
                    value_ty,
                    comments,
                    message: None,
                };
            }
        }

        Field::Normal {
            name: field.name().to_owned(),
            ty: field_type_name(field),
            repeated,
            comments,
            message: None,
        }
    }

    fn add_enum(&mut self, enu: &EnumDescriptorProto, parent: Option<MessageId>) {
        let mut values = Vec::with_capacity(enu.value.len());
        for (index, value) in enu.value.iter().enumerate() {
            self.path.extend([tag::enum_::VALUE, index as i32]);
            values.push(EnumValue {
                name: value.name().to_owned(),
                number: value.number(),
                comments: self.comments(),
            });
            self.pop_path();
        }

        let enu = Enum {
            name: enu.name().to_owned(),
            module: self.file.module.clone(),
            parent,
            values,
        };
        if enu.is_err_code() {
            self.file.err_codes.push(ErrCodeSet {
                name: enu.name.clone(),
                values: enu.values.clone(),
            });
        }

        let id = self.symbols.add_enum(enu);
        self.file.enums.push(id);
        if let Some(parent) = parent {
            self.symbols.message_mut(parent).enums.push(id);
        }
    }

    fn add_method(&mut self, method: &MethodDescriptorProto) {
        let mut rpc = RpcMethod {
            name: method.name().to_owned(),
            request: strip_leading_dot(method.input_type()).to_owned(),
            response: strip_leading_dot(method.output_type()).to_owned(),
            comment_lines: self.comments().leading,
            ..Default::default()
        };

        let options = method
            .options
            .as_ref()
            .map(|options| options.uninterpreted_option.as_slice())
            .unwrap_or_default();
        for option in options {
            match extension_name(option) {
                Some(CMD_ID_OPTION) => rpc.cmd_id = int_value(option),
                Some(URL_OPTION) => rpc.url = string_value(option).unwrap_or_default(),
                Some(FLAGS_OPTION) => rpc.flags = int_value(option),
                _ => (),
            }
        }

        if rpc.cmd_id == 0 {
            tracing::warn!(
                file = self.file.name.as_str(),
                method = rpc.name.as_str(),
                "method is missing the CmdID option"
            );
        }

        self.file.methods.push(rpc);
    }
}

fn go_package(options: Option<&FileOptions>) -> Option<String> {
    let options = options?;
    if let Some(go_package) = &options.go_package {
        return Some(go_package.clone());
    }

    options
        .uninterpreted_option
        .iter()
        .find(|option| {
            matches!(
                option.name.as_slice(),
                [part] if !part.is_extension && part.name_part == GO_PACKAGE_OPTION
            )
        })
        .and_then(string_value)
}

/// Returns the last component of a custom option name such as `(ext.CmdID)`.
fn extension_name(option: &UninterpretedOption) -> Option<&str> {
    match option.name.as_slice() {
        [part] if part.is_extension => {
            let name = part.name_part.as_str();
            Some(match name.rfind('.') {
                Some(dot) => &name[dot + 1..],
                None => name,
            })
        }
        _ => None,
    }
}

fn int_value(option: &UninterpretedOption) -> u32 {
    match option.positive_int_value {
        Some(value) => u32::try_from(value).unwrap_or_else(|_| {
            tracing::warn!(value, "option value out of range");
            0
        }),
        None => 0,
    }
}

fn string_value(option: &UninterpretedOption) -> Option<String> {
    option
        .string_value
        .as_deref()
        .map(|value| String::from_utf8_lossy(value).into_owned())
}

fn is_map_entry(message: &DescriptorProto) -> bool {
    if let Some(map_entry) = message.options.as_ref().and_then(|options| options.map_entry) {
        return map_entry;
    }

    message.name().ends_with("Entry")
        && matches!(
            message.field.as_slice(),
            [key, value] if key.name() == "key"
                && key.number() == 1
                && value.name() == "value"
                && value.number() == 2
        )
}

fn map_entry<'m>(message: &'m DescriptorProto, type_name: &str) -> Option<&'m DescriptorProto> {
    let name = match type_name.rfind('.') {
        Some(dot) => &type_name[dot + 1..],
        None => type_name,
    };

    message
        .nested_type
        .iter()
        .find(|nested| nested.name() == name && is_map_entry(nested))
}

fn map_entry_types(entry: &DescriptorProto) -> (String, String) {
    let ty = |name: &str| {
        entry
            .field
            .iter()
            .find(|field| field.name() == name)
            .map(field_type_name)
            .unwrap_or_default()
    };
    (ty("key"), ty("value"))
}

fn field_type_name(field: &FieldDescriptorProto) -> String {
    match field.type_name.as_deref() {
        Some(type_name) => strip_leading_dot(type_name).to_owned(),
        None => scalar_name(field.r#type()).to_owned(),
    }
}

fn strip_leading_dot(name: &str) -> &str {
    name.strip_prefix('.').unwrap_or(name)
}

pub(crate) fn scalar_name(ty: Type) -> &'static str {
    match ty {
        Type::Double => "double",
        Type::Float => "float",
        Type::Int64 => "int64",
        Type::Uint64 => "uint64",
        Type::Int32 => "int32",
        Type::Fixed64 => "fixed64",
        Type::Fixed32 => "fixed32",
        Type::Bool => "bool",
        Type::String => "string",
        Type::Group => "group",
        Type::Message => "message",
        Type::Bytes => "bytes",
        Type::Uint32 => "uint32",
        Type::Enum => "enum",
        Type::Sfixed32 => "sfixed32",
        Type::Sfixed64 => "sfixed64",
        Type::Sint32 => "sint32",
        Type::Sint64 => "sint64",
    }
}
