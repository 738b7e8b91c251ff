//! TypeScript declarations for the messages, enums and methods of the root file.

use std::{collections::HashSet, fmt::Display, path::Path};

use crate::{
    merge::{overwrite, WriteOutcome},
    model::{Comments, Field, MessageId, Model},
    names::{enum_qualified_name, flatten, nearest_scope, qualified_name},
    symbols::SymbolTable,
    Error,
};

const INDENT: &str = "    ";

pub(super) fn generate(model: &Model, path: &Path) -> Result<WriteOutcome, Error> {
    overwrite(path, &render(model))
}

pub(crate) fn render(model: &Model) -> String {
    let file = model.root();
    let symbols = model.symbols();
    let mut w = Writer::default();

    w.line("// Code generated by rpcgen. DO NOT EDIT.");
    w.blank();
    w.line(format_args!("declare namespace {} {{", file.service()));
    w.indent += 1;

    for &id in file.enums() {
        let enu = symbols.enum_(id);
        w.line(format_args!(
            "export const enum {} {{",
            flatten(&enum_qualified_name(symbols, id))
        ));
        w.indent += 1;
        for value in enu.values() {
            for line in &value.comments.leading {
                w.line(format_args!("//{}", line));
            }
            match &value.comments.trailing {
                Some(trailing) => {
                    w.line(format_args!("{} = {}, //{}", value.name, value.number, trailing))
                }
                None => w.line(format_args!("{} = {},", value.name, value.number)),
            }
        }
        w.indent -= 1;
        w.line("}");
        w.blank();
    }

    let declared: HashSet<String> = file
        .messages()
        .iter()
        .map(|&id| flatten(&qualified_name(symbols, id)))
        .chain(
            file.enums()
                .iter()
                .map(|&id| flatten(&enum_qualified_name(symbols, id))),
        )
        .collect();

    for &id in file.messages() {
        w.line(format_args!(
            "export interface {} {{",
            flatten(&qualified_name(symbols, id))
        ));
        w.indent += 1;
        for (idx, field) in symbols.message(id).fields().iter().enumerate() {
            if idx != 0 && !field.comments().leading.is_empty() {
                w.blank();
            }
            for line in &field.comments().leading {
                w.line(format_args!("//{}", line));
            }

            let decl = match field {
                Field::Normal {
                    name, ty, repeated, ..
                } => {
                    let scoped = scoped_type(symbols, &declared, id, ty);
                    let ty = ts_type(&scoped);
                    if *repeated {
                        format!("{}?: Array<{}>;", name, ty)
                    } else {
                        format!("{}?: {};", name, ty)
                    }
                }
                Field::Map {
                    name,
                    key_ty,
                    value_ty,
                    ..
                } => format!(
                    "{}?: {{[key: {}]: {}}};",
                    name,
                    ts_type(key_ty),
                    ts_type(&scoped_type(symbols, &declared, id, value_ty))
                ),
            };
            w.line(format_args!("{}{}", decl, trailing(field.comments())));
        }
        w.indent -= 1;
        w.line("}");
        w.blank();
    }

    w.line(format_args!("export interface {}Service {{", file.service()));
    w.indent += 1;
    for (idx, method) in file.methods().iter().enumerate() {
        if idx != 0 && !method.comment_lines.is_empty() {
            w.blank();
        }
        for line in &method.comment_lines {
            w.line(format_args!("//{}", line));
        }
        w.line(format_args!(
            "{}: (r:{}) => {};",
            method.name, method.request, method.response
        ));
    }
    w.indent -= 1;
    w.line("}");
    w.indent -= 1;
    w.line("}");

    w.out
}

/// Qualifies an undotted type name with the nearest enclosing scope declaring it, if the
/// flattened result names a type of this file.
fn scoped_type(
    symbols: &SymbolTable,
    declared: &HashSet<String>,
    from: MessageId,
    ty: &str,
) -> String {
    if !ty.contains('.') {
        if let Some(scope) = nearest_scope(symbols, from, ty) {
            let candidate = flatten(&format!("{}.{}", scope, ty));
            if declared.contains(&candidate) {
                return candidate;
            }
        }
    }
    ty.to_owned()
}

fn ts_type(ty: &str) -> &str {
    match ty {
        "string" | "uint64" | "int64" | "bytes" => "string",
        "uint32" | "int32" | "float" | "double" => "number",
        "bool" => "boolean",
        _ => ty,
    }
}

fn trailing(comments: &Comments) -> String {
    match &comments.trailing {
        Some(trailing) => format!(" //{}", trailing),
        None => String::new(),
    }
}

#[derive(Default)]
struct Writer {
    out: String,
    indent: usize,
}

impl Writer {
    fn line(&mut self, line: impl Display) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(&line.to_string());
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }
}
