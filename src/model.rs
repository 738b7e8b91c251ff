//! The semantic model built from parsed protobuf files.

use std::fmt;

use prost_types::{FileDescriptorProto, FileDescriptorSet};

use crate::{errcode::ErrCodeRegistry, file::FileResolver, symbols::SymbolTable, Error};

/// The state of one generation run: every loaded file, the symbol table with resolved field
/// types, and the error-code registry.
///
/// Created by [`Compiler::finish`](crate::Compiler::finish).
pub struct Model {
    pub(crate) files: Vec<ProtoFile>,
    pub(crate) descriptors: Vec<FileDescriptorProto>,
    pub(crate) root: usize,
    pub(crate) symbols: SymbolTable,
    pub(crate) err_codes: ErrCodeRegistry,
    pub(crate) resolver: Box<dyn FileResolver>,
}

impl Model {
    /// The file passed to [`Compiler::add_file`](crate::Compiler::add_file).
    pub fn root(&self) -> &ProtoFile {
        &self.files[self.root]
    }

    /// All loaded files. Imported files come before the files that import them.
    pub fn files(&self) -> &[ProtoFile] {
        &self.files
    }

    /// Looks up a loaded file by its import path.
    pub fn file(&self, name: &str) -> Option<&ProtoFile> {
        self.files.iter().find(|file| file.name == name)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn err_codes(&self) -> &ErrCodeRegistry {
        &self.err_codes
    }

    /// Looks up an error code, parsing `<module>.proto` through the include paths if its module
    /// has not been loaded yet.
    pub fn err_code(&self, module: &str, symbol: &str) -> Result<i32, Error> {
        self.err_codes
            .get_auto_load(module, symbol, self.resolver.as_ref())
    }

    /// The parsed descriptors of every loaded file, in load order.
    pub fn file_descriptor_set(&self) -> FileDescriptorSet {
        FileDescriptorSet {
            file: self.descriptors.clone(),
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("files", &self.files)
            .field("root", &self.root)
            .field("symbols", &self.symbols)
            .field("err_codes", &self.err_codes)
            .finish_non_exhaustive()
    }
}

/// Identifies a [`Message`] stored in a [`SymbolTable`](crate::SymbolTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub(crate) u32);

/// Identifies an [`Enum`] stored in a [`SymbolTable`](crate::SymbolTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumId(pub(crate) u32);

impl MessageId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl EnumId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Everything extracted from a single protobuf source file.
#[derive(Debug, Clone, Default)]
pub struct ProtoFile {
    pub(crate) name: String,
    pub(crate) module: String,
    pub(crate) package: String,
    pub(crate) service: String,
    pub(crate) go_package: String,
    pub(crate) methods: Vec<RpcMethod>,
    pub(crate) err_codes: Vec<ErrCodeSet>,
    pub(crate) imports: Vec<ImportEdge>,
    pub(crate) dependencies: Vec<String>,
    pub(crate) messages: Vec<MessageId>,
    pub(crate) enums: Vec<EnumId>,
}

impl ProtoFile {
    /// The normalized import path of this file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module name used to qualify messages declared in this file.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The protobuf package name, or an empty string.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// The service name. Falls back to the package name if the file declares no service.
    pub fn service(&self) -> &str {
        if self.service.is_empty() {
            &self.package
        } else {
            &self.service
        }
    }

    /// The `go_package` option, or an empty string.
    pub fn go_package(&self) -> &str {
        &self.go_package
    }

    /// The last component of the `go_package` option, used to qualify types in Go source.
    pub fn go_package_name(&self) -> &str {
        go_package_name(&self.go_package)
    }

    /// The import path part of the `go_package` option, without any `;name` suffix.
    pub fn go_import_path(&self) -> &str {
        go_import_path(&self.go_package)
    }

    /// RPC methods in declaration order.
    pub fn methods(&self) -> &[RpcMethod] {
        &self.methods
    }

    /// Looks up an RPC method by name.
    pub fn method(&self, name: &str) -> Option<&RpcMethod> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// Enums whose name ends with [`ERR_CODE_SUFFIX`].
    pub fn err_codes(&self) -> &[ErrCodeSet] {
        &self.err_codes
    }

    /// Imports of files which declare an output package.
    pub fn imports(&self) -> &[ImportEdge] {
        &self.imports
    }

    /// Every import statement of this file, including well-known ones.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// All messages declared in this file, including nested ones, in declaration order.
    pub fn messages(&self) -> &[MessageId] {
        &self.messages
    }

    /// All enums declared in this file, including nested ones, in declaration order.
    pub fn enums(&self) -> &[EnumId] {
        &self.enums
    }
}

pub(crate) fn go_import_path(go_package: &str) -> &str {
    match go_package.find(';') {
        Some(idx) => &go_package[..idx],
        None => go_package,
    }
}

/// Formats a `go_package` option as an import spec, aliased if the package name differs from
/// the last path segment.
pub(crate) fn go_import(go_package: &str) -> String {
    let path = go_import_path(go_package);
    let name = go_package_name(go_package);
    if go_package_name(path) == name {
        path.to_owned()
    } else {
        format!("{} \"{}\"", name, path)
    }
}

pub(crate) fn go_package_name(go_package: &str) -> &str {
    let path = match go_package.find(';') {
        Some(idx) => &go_package[idx + 1..],
        None => go_package,
    };
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// An `import` of a file declaring an output package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEdge {
    /// The path as written in the `import` statement.
    pub path: String,
    /// The `go_package` option of the imported file.
    pub go_package: String,
}

/// Enums with this suffix are treated as error-code tables.
pub const ERR_CODE_SUFFIX: &str = "ErrCode";

/// A set of error codes declared as an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrCodeSet {
    pub name: String,
    pub values: Vec<EnumValue>,
}

/// An RPC method with its extension options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RpcMethod {
    pub name: String,
    pub request: String,
    pub response: String,
    /// The `CmdID` option. Zero if unset.
    pub cmd_id: u32,
    /// The `Url` option. Empty if unset.
    pub url: String,
    /// The `Flags` option. Zero if unset.
    pub flags: u32,
    pub comment_lines: Vec<String>,
}

/// Comments attached to a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Comments {
    /// Lines of the comment preceding the declaration, without the `//` marker.
    pub leading: Vec<String>,
    /// The first line of a comment on the same line as the declaration.
    pub trailing: Option<String>,
}

impl Comments {
    pub(crate) fn new(leading: Option<&str>, trailing: Option<&str>) -> Self {
        Comments {
            leading: leading.map(comment_lines).unwrap_or_default(),
            trailing: trailing
                .and_then(|trailing| comment_lines(trailing).into_iter().next()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.leading.is_empty() && self.trailing.is_none()
    }
}

pub(crate) fn comment_lines(comment: &str) -> Vec<String> {
    comment
        .strip_suffix('\n')
        .unwrap_or(comment)
        .split('\n')
        .map(ToOwned::to_owned)
        .collect()
}

/// A message declaration.
#[derive(Debug, Clone)]
pub struct Message {
    pub(crate) name: String,
    pub(crate) module: String,
    pub(crate) parent: Option<MessageId>,
    pub(crate) fields: Vec<Field>,
    pub(crate) nested: Vec<MessageId>,
    pub(crate) enums: Vec<EnumId>,
    pub(crate) comments: Comments,
    pub(crate) dup_count: u32,
}

impl Message {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// The enclosing message, if this message is nested.
    pub fn parent(&self) -> Option<MessageId> {
        self.parent
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Messages declared directly inside this one.
    pub fn nested(&self) -> &[MessageId] {
        &self.nested
    }

    /// Enums declared directly inside this one.
    pub fn enums(&self) -> &[EnumId] {
        &self.enums
    }

    pub fn comments(&self) -> &Comments {
        &self.comments
    }

    /// How many other messages share this message's module-qualified name.
    pub fn dup_count(&self) -> u32 {
        self.dup_count
    }

    /// The key of this message in the symbol table.
    pub fn key(&self) -> String {
        symbol_key(&self.module, &self.name)
    }
}

pub(crate) fn symbol_key(module: &str, name: &str) -> String {
    format!("{}_{}", module, name)
}

/// A message field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// A scalar or message field.
    Normal {
        name: String,
        ty: String,
        repeated: bool,
        comments: Comments,
        message: Option<MessageId>,
    },
    /// A `map<K, V>` field.
    Map {
        name: String,
        key_ty: String,
        value_ty: String,
        comments: Comments,
        message: Option<MessageId>,
    },
}

impl Field {
    pub fn name(&self) -> &str {
        match self {
            Field::Normal { name, .. } | Field::Map { name, .. } => name,
        }
    }

    /// The type name to resolve: the element type, or the value type of a map.
    pub fn ty(&self) -> &str {
        match self {
            Field::Normal { ty, .. } => ty,
            Field::Map { value_ty, .. } => value_ty,
        }
    }

    pub fn comments(&self) -> &Comments {
        match self {
            Field::Normal { comments, .. } | Field::Map { comments, .. } => comments,
        }
    }

    /// The message this field's type resolved to, if resolution succeeded.
    pub fn message(&self) -> Option<MessageId> {
        match self {
            Field::Normal { message, .. } | Field::Map { message, .. } => *message,
        }
    }

    pub(crate) fn set_message(&mut self, id: MessageId) {
        match self {
            Field::Normal { message, .. } | Field::Map { message, .. } => *message = Some(id),
        }
    }
}

/// An enum declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    pub(crate) name: String,
    pub(crate) module: String,
    pub(crate) parent: Option<MessageId>,
    pub(crate) values: Vec<EnumValue>,
}

impl Enum {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn parent(&self) -> Option<MessageId> {
        self.parent
    }

    pub fn values(&self) -> &[EnumValue] {
        &self.values
    }

    pub fn is_err_code(&self) -> bool {
        self.name.ends_with(ERR_CODE_SUFFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
    pub comments: Comments,
}
