//! Qualified names of nested declarations.

use crate::{
    model::{EnumId, MessageId},
    symbols::SymbolTable,
};

/// Nesting deeper than this is treated as the top level.
const MAX_DEPTH: usize = 64;

/// Scalar type names, which never refer to a message.
const BUILTIN_TYPES: &[&str] = &[
    "double", "float", "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32",
    "fixed64", "sfixed32", "sfixed64", "bool", "string", "bytes",
];

pub fn is_builtin(ty: &str) -> bool {
    BUILTIN_TYPES.contains(&ty)
}

/// Returns the dotted name of a message, starting from its outermost enclosing message.
///
/// # Examples
///
/// ```
/// # use rpcgen::{names, Compiler, file::{File, FileResolver}};
/// # struct Source;
/// # impl FileResolver for Source {
/// #     fn resolve_path(&self, _: &std::path::Path) -> Option<String> { Some("a.proto".into()) }
/// #     fn open_file(&self, name: &str) -> Result<File, rpcgen::Error> {
/// #         File::from_source(name, "message Outer { message Inner {} }")
/// #     }
/// # }
/// let mut compiler = Compiler::with_file_resolver(Source);
/// compiler.add_file("a.proto").unwrap();
/// let model = compiler.finish().unwrap();
///
/// let inner = model.symbols().get("a_Inner").unwrap();
/// assert_eq!(names::qualified_name(model.symbols(), inner), "Outer.Inner");
/// ```
pub fn qualified_name(symbols: &SymbolTable, id: MessageId) -> String {
    let message = symbols.message(id);
    join(scope_names(symbols, message.parent()), message.name())
}

/// Returns the dotted name of an enum, starting from its outermost enclosing message.
pub fn enum_qualified_name(symbols: &SymbolTable, id: EnumId) -> String {
    let enu = symbols.enum_(id);
    join(scope_names(symbols, enu.parent()), enu.name())
}

/// Finds the closest scope, starting at `from` and walking outwards, which directly declares a
/// message or enum named `ty`, and returns the qualified name of that scope.
///
/// Returns `None` for builtin types and for names which are not nested in any enclosing message.
pub fn nearest_scope(symbols: &SymbolTable, from: MessageId, ty: &str) -> Option<String> {
    if is_builtin(ty) {
        return None;
    }

    let mut scope = Some(from);
    for _ in 0..MAX_DEPTH {
        let id = scope?;
        let message = symbols.message(id);
        let declares = message
            .nested()
            .iter()
            .any(|&nested| symbols.message(nested).name() == ty)
            || message
                .enums()
                .iter()
                .any(|&enu| symbols.enum_(enu).name() == ty);
        if declares {
            return Some(qualified_name(symbols, id));
        }
        scope = message.parent();
    }

    None
}

/// Converts a dotted name into a single identifier, for targets where `.` is not allowed.
pub fn flatten(name: &str) -> String {
    name.replace('.', "_")
}

/// Collects the names of `scope` and its ancestors, outermost first.
fn scope_names(symbols: &SymbolTable, mut scope: Option<MessageId>) -> Vec<&str> {
    let mut names = Vec::new();
    while let Some(id) = scope {
        if names.len() == MAX_DEPTH {
            tracing::warn!(depth = MAX_DEPTH, "message nesting too deep");
            break;
        }

        let message = symbols.message(id);
        names.push(message.name());
        scope = message.parent();
    }
    names.reverse();
    names
}

fn join<'a>(mut scope: Vec<&'a str>, name: &'a str) -> String {
    scope.push(name);
    scope.join(".")
}
