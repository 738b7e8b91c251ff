//! Binds each field's declared type to a message in the symbol table.


use std::collections::{HashMap, HashSet};

use crate::{
    model::{symbol_key, Message, MessageId, ProtoFile},
    names::{is_builtin, qualified_name},
    symbols::SymbolTable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Message(MessageId),
    /// A scalar or enum type, which has no message to bind.
    Skipped,
    Ambiguous,
    NotFound,
}

/// Resolves every field of every message in `symbols`.
///
/// Failures are logged and leave the field unresolved.
pub(crate) fn resolve_types(files: &[ProtoFile], symbols: &mut SymbolTable) {
    let closures = import_closures(files);
    let packages: HashMap<&str, &str> = files
        .iter()
        .map(|file| (file.module(), file.package()))
        .collect();
    let resolver = Resolver {
        symbols: &*symbols,
        closures: &closures,
        packages: &packages,
    };

    let mut bindings = Vec::new();
    for (id, message) in resolver.symbols.messages() {
        for (index, field) in message.fields().iter().enumerate() {
            match resolver.resolve(id, message, field.ty()) {
                Resolution::Message(target) => bindings.push((id, index, target)),
                Resolution::Skipped => (),
                Resolution::Ambiguous => tracing::warn!(
                    message = message.key().as_str(),
                    field = field.name(),
                    ty = field.ty(),
                    "field type is ambiguous"
                ),
                Resolution::NotFound => tracing::warn!(
                    message = message.key().as_str(),
                    field = field.name(),
                    ty = field.ty(),
                    "field type not found"
                ),
            }
        }
    }

    tracing::debug!(resolved = bindings.len(), "resolved field types");
    for (id, index, target) in bindings {
        symbols.message_mut(id).fields[index].set_message(target);
    }
}

struct Resolver<'a> {
    symbols: &'a SymbolTable,
    closures: &'a HashMap<String, HashSet<String>>,
    packages: &'a HashMap<&'a str, &'a str>,
}

impl<'a> Resolver<'a> {
    fn resolve(&self, id: MessageId, message: &Message, ty: &str) -> Resolution {
        let ty = ty.strip_prefix('.').unwrap_or(ty);
        let module = message.module();
        match ty.rfind('.') {
            Some(dot) => self.resolve_qualified(module, ty, &ty[dot + 1..]),
            None => {
                if let Some(target) = self.symbols.get(&symbol_key(module, ty)) {
                    return Resolution::Message(target);
                }
                if is_builtin(ty) || self.is_enum(module, ty) {
                    return Resolution::Skipped;
                }
                self.find_positional(id, module, ty)
            }
        }
    }

    /// Resolves a dotted type such as `other.Item` or `Outer.Inner`.
    ///
    /// A message only matches if its dotted path, optionally prefixed by its package, ends with
    /// the whole of `ty`, so a qualifier never falls back to a same-named message elsewhere.
    fn resolve_qualified(&self, module: &str, ty: &str, name: &str) -> Resolution {
        match self.symbols.get_all(&ty.replace('.', "_")) {
            [target] => return Resolution::Message(*target),
            [_, _, ..] => return Resolution::Ambiguous,
            [] => (),
        }

        if self.is_enum(module, name) {
            return Resolution::Skipped;
        }

        let mut candidates = self.symbols.messages().filter(|&(target, candidate)| {
            candidate.name() == name
                && self.in_closure(module, candidate.module())
                && self.path_matches(target, candidate.module(), ty)
        });
        match (candidates.next(), candidates.next()) {
            (Some((target, candidate)), None) if candidate.dup_count() == 0 => {
                Resolution::Message(target)
            }
            (Some(_), _) => Resolution::Ambiguous,
            (None, _) => Resolution::NotFound,
        }
    }

    fn path_matches(&self, target: MessageId, module: &str, ty: &str) -> bool {
        let path = qualified_name(self.symbols, target);
        let full = match self.packages.get(module) {
            Some(package) if !package.is_empty() => format!("{}.{}", package, path),
            _ => format!("{}.{}", module, path),
        };
        path == ty || full == ty || full.ends_with(&format!(".{}", ty))
    }

    fn is_enum(&self, module: &str, name: &str) -> bool {
        self.symbols
            .enums()
            .any(|(_, enu)| enu.name() == name && self.in_closure(module, enu.module()))
    }

    fn in_closure(&self, module: &str, other: &str) -> bool {
        module == other
            || self
                .closures
                .get(module)
                .map_or(false, |closure| closure.contains(other))
    }

    /// Searches for a message by its bare name: first backward then forward from the
    /// referencing message within its own module, then anywhere in its import closure.
    fn find_positional(&self, id: MessageId, module: &str, name: &str) -> Resolution {
        let messages = self.symbols.messages();
        let position = id.index();

        let same_module = |candidate: &(MessageId, &Message)| {
            candidate.1.module() == module && candidate.1.name() == name
        };
        let backward = self
            .symbols
            .messages()
            .take(position + 1)
            .rev()
            .find(same_module);
        let found = backward.or_else(|| messages.skip(position + 1).find(same_module));
        if let Some((target, candidate)) = found {
            return if candidate.dup_count() == 0 {
                Resolution::Message(target)
            } else {
                Resolution::Ambiguous
            };
        }

        let mut candidates = self
            .symbols
            .messages()
            .filter(|(_, candidate)| {
                candidate.name() == name && self.in_closure(module, candidate.module())
            });
        match (candidates.next(), candidates.next()) {
            (Some((target, candidate)), None) if candidate.dup_count() == 0 => {
                Resolution::Message(target)
            }
            (Some(_), _) => Resolution::Ambiguous,
            (None, _) => Resolution::NotFound,
        }
    }
}

/// Maps each module to the set of modules it transitively imports.
fn import_closures(files: &[ProtoFile]) -> HashMap<String, HashSet<String>> {
    let by_name: HashMap<&str, &ProtoFile> =
        files.iter().map(|file| (file.name(), file)).collect();

    files
        .iter()
        .map(|file| {
            let mut closure = HashSet::new();
            let mut stack: Vec<&str> = file.dependencies().iter().map(String::as_str).collect();
            while let Some(name) = stack.pop() {
                if let Some(imported) = by_name.get(name) {
                    if closure.insert(imported.module().to_owned()) {
                        stack.extend(imported.dependencies().iter().map(String::as_str));
                    }
                }
            }
            (file.module().to_owned(), closure)
        })
        .collect()
}
