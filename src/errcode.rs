//! A lazily populated table of error codes, keyed by module.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use once_cell::sync::OnceCell;
use prost_types::EnumDescriptorProto;

use crate::{
    file::{module_name, FileResolver},
    model::{ProtoFile, ERR_CODE_SUFFIX},
    Error,
};

type ModuleCodes = HashMap<String, i32>;

/// Maps module names to the error codes declared in that module.
///
/// Each module is loaded at most once. Loading is guarded per module, so concurrent lookups of
/// the same unloaded module parse its file only once, while lookups of other modules proceed.
#[derive(Default)]
pub struct ErrCodeRegistry {
    modules: Mutex<HashMap<String, Arc<OnceCell<ModuleCodes>>>>,
    loads: AtomicUsize,
}

impl ErrCodeRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records the error codes of a file which has already been parsed.
    ///
    /// Has no effect if the file's module is already known.
    pub fn register_file(&self, file: &ProtoFile) {
        let codes = file
            .err_codes()
            .iter()
            .flat_map(|set| &set.values)
            .map(|value| (value.name.clone(), value.number))
            .collect();
        if self.module(file.module()).set(codes).is_err() {
            tracing::debug!(module = file.module(), "error codes already registered");
        }
    }

    /// Returns the value of an error code, or zero if the module has not been loaded or does not
    /// declare the symbol.
    pub fn get(&self, module: &str, symbol: &str) -> i32 {
        let modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        modules
            .get(module)
            .and_then(|codes| codes.get())
            .and_then(|codes| codes.get(symbol))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the value of an error code, loading `<module>.proto` through `resolver` on the
    /// first lookup of an unknown module.
    ///
    /// Returns zero if the module does not declare the symbol.
    ///
    /// # Errors
    ///
    /// Returns an error if the module's file cannot be found or parsed. A failed load is retried
    /// on the next lookup.
    pub fn get_auto_load(
        &self,
        module: &str,
        symbol: &str,
        resolver: &dyn FileResolver,
    ) -> Result<i32, Error> {
        let codes = self.module(module);
        let codes = codes.get_or_try_init(|| self.load(module, resolver))?;
        Ok(codes.get(symbol).copied().unwrap_or(0))
    }

    /// The number of files parsed by [`get_auto_load`](ErrCodeRegistry::get_auto_load).
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    fn module(&self, module: &str) -> Arc<OnceCell<ModuleCodes>> {
        let mut modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        modules.entry(module.to_owned()).or_default().clone()
    }

    fn load(&self, module: &str, resolver: &dyn FileResolver) -> Result<ModuleCodes, Error> {
        let name = format!("{}.proto", module);
        let file = resolver.open_file(&name)?;
        self.loads.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(module, file = file.name(), "loading error codes");

        debug_assert_eq!(module_name(file.name()), module);
        let descriptor = file.file_descriptor_proto();
        let mut codes = ModuleCodes::new();
        let mut messages: Vec<_> = descriptor.message_type.iter().collect();
        collect_err_codes(&descriptor.enum_type, &mut codes);
        while let Some(message) = messages.pop() {
            collect_err_codes(&message.enum_type, &mut codes);
            messages.extend(&message.nested_type);
        }
        Ok(codes)
    }
}

fn collect_err_codes(enums: &[EnumDescriptorProto], codes: &mut ModuleCodes) {
    for enu in enums {
        if enu.name().ends_with(ERR_CODE_SUFFIX) {
            codes.extend(
                enu.value
                    .iter()
                    .map(|value| (value.name().to_owned(), value.number())),
            );
        }
    }
}

impl fmt::Debug for ErrCodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        let mut loaded: Vec<_> = modules
            .iter()
            .filter(|(_, codes)| codes.get().is_some())
            .map(|(module, _)| module.as_str())
            .collect();
        loaded.sort_unstable();

        f.debug_struct("ErrCodeRegistry")
            .field("modules", &loaded)
            .field("loads", &self.load_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::file::File;

    #[derive(Default)]
    struct CountingResolver {
        files: HashMap<&'static str, &'static str>,
        opened: AtomicUsize,
    }

    impl FileResolver for CountingResolver {
        fn open_file(&self, name: &str) -> Result<File, Error> {
            self.opened.fetch_add(1, Ordering::Relaxed);
            match self.files.get(name) {
                Some(source) => File::from_source(name, source),
                None => Err(Error::file_not_found(name)),
            }
        }
    }

    fn resolver() -> CountingResolver {
        CountingResolver {
            files: [(
                "modX.proto",
                r#"
                    enum ErrCode { Success = 0; ErrFoo = 1001; }
                    message Wrapper { enum InnerErrCode { InnerOk = 0; ErrNested = 2001; } }
                    enum Color { Red = 0; ErrNotACode = 7; }
                "#,
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn get_unknown_module() {
        let registry = ErrCodeRegistry::new();
        assert_eq!(registry.get("modX", "ErrFoo"), 0);
        assert_eq!(registry.load_count(), 0);
    }

    #[test]
    fn auto_load_parses_once() {
        let registry = ErrCodeRegistry::new();
        let resolver = resolver();

        assert_eq!(registry.get_auto_load("modX", "ErrFoo", &resolver).unwrap(), 1001);
        assert_eq!(registry.load_count(), 1);

        assert_eq!(registry.get_auto_load("modX", "ErrNested", &resolver).unwrap(), 2001);
        assert_eq!(registry.get_auto_load("modX", "ErrNotACode", &resolver).unwrap(), 0);
        assert_eq!(registry.get("modX", "ErrFoo"), 1001);
        assert_eq!(registry.load_count(), 1);
        assert_eq!(resolver.opened.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn auto_load_missing_module() {
        let registry = ErrCodeRegistry::new();
        let resolver = resolver();

        let err = registry
            .get_auto_load("missing", "ErrFoo", &resolver)
            .unwrap_err();
        assert!(err.is_file_not_found());
        assert_eq!(registry.load_count(), 0);
    }

    #[test]
    fn concurrent_auto_load() {
        let registry = ErrCodeRegistry::new();
        let resolver = resolver();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    assert_eq!(registry.get_auto_load("modX", "ErrFoo", &resolver).unwrap(), 1001);
                });
            }
        });

        assert_eq!(registry.load_count(), 1);
    }
}
