use std::{
    collections::{HashMap, HashSet},
    fmt,
    path::Path,
};

use prost_types::FileDescriptorProto;

use crate::{
    build::build_file,
    error::{Error, ErrorKind},
    errcode::ErrCodeRegistry,
    file::{
        path_to_file_name, File, FileResolver, IncludePaths, WELL_KNOWN_PREFIX,
    },
    model::{ImportEdge, Model, ProtoFile},
    resolve::resolve_types,
    symbols::SymbolTable,
};


/// Loads a root protobuf file and the closure of its imports.
///
/// Imports are loaded depth first and each file is parsed at most once. Once every file is
/// loaded, [`finish`](Compiler::finish) resolves field types and returns the [`Model`].
pub struct Compiler {
    resolver: Box<dyn FileResolver>,
    files: Vec<ProtoFile>,
    descriptors: Vec<FileDescriptorProto>,
    file_names: HashMap<String, usize>,
    visited: HashSet<String>,
    symbols: SymbolTable,
    root: Option<usize>,
}

impl Compiler {
    /// Create a new [`Compiler`] which searches the given include paths in order.
    pub fn new(includes: impl IntoIterator<Item = impl AsRef<Path>>) -> Self {
        Compiler::with_file_resolver(IncludePaths::new(
            includes.into_iter().map(|include| include.as_ref().to_owned()),
        ))
    }

    /// Create a new [`Compiler`] with a custom [`FileResolver`] for looking up imported files.
    pub fn with_file_resolver<R>(resolver: R) -> Self
    where
        R: FileResolver + 'static,
    {
        Compiler {
            resolver: Box::new(resolver),
            files: Vec::new(),
            descriptors: Vec::new(),
            file_names: HashMap::new(),
            visited: HashSet::new(),
            symbols: SymbolTable::new(),
            root: None,
        }
    }

    /// Load the root file at the given path, along with everything it imports.
    ///
    /// If the path is absolute, or relative to the current directory, it should reside under one
    /// of the include paths. Otherwise, it is looked up relative to the include paths in the same
    /// way as `import` statements.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, Error> {
        let path = path.as_ref();
        let name = match self
            .resolver
            .resolve_path(path)
            .or_else(|| path_to_file_name(path))
        {
            Some(name) => name,
            None => return Err(Error::file_not_found(&path.display().to_string())),
        };

        if let Some(&index) = self.file_names.get(&name) {
            self.root = Some(index);
            return Ok(self);
        }

        self.visited.insert(name.clone());
        let file = self.resolver.open_file(&name)?;
        let index = self.load(file)?;
        self.root = Some(index);
        Ok(self)
    }

    /// Resolve the types of every loaded message and return the completed model.
    ///
    /// # Errors
    ///
    /// Returns an error if [`add_file`](Compiler::add_file) was never called successfully.
    pub fn finish(self) -> Result<Model, Error> {
        let root = match self.root {
            Some(root) => root,
            None => return Err(Error::from_kind(ErrorKind::NoRootFile)),
        };

        let mut symbols = self.symbols;
        resolve_types(&self.files, &mut symbols);

        let err_codes = ErrCodeRegistry::new();
        for file in &self.files {
            err_codes.register_file(file);
        }

        Ok(Model {
            files: self.files,
            descriptors: self.descriptors,
            root,
            symbols,
            err_codes,
            resolver: self.resolver,
        })
    }

    fn load(&mut self, file: File) -> Result<usize, Error> {
        let dependencies = &file.file_descriptor_proto().dependency;
        for (index, import) in dependencies.iter().enumerate() {
            self.add_import(&file, index, import)?;
        }

        let mut proto = build_file(&file, &mut self.symbols);
        proto.imports = proto
            .dependencies
            .iter()
            .filter_map(|import| {
                let imported = &self.files[*self.file_names.get(import)?];
                if imported.go_package.is_empty() {
                    None
                } else {
                    Some(ImportEdge {
                        path: import.clone(),
                        go_package: imported.go_package.clone(),
                    })
                }
            })
            .collect();

        tracing::debug!(
            file = proto.name.as_str(),
            messages = proto.messages.len(),
            methods = proto.methods.len(),
            "loaded file"
        );

        let index = self.files.len();
        self.file_names.insert(proto.name.clone(), index);
        self.files.push(proto);
        self.descriptors.push(file.descriptor);
        Ok(index)
    }

    fn add_import(&mut self, importer: &File, index: usize, import: &str) -> Result<(), Error> {
        if !self.visited.insert(import.to_owned()) {
            return Ok(());
        }

        if import.starts_with(WELL_KNOWN_PREFIX) {
            tracing::debug!(import, "skipping well-known import");
            return Ok(());
        }

        let file = self
            .resolver
            .open_file(import)
            .map_err(|err| err.into_import_error(importer, index))?;
        self.load(file)?;
        Ok(())
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("files", &self.files)
            .field("visited", &self.visited)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
