//! Locating and parsing protobuf source files.

mod search;

pub use search::IncludePaths;

use std::{
    fs,
    io::{self, Read},
    path::{self, Path, PathBuf},
};

use prost_types::FileDescriptorProto;

use crate::{error::ErrorKind, lex, tag, Error};

const MAX_FILE_LEN: u64 = i32::MAX as u64;

/// Files in this namespace ship with the protobuf compiler and never declare services or types
/// that need generating.
pub(crate) const WELL_KNOWN_PREFIX: &str = "google/";

const DEFAULT_SYNTAX: &str = "syntax = \"proto3\";\n";

/// A strategy for locating protobuf source files.
///
/// The main implementation is [`IncludePaths`] which uses the file system, but
/// this trait allows sourcing files from other places as well.
pub trait FileResolver {
    /// Converts a file system path to a unique file name.
    fn resolve_path(&self, _path: &Path) -> Option<String> {
        None
    }

    /// Opens a file by its unique name.
    ///
    /// # Errors
    ///
    /// If the file is not found, the implementation should return [`Error::file_not_found`].
    fn open_file(&self, name: &str) -> Result<File, Error>;
}

impl<T> FileResolver for Box<T>
where
    T: FileResolver + ?Sized,
{
    fn resolve_path(&self, path: &Path) -> Option<String> {
        (**self).resolve_path(path)
    }

    fn open_file(&self, name: &str) -> Result<File, Error> {
        (**self).open_file(name)
    }
}

/// An opened and parsed protobuf source file, returned by [`FileResolver::open_file`].
#[derive(Debug, Clone)]
pub struct File {
    pub(crate) name: String,
    pub(crate) path: Option<PathBuf>,
    pub(crate) source: Option<String>,
    pub(crate) descriptor: FileDescriptorProto,
}

impl File {
    /// Read a protobuf source file from the filesystem into a new instance of [`File`].
    ///
    /// # Errors
    ///
    /// Returns an error if there is an IO error opening the file, or it is not
    /// a valid protobuf source file.
    ///
    /// If the file does not exist, [`Error::file_not_found()`] is returned.
    pub fn open(name: &str, path: &Path) -> Result<Self, Error> {
        let map_io_err = |err: io::Error| -> Error {
            if err.kind() == io::ErrorKind::NotFound {
                Error::file_not_found(name)
            } else {
                Error::from_kind(ErrorKind::OpenFile {
                    name: name.to_owned(),
                    path: path.to_owned(),
                    err,
                })
            }
        };

        let file = fs::File::open(path).map_err(map_io_err)?;
        let metadata = file.metadata().map_err(map_io_err)?;

        if metadata.len() > MAX_FILE_LEN {
            return Err(Error::from_kind(ErrorKind::FileTooLarge {
                name: name.to_owned(),
            }));
        }

        let mut buf = String::with_capacity(metadata.len() as usize);
        file.take(MAX_FILE_LEN)
            .read_to_string(&mut buf)
            .map_err(map_io_err)?;

        let descriptor = parse(name, &buf)?;

        Ok(File {
            name: name.to_owned(),
            path: Some(path.to_owned()),
            source: Some(buf),
            descriptor,
        })
    }

    /// Read a protobuf source file from a string into a new instance of [`File`].
    ///
    /// # Errors
    ///
    /// Returns an error the string is not a valid protobuf source file.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rpcgen::file::File;
    /// let file = File::from_source("foo.proto", "message Foo { string bar = 1; }").unwrap();
    /// assert_eq!(file.name(), "foo.proto");
    /// assert_eq!(file.path(), None);
    /// assert_eq!(file.file_descriptor_proto().message_type[0].name(), "Foo");
    /// ```
    pub fn from_source(name: &str, source: &str) -> Result<Self, Error> {
        let descriptor = parse(name, source)?;

        Ok(File {
            name: name.to_owned(),
            path: None,
            source: Some(source.to_owned()),
            descriptor,
        })
    }

    /// Returns the name of this file, as used in `import` statements.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the filesystem path, if this source is backed by a physical file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the full content of the source file if available.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Returns the parsed value of the source file.
    pub fn file_descriptor_proto(&self) -> &FileDescriptorProto {
        &self.descriptor
    }

    /// Returns the module name of this file: its base name without the `.proto` extension.
    pub fn module(&self) -> &str {
        module_name(&self.name)
    }
}

/// Parses protobuf source text.
///
/// Files which do not start with a `syntax` statement are parsed as proto3, so that fields
/// without a label are accepted.
fn parse(name: &str, source: &str) -> Result<FileDescriptorProto, Error> {
    if lex::declares_syntax(source) {
        return protox_parse::parse(name, source).map_err(|err| Error::parse(name, err));
    }

    let mut descriptor = protox_parse::parse(name, &format!("{}{}", DEFAULT_SYNTAX, source))
        .map_err(|err| Error::parse(name, err))?;
    if let Some(source_code_info) = &mut descriptor.source_code_info {
        // Remove the location of the synthesized syntax statement and shift every other span
        // back onto the original line numbers.
        source_code_info
            .location
            .retain(|location| location.path != [tag::file::SYNTAX]);
        for location in &mut source_code_info.location {
            if let Some(start_line) = location.span.first_mut() {
                *start_line = start_line.saturating_sub(1);
            }
            if location.span.len() == 4 {
                location.span[2] = location.span[2].saturating_sub(1);
            }
        }
    }
    Ok(descriptor)
}

/// Returns the base name of an import path, without the `.proto` extension.
pub fn module_name(name: &str) -> &str {
    let base = match name.rfind(['/', '\\']) {
        Some(idx) => &name[idx + 1..],
        None => name,
    };
    base.strip_suffix(".proto").unwrap_or(base)
}

pub(crate) fn path_to_file_name(path: &Path) -> Option<String> {
    let mut name = String::new();
    for component in path.components() {
        match component {
            path::Component::Normal(component) => {
                if let Some(component) = component.to_str() {
                    if !name.is_empty() {
                        name.push('/');
                    }
                    name.push_str(component);
                } else {
                    return None;
                }
            }
            path::Component::CurDir => continue,
            _ => return None,
        }
    }

    Some(name)
}
