use std::{fmt, io, path::PathBuf, process::ExitStatus};

use miette::{Diagnostic, NamedSource, SourceCode, SourceOffset, SourceSpan};
use protox_parse::ParseError;
use thiserror::Error;

use crate::{file::File, tag};

/// An error that can occur while loading protobuf files or generating artifacts.
#[derive(Diagnostic, Error)]
#[error(transparent)]
#[diagnostic(transparent)]
pub struct Error {
    kind: Box<ErrorKind>,
}

#[derive(Debug, Diagnostic, Error)]
pub(crate) enum ErrorKind {
    #[error("{}", err)]
    #[diagnostic(forward(err))]
    Parse { name: String, err: ParseError },
    #[error("error opening file '{path}'")]
    OpenFile {
        name: String,
        path: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("file '{name}' is too large")]
    #[diagnostic(help("the maximum file length is 2,147,483,647 bytes"))]
    FileTooLarge { name: String },
    #[error("file '{name}' not found")]
    FileNotFound { name: String },
    #[error("import '{name}' not found")]
    ImportNotFound {
        #[label("imported here")]
        span: Option<SourceSpan>,
        #[source_code]
        source_code: NamedSource,
        importer: String,
        name: String,
    },
    #[error("no root file was added")]
    NoRootFile,
    #[error("missing 'go_package' option in '{name}'")]
    #[diagnostic(help("add `option go_package = \"<path>\";` to the root file"))]
    MissingGoPackage { name: String },
    #[error("failed to create directory '{path}'")]
    CreateDir {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("failed to write file '{path}'")]
    WriteFile {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("failed to parse existing file '{path}': {message}")]
    #[diagnostic(help("fix or remove the file, then generate again"))]
    MalformedArtifact { path: PathBuf, message: String },
    #[error("failed to run '{program}'")]
    SpawnProcess {
        program: String,
        #[source]
        err: io::Error,
    },
    #[error("'{program}' exited with {status}: {stderr}")]
    ProcessFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("invalid rpc name '{name}'")]
    #[diagnostic(help("{}", reason))]
    InvalidRpcName { name: String, reason: &'static str },
    #[error("no service declared in '{name}'")]
    ServiceNotFound { name: String },
    #[error("no 'src' directory found in '{path}' or any parent directory")]
    ProjectRootNotFound { path: PathBuf },
    #[error("file '{name}' not found in any parent of '{path}'")]
    RegisterFileNotFound { name: &'static str, path: PathBuf },
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Creates an instance of [`struct@Error`] with an arbitrary payload.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::from_kind(ErrorKind::Custom(error.into()))
    }

    /// Creates an instance of [`struct@Error`] indicating that a file could not be found.
    ///
    /// This error should be returned by [`FileResolver`](crate::file::FileResolver) instances if a
    /// file is not found.
    pub fn file_not_found(name: &str) -> Self {
        Error::from_kind(ErrorKind::FileNotFound {
            name: name.to_owned(),
        })
    }

    /// The file in which this error occurred, if available.
    pub fn file(&self) -> Option<&str> {
        match &*self.kind {
            ErrorKind::Parse { name, .. }
            | ErrorKind::OpenFile { name, .. }
            | ErrorKind::FileTooLarge { name }
            | ErrorKind::FileNotFound { name }
            | ErrorKind::MissingGoPackage { name }
            | ErrorKind::ServiceNotFound { name } => Some(name),
            ErrorKind::ImportNotFound { importer, .. } => Some(importer),
            ErrorKind::CreateDir { .. }
            | ErrorKind::WriteFile { .. }
            | ErrorKind::MalformedArtifact { .. }
            | ErrorKind::SpawnProcess { .. }
            | ErrorKind::ProcessFailed { .. }
            | ErrorKind::InvalidRpcName { .. }
            | ErrorKind::ProjectRootNotFound { .. }
            | ErrorKind::RegisterFileNotFound { .. }
            | ErrorKind::NoRootFile
            | ErrorKind::Custom(_) => None,
        }
    }

    pub(crate) fn parse(name: &str, err: ParseError) -> Self {
        Error::from_kind(ErrorKind::Parse {
            name: name.to_owned(),
            err,
        })
    }

    pub(crate) fn from_kind(kind: ErrorKind) -> Self {
        Error {
            kind: Box::new(kind),
        }
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns true if this is an instance of [`Error::file_not_found()`]
    pub fn is_file_not_found(&self) -> bool {
        matches!(
            &*self.kind,
            ErrorKind::FileNotFound { .. } | ErrorKind::ImportNotFound { .. }
        )
    }

    /// Returns true if this error is caused by an invalid protobuf source file.
    pub fn is_parse(&self) -> bool {
        matches!(
            &*self.kind,
            ErrorKind::Parse { .. } | ErrorKind::FileTooLarge { .. }
        )
    }

    /// Returns true if this error is caused by an IO error while reading or writing a file.
    pub fn is_io(&self) -> bool {
        match &*self.kind {
            ErrorKind::OpenFile { .. }
            | ErrorKind::CreateDir { .. }
            | ErrorKind::WriteFile { .. } => true,
            ErrorKind::Custom(err) if err.downcast_ref::<io::Error>().is_some() => true,
            _ => false,
        }
    }

    /// Returns true if this error was caused by invalid user input to an editing command.
    pub fn is_invalid_input(&self) -> bool {
        matches!(&*self.kind, ErrorKind::InvalidRpcName { .. })
    }

    pub(crate) fn into_import_error(self, file: &File, import_idx: usize) -> Self {
        fn find_span(file: &File, import_idx: usize) -> Option<SourceSpan> {
            let sci = file.descriptor.source_code_info.as_ref()?;
            let source = file.source()?;
            for location in &sci.location {
                if location.path == [tag::file::DEPENDENCY, import_idx as i32]
                    && location.span.len() == 3
                {
                    let line = location.span[0] as usize + 1;
                    let start_col = location.span[1] as usize + 1;
                    let end_col = location.span[2] as usize + 1;
                    let start = SourceOffset::from_location(source, line, start_col).offset();
                    return Some((start, end_col.saturating_sub(start_col)).into());
                }
            }
            None
        }

        match *self.kind {
            ErrorKind::FileNotFound { name } => {
                let source_code = NamedSource::new(
                    file.name(),
                    file.source().unwrap_or_default().to_owned(),
                );
                let span = find_span(file, import_idx);
                Error::from_kind(ErrorKind::ImportNotFound {
                    span,
                    source_code,
                    importer: file.name().to_owned(),
                    name,
                })
            }
            kind => Error::from_kind(kind),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::new(err)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.kind {
            ErrorKind::Parse { name, err } => write!(f, "{}: {:?}", name, err),
            ErrorKind::OpenFile { err, .. }
            | ErrorKind::CreateDir { err, .. }
            | ErrorKind::WriteFile { err, .. }
            | ErrorKind::SpawnProcess { err, .. } => write!(f, "{}: {}", self, err),
            ErrorKind::Custom(err) => err.fmt(f),
            ErrorKind::ImportNotFound {
                span,
                source_code,
                importer,
                ..
            } => {
                write!(f, "{}:", importer)?;
                if let Some(span) = span {
                    if let Ok(span_contents) = source_code.read_span(span, 0, 0) {
                        write!(
                            f,
                            "{}:{}: ",
                            span_contents.line() + 1,
                            span_contents.column() + 1
                        )?;
                    }
                }
                write!(f, "{}", self)
            }
            _ => write!(f, "{}", self),
        }
    }
}

#[test]
fn fmt_debug_io() {
    let err = Error::from_kind(ErrorKind::OpenFile {
        name: "file.proto".into(),
        path: "path/to/file.proto".into(),
        err: io::Error::new(io::ErrorKind::Other, "io error"),
    });

    assert!(err.is_io());
    assert_eq!(err.file(), Some("file.proto"));
    assert_eq!(
        format!("{:?}", err),
        "error opening file 'path/to/file.proto': io error"
    );
}

#[test]
fn fmt_debug_import_not_found() {
    let file = File::from_source("root.proto", "import 'dep.proto';\n").unwrap();
    let err = Error::file_not_found("dep.proto").into_import_error(&file, 0);

    assert!(err.is_file_not_found());
    assert_eq!(err.file(), Some("root.proto"));
    assert_eq!(
        format!("{:?}", err),
        "root.proto:1:1: import 'dep.proto' not found"
    );
}
