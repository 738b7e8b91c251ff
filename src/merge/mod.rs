//! Incremental generation of hand-editable Go source files.
//!
//! Generated files such as client stubs and logic skeletons are edited by hand between runs.
//! Instead of overwriting them, generation appends only the functions which the existing file
//! does not declare yet.

#[cfg(test)]
mod tests;

use std::{
    collections::BTreeSet,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::{
    error::ErrorKind,
    lex::{InvalidToken, Token, Tokens},
    Error,
};

/// A generated top-level function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoFunction {
    /// The declared name, used to detect whether the function already exists.
    pub name: String,
    /// The source text, including leading blank lines and comments.
    pub source: String,
}

/// What happened to a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file did not exist and was written in full.
    Created,
    /// The file existed and the given number of functions were appended to it.
    Appended(usize),
    /// The file was replaced.
    Overwritten,
    /// The file was left untouched.
    Unchanged,
}

/// Returns the names of every top-level function and method declared in a Go source file.
///
/// # Errors
///
/// Returns an error if the source contains an unterminated string or comment, or its braces are
/// unbalanced.
pub fn declared_functions(path: &Path, source: &str) -> Result<BTreeSet<String>, Error> {
    let malformed = |message: String| {
        Error::from_kind(ErrorKind::MalformedArtifact {
            path: path.to_owned(),
            message,
        })
    };
    let invalid = |InvalidToken { span }: InvalidToken| {
        malformed(format!("invalid token at byte {}", span.start))
    };

    let mut functions = BTreeSet::new();
    let mut depth = 0usize;
    let mut tokens = Tokens::new(source);
    while let Some(token) = tokens.next() {
        match token.map_err(invalid)? {
            Token::LeftBrace | Token::LeftParen => depth += 1,
            Token::RightBrace | Token::RightParen => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| malformed(format!("unexpected '{}'", &source[tokens.span()])))?;
            }
            Token::FUNC if depth == 0 && tokens.at_line_start() => {
                let mut next = tokens.next().transpose().map_err(invalid)?;
                if next == Some(Token::LeftParen) {
                    skip_group(&mut tokens).map_err(invalid)?;
                    next = tokens.next().transpose().map_err(invalid)?;
                }

                match next {
                    Some(Token::Ident(name)) => {
                        functions.insert(name.to_owned());
                    }
                    Some(Token::LeftParen | Token::LeftBrace) => depth += 1,
                    _ => (),
                }
            }
            _ => (),
        }
    }

    if depth != 0 {
        return Err(malformed("unexpected end of file".to_owned()));
    }
    Ok(functions)
}

/// Consumes tokens up to and including the parenthesis closing an already opened group.
fn skip_group(tokens: &mut Tokens) -> Result<(), InvalidToken> {
    let mut depth = 1usize;
    while let Some(token) = tokens.next() {
        match token? {
            Token::LeftParen => depth += 1,
            Token::RightParen => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            _ => (),
        }
    }
    Ok(())
}

/// Formats an import block, keeping only the imports whose package qualifier appears in `body`.
///
/// The qualifier of an import is its alias if one is given, for example `pb "example.com/svc"`,
/// or otherwise the last segment of its path.
///
/// # Examples
///
/// ```
/// # use rpcgen::merge::join_imports;
/// let imports = ["brick/rpc", "example.com/common", "log \"brick/log\""];
/// let body = "func Ping(ctx *rpc.Context) { log.Info() }";
/// assert_eq!(join_imports(&imports, body), "\t\"brick/rpc\"\n\tlog \"brick/log\"");
/// ```
pub fn join_imports(imports: &[impl AsRef<str>], body: &str) -> String {
    imports
        .iter()
        .map(AsRef::as_ref)
        .filter(|import| body.contains(&format!("{}.", import_qualifier(import))))
        .map(|import| {
            if import.contains('"') {
                format!("\t{}", import)
            } else {
                format!("\t\"{}\"", import)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn import_qualifier(import: &str) -> &str {
    if let Some(space) = import.find(' ') {
        return &import[..space];
    }
    match import.rfind('/') {
        Some(slash) => &import[slash + 1..],
        None => import,
    }
}

/// Writes the functions to `path`, preserving any existing content.
///
/// If the file exists, only the functions it does not declare yet are appended, and nothing is
/// written if none are missing. Otherwise the file is created from the output of `header`,
/// which receives the concatenated function sources, followed by every function.
pub fn write_incremental(
    path: &Path,
    header: impl FnOnce(&str) -> String,
    functions: &[GoFunction],
) -> Result<WriteOutcome, Error> {
    match fs::read_to_string(path) {
        Ok(existing) => {
            let declared = declared_functions(path, &existing)?;
            let missing: Vec<_> = functions
                .iter()
                .filter(|function| !declared.contains(&function.name))
                .collect();
            if missing.is_empty() {
                tracing::debug!(path = %path.display(), "no missing functions");
                return Ok(WriteOutcome::Unchanged);
            }

            let mut body = String::new();
            if !existing.is_empty() && !existing.ends_with('\n') {
                body.push('\n');
            }
            for function in &missing {
                tracing::info!(
                    path = %path.display(),
                    function = function.name.as_str(),
                    "appending function"
                );
                body.push_str(&function.source);
            }
            append(path, &body)?;
            Ok(WriteOutcome::Appended(missing.len()))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let body: String = functions
                .iter()
                .map(|function| function.source.as_str())
                .collect();
            let content = header(&body) + &body;
            write_file(path, &content)?;
            Ok(WriteOutcome::Created)
        }
        Err(err) => Err(read_error(path, err)),
    }
}

/// Writes a file only if it does not exist yet.
pub fn write_if_absent(path: &Path, content: &str) -> Result<WriteOutcome, Error> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "keeping existing file");
        return Ok(WriteOutcome::Unchanged);
    }

    write_file(path, content)?;
    Ok(WriteOutcome::Created)
}

/// Writes a file, replacing any existing content.
pub fn overwrite(path: &Path, content: impl AsRef<[u8]>) -> Result<WriteOutcome, Error> {
    let existed = path.exists();
    write_file(path, content)?;
    Ok(if existed {
        WriteOutcome::Overwritten
    } else {
        WriteOutcome::Created
    })
}

pub(crate) fn write_file(path: &Path, content: impl AsRef<[u8]>) -> Result<(), Error> {
    fs::write(path, content).map_err(|err| write_error(path, err))
}

pub(crate) fn append(path: &Path, content: &str) -> Result<(), Error> {
    fs::OpenOptions::new()
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(content.as_bytes()))
        .map_err(|err| write_error(path, err))
}

fn write_error(path: &Path, err: io::Error) -> Error {
    Error::from_kind(ErrorKind::WriteFile {
        path: path.to_owned(),
        err,
    })
}

pub(crate) fn read_error(path: &Path, err: io::Error) -> Error {
    Error::from_kind(ErrorKind::OpenFile {
        name: path.display().to_string(),
        path: PathBuf::from(path),
        err,
    })
}
