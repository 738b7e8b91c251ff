//! In-place edits of protobuf source files.

use std::{fs, path::Path};

use crate::{
    build::build_file,
    error::ErrorKind,
    file::File,
    lex::{Token, Tokens},
    merge::{read_error, write_file},
    symbols::SymbolTable,
    Error,
};

/// What [`add_rpc`] changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRpcOutcome {
    /// The command id of the method, either newly assigned or already declared.
    pub cmd_id: u32,
    /// Whether the `rpc` block was inserted. False if the method already existed.
    pub inserted_method: bool,
    /// Names of the messages and enums appended to the file.
    pub appended: Vec<String>,
}

/// Adds an rpc method to the first service of a protobuf file.
///
/// The method is assigned the largest command id in the file plus one. Empty `<name>Req` and
/// `<name>Rsp` messages are appended, as is a `<name>ListOption` enum if `list_options` is not
/// empty. Each addition is skipped if a declaration of the same name exists, so repeating the
/// call leaves the file unchanged.
///
/// # Errors
///
/// Returns an error without modifying the file if `name` contains characters other than ASCII
/// letters, digits and underscores, or ends with `Req` or `Rsp`. Also fails if the file cannot be
/// read or parsed, or declares no service.
pub fn add_rpc(path: &Path, name: &str, list_options: &[String]) -> Result<AddRpcOutcome, Error> {
    validate_name(name)?;

    let source = fs::read_to_string(path).map_err(|err| read_error(path, err))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (content, outcome) = add_rpc_to_source(&file_name, &source, name, list_options)?;

    if content != source {
        write_file(path, &content)?;
    }
    tracing::info!(
        path = %path.display(),
        rpc = name,
        cmd_id = outcome.cmd_id,
        appended = ?outcome.appended,
        "added rpc"
    );
    Ok(outcome)
}

fn validate_name(name: &str) -> Result<(), Error> {
    let invalid = |reason: &'static str| -> Result<(), Error> {
        Err(Error::from_kind(ErrorKind::InvalidRpcName {
            name: name.to_owned(),
            reason,
        }))
    };

    if name.is_empty() {
        return invalid("the name must not be empty");
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return invalid("only ASCII letters, digits and underscores are allowed");
    }
    if name.ends_with("Req") || name.ends_with("Rsp") {
        return invalid("the name must not end with 'Req' or 'Rsp'");
    }
    Ok(())
}

pub(crate) fn add_rpc_to_source(
    file_name: &str,
    source: &str,
    name: &str,
    list_options: &[String],
) -> Result<(String, AddRpcOutcome), Error> {
    let file = File::from_source(file_name, source)?;
    let mut symbols = SymbolTable::new();
    let proto = build_file(&file, &mut symbols);

    let close = service_end(source).ok_or_else(|| {
        Error::from_kind(ErrorKind::ServiceNotFound {
            name: file_name.to_owned(),
        })
    })?;

    let (mut content, cmd_id, inserted_method) = match proto.method(name) {
        Some(existing) => {
            tracing::debug!(rpc = name, "rpc already declared");
            (source.to_owned(), existing.cmd_id, false)
        }
        None => {
            let cmd_id = proto
                .methods()
                .iter()
                .map(|method| method.cmd_id)
                .max()
                .unwrap_or(0)
                + 1;
            let content = format!(
                "{}\n\n\t// @desc:\n\t// @error:\n\
                 \trpc {name} ({name}Req) returns ({name}Rsp) {{\n\
                 \t\toption(ext.CmdID) = {cmd_id};\n\
                 \t}};\n{}",
                source[..close].trim_end(),
                &source[close..],
                name = name,
                cmd_id = cmd_id,
            );
            (content, cmd_id, true)
        }
    };

    let top_level_message = |message: &str| {
        proto
            .messages()
            .iter()
            .map(|&id| symbols.message(id))
            .any(|candidate| candidate.parent().is_none() && candidate.name() == message)
    };
    let top_level_enum = |enu: &str| {
        proto
            .enums()
            .iter()
            .any(|&id| symbols.enum_(id).parent().is_none() && symbols.enum_(id).name() == enu)
    };

    let mut appended = Vec::new();
    let mut blocks = String::new();

    if !list_options.is_empty() {
        let enum_name = format!("{}ListOption", name);
        if !top_level_enum(&enum_name) {
            blocks.push_str(&list_option_enum(&enum_name, list_options));
            appended.push(enum_name);
        }
    }

    for message in [format!("{}Req", name), format!("{}Rsp", name)] {
        if !top_level_message(&message) {
            blocks.push_str(&format!("\nmessage {} {{\n}}\n", message));
            appended.push(message);
        }
    }

    if !blocks.is_empty() {
        if !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&blocks);
    }

    Ok((
        content,
        AddRpcOutcome {
            cmd_id,
            inserted_method,
            appended,
        },
    ))
}

fn list_option_enum(enum_name: &str, options: &[String]) -> String {
    let mut block = format!("\nenum {} {{\n\t{}Nil = 0;\n", enum_name, enum_name);
    for (idx, option) in options.iter().enumerate() {
        block.push_str(&format!(
            "\t{}{} = {};\n",
            enum_name,
            upper_first(option.trim()),
            idx + 1
        ));
    }
    block.push_str("}\n");
    block
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Returns the byte offset of the brace closing the first top-level `service` block.
fn service_end(source: &str) -> Option<usize> {
    let mut tokens = Tokens::new(source);
    let mut depth = 0usize;
    let mut in_service = false;
    let mut expect_service_brace = false;

    while let Some(token) = tokens.next() {
        match token.ok()? {
            Token::Ident("service") if depth == 0 && !in_service => expect_service_brace = true,
            Token::LeftBrace => {
                depth += 1;
                if expect_service_brace && depth == 1 {
                    in_service = true;
                    expect_service_brace = false;
                }
            }
            Token::RightBrace => {
                depth = depth.checked_sub(1)?;
                if in_service && depth == 0 {
                    return Some(tokens.span().start);
                }
            }
            _ => (),
        }
    }
    None
}

#[cfg(test)]
mod tests;
