//! Markdown reference documentation for the methods of the root file.

use std::{fmt::Write, path::Path};

use crate::{
    merge::{overwrite, WriteOutcome},
    model::{Field, MessageId, Model, ProtoFile, RpcMethod},
    names::{is_builtin, qualified_name},
    Error,
};

const DESC_TAG: &str = "@desc:";
const ERROR_TAG: &str = "@error:";

pub(super) fn generate(model: &Model, path: &Path) -> Result<WriteOutcome, Error> {
    overwrite(path, &render(model))
}

pub(crate) fn render(model: &Model) -> String {
    let file = model.root();
    let mut out = format!("# {}\n", file.service());
    if !file.package().is_empty() {
        writeln!(out, "\nPackage `{}`.", file.package()).unwrap();
    }

    for method in file.methods() {
        write!(
            out,
            "\n## {}\n\n- Command ID: {}\n- Path: `{}`\n",
            method.name,
            method.cmd_id,
            super::go::cmd_path(file, method)
        )
        .unwrap();

        let (description, errors) = parse_comments(method);
        if !description.is_empty() {
            out.push('\n');
            for line in description {
                writeln!(out, "{}", line).unwrap();
            }
        }

        if !errors.is_empty() {
            out.push_str("\n### Errors\n\n| Code | Name |\n| --- | --- |\n");
            for reference in errors {
                let (module, symbol) = match reference.split_once('.') {
                    Some((module, symbol)) => (module, symbol),
                    None => (file.module(), reference),
                };
                let code = match model.err_code(module, symbol) {
                    Ok(0) => "unknown".to_owned(),
                    Ok(code) => code.to_string(),
                    Err(err) => {
                        tracing::warn!(
                            method = method.name.as_str(),
                            reference,
                            "failed to load error codes: {}",
                            err
                        );
                        "unknown".to_owned()
                    }
                };
                writeln!(out, "| {} | {}.{} |", code, module, symbol).unwrap();
            }
        }

        message_table(&mut out, model, file, "Request", &method.request);
        message_table(&mut out, model, file, "Response", &method.response);
    }

    out
}

/// Splits method comments into description lines and `@error:` references.
fn parse_comments(method: &RpcMethod) -> (Vec<&str>, Vec<&str>) {
    let mut description = Vec::new();
    let mut errors = Vec::new();
    for line in &method.comment_lines {
        let line = line.trim();
        if let Some(refs) = line.strip_prefix(ERROR_TAG) {
            errors.extend(
                refs.split(|ch: char| ch == ',' || ch.is_whitespace())
                    .filter(|reference| !reference.is_empty()),
            );
        } else if let Some(desc) = line.strip_prefix(DESC_TAG) {
            let desc = desc.trim();
            if !desc.is_empty() {
                description.push(desc);
            }
        } else if !line.is_empty() {
            description.push(line);
        }
    }
    (description, errors)
}

fn message_table(out: &mut String, model: &Model, file: &ProtoFile, title: &str, ty: &str) {
    write!(out, "\n### {} `{}`\n\n", title, ty).unwrap();
    let Some(id) = lookup(model, file, ty) else {
        out.push_str("Type not found.\n");
        return;
    };

    let message = model.symbols().message(id);
    if message.fields().is_empty() {
        out.push_str("No fields.\n");
        return;
    }

    out.push_str("| Field | Type | Comment |\n| --- | --- | --- |\n");
    for field in message.fields() {
        let ty = match field {
            Field::Map { key_ty, .. } => {
                format!("map<{}, {}>", key_ty, field_type(model, field))
            }
            Field::Normal { repeated: true, .. } => {
                format!("repeated {}", field_type(model, field))
            }
            Field::Normal { .. } => field_type(model, field),
        };
        let comments = field.comments();
        let comment = comments
            .leading
            .iter()
            .chain(&comments.trailing)
            .map(|line| line.trim())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "| {} | {} | {} |", field.name(), ty, comment).unwrap();
    }
}

fn lookup(model: &Model, file: &ProtoFile, ty: &str) -> Option<MessageId> {
    let key = if ty.contains('.') {
        ty.replace('.', "_")
    } else {
        format!("{}_{}", file.module(), ty)
    };
    model.symbols().get(&key)
}

/// The display type of a field's element or value: a builtin, a resolved message, a known enum,
/// or `unknown`.
fn field_type(model: &Model, field: &Field) -> String {
    let ty = field.ty();
    if is_builtin(ty) {
        return ty.to_owned();
    }
    if let Some(id) = field.message() {
        return qualified_name(model.symbols(), id);
    }

    let name = ty.rsplit('.').next().unwrap_or(ty);
    if model.symbols().enums().any(|(_, enu)| enu.name() == name) {
        ty.to_owned()
    } else {
        "unknown".to_owned()
    }
}
