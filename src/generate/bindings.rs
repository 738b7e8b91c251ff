use std::path::PathBuf;

use prost::Message;

use super::{GenerateOptions, Layout};
use crate::{
    merge::{overwrite, WriteOutcome},
    model::Model,
    process, Error,
};

/// Writes the encoded descriptors of every loaded file, then runs `protoc` to produce the Go
/// message bindings.
pub(super) fn generate(
    model: &Model,
    options: &GenerateOptions,
    layout: &Layout,
) -> Result<(PathBuf, WriteOutcome), Error> {
    let path = layout.bindings();
    let outcome = overwrite(&path, model.file_descriptor_set().encode_to_vec())?;

    let proto = if options.proto_path.as_os_str().is_empty() {
        PathBuf::from(model.root().name())
    } else {
        options.proto_path.clone()
    };

    let mut args: Vec<String> = options
        .include_paths
        .iter()
        .map(|include| format!("-I={}", include.display()))
        .collect();
    args.push(format!(
        "--go_out={}",
        options.project_root.join("src").display()
    ));
    args.push(proto.display().to_string());

    process::run(&options.protoc, &args)?;
    Ok((path, outcome))
}
