use std::{ffi::OsStr, path::Path, process::Command};

use crate::{error::ErrorKind, Error};

/// Runs an external program to completion and returns its standard output.
///
/// Output on stdout is logged at info level, and output on stderr is logged as a warning when the
/// program succeeds. A non-zero exit status is an error carrying stderr.
pub(crate) fn run<I, S>(program: &Path, args: I) -> Result<String, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = program.display().to_string();
    let mut command = Command::new(program);
    command.args(args);
    tracing::info!(command = ?command, "running");

    let output = command.output().map_err(|err| {
        Error::from_kind(ErrorKind::SpawnProcess {
            program: name.clone(),
            err,
        })
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(Error::from_kind(ErrorKind::ProcessFailed {
            program: name,
            status: output.status,
            stderr: stderr.trim().to_owned(),
        }));
    }

    if !stdout.trim().is_empty() {
        tracing::info!(program = name.as_str(), "{}", stdout.trim());
    }
    if !stderr.trim().is_empty() {
        tracing::warn!(program = name.as_str(), "{}", stderr.trim());
    }
    Ok(stdout)
}
