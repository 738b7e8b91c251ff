//! Starting and stopping the profiler of a running server.

use std::{fmt, path::Path};

use crate::{process, Error};

/// The program invoked by [`server_profile`] unless another is given.
pub const DEFAULT_CONTROL_PROGRAM: &str = "rpcctl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bin", derive(clap::ValueEnum))]
pub enum ProfileAction {
    /// Start collecting a profile.
    Start,
    /// Stop profiling and write out the collected profile.
    Stop,
}

impl ProfileAction {
    fn as_str(self) -> &'static str {
        match self {
            ProfileAction::Start => "start",
            ProfileAction::Stop => "stop",
        }
    }
}

impl fmt::Display for ProfileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asks the control program to start or stop profiling `server`, optionally at a specific
/// instance address.
pub fn server_profile(
    control: &Path,
    server: &str,
    address: Option<&str>,
    action: ProfileAction,
) -> Result<(), Error> {
    process::run(control, profile_args(server, address, action))?;
    tracing::info!(server, %action, "profile request sent");
    Ok(())
}

fn profile_args(server: &str, address: Option<&str>, action: ProfileAction) -> Vec<String> {
    let mut args = vec!["profile".to_owned(), action.to_string(), server.to_owned()];
    if let Some(address) = address.filter(|address| !address.is_empty()) {
        args.push(format!("--address={}", address));
    }
    args
}
