//! Project directory conventions.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{
    error::ErrorKind,
    generate::create_dir,
    merge::{append, read_error, WriteOutcome},
    model::ProtoFile,
    Error,
};

const PROJECT_DIRS: &[&str] = &["src", "proto", "ts"];
const REGISTER_FILE: &str = "server_register.txt";

/// Creates the directory skeleton of a new project under `root`.
pub fn new_project(root: &Path) -> Result<(), Error> {
    for dir in PROJECT_DIRS {
        create_dir(&root.join(dir))?;
    }
    tracing::info!(root = %root.display(), "created project");
    Ok(())
}

/// Returns the closest ancestor of `start`, including `start` itself, which contains a `src`
/// directory.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Error> {
    let start = absolute(start)?;
    start
        .ancestors()
        .find(|dir| dir.join("src").is_dir())
        .map(Path::to_owned)
        .ok_or_else(|| Error::from_kind(ErrorKind::ProjectRootNotFound { path: start.clone() }))
}

/// Returns the closest `server_register.txt` in `start` or any of its ancestors.
pub fn find_register_file(start: &Path) -> Result<PathBuf, Error> {
    let start = absolute(start)?;
    start
        .ancestors()
        .map(|dir| dir.join(REGISTER_FILE))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            Error::from_kind(ErrorKind::RegisterFileNotFound {
                name: REGISTER_FILE,
                path: start.clone(),
            })
        })
}

/// The search path for imports: the directory of the root file, the working directory, the
/// `proto` directory of every `GOPATH` entry which has one, then `extra`.
pub fn include_paths(root_file: &Path, extra: &[PathBuf]) -> Vec<PathBuf> {
    let mut includes = Vec::new();
    if let Some(parent) = root_file.parent() {
        if !parent.as_os_str().is_empty() {
            includes.push(parent.to_owned());
        }
    }
    includes.push(PathBuf::from("."));

    if let Some(gopath) = env::var_os("GOPATH") {
        includes.extend(
            env::split_paths(&gopath)
                .filter(|entry| !entry.as_os_str().is_empty())
                .map(|entry| entry.join("proto"))
                .filter(|proto| proto.exists()),
        );
    }

    includes.extend(extra.iter().cloned());
    includes
}

/// Records the service in the nearest `server_register.txt` above `start`, unless it is already
/// listed.
pub fn register_oss(start: &Path, file: &ProtoFile) -> Result<(PathBuf, WriteOutcome), Error> {
    let path = find_register_file(start)?;
    let content = fs::read_to_string(&path).map_err(|err| read_error(&path, err))?;

    let entry = format!("{} {}", file.service(), file.package());
    if content.lines().any(|line| line.trim() == entry) {
        tracing::debug!(
            path = %path.display(),
            entry = entry.as_str(),
            "service already registered"
        );
        return Ok((path, WriteOutcome::Unchanged));
    }

    let mut line = String::new();
    if !content.is_empty() && !content.ends_with('\n') {
        line.push('\n');
    }
    line.push_str(&entry);
    line.push('\n');
    append(&path, &line)?;
    Ok((path, WriteOutcome::Appended(1)))
}

fn absolute(path: &Path) -> Result<PathBuf, Error> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }
    let cwd = env::current_dir()?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_root_is_closest_ancestor_with_src() {
        let dir = tempfile::tempdir().unwrap();
        new_project(dir.path()).unwrap();
        for sub in PROJECT_DIRS {
            assert!(dir.path().join(sub).is_dir());
        }

        let nested = dir.path().join("src/svc/impl");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested).unwrap(), dir.path());
        assert_eq!(find_project_root(dir.path()).unwrap(), dir.path());
    }

    #[test]
    fn register_file_search() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let err = find_register_file(&nested).unwrap_err();
        assert!(err.to_string().starts_with("file 'server_register.txt' not found"));

        fs::write(dir.path().join(REGISTER_FILE), "").unwrap();
        assert_eq!(
            find_register_file(&nested).unwrap(),
            dir.path().join(REGISTER_FILE)
        );
    }

    #[test]
    fn register_oss_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REGISTER_FILE);
        fs::write(&path, "Other other").unwrap();

        let file = ProtoFile {
            package: "svc".to_owned(),
            service: "Svc".to_owned(),
            ..Default::default()
        };
        assert_eq!(
            register_oss(dir.path(), &file).unwrap(),
            (path.clone(), WriteOutcome::Appended(1))
        );
        assert_eq!(
            register_oss(dir.path(), &file).unwrap(),
            (path.clone(), WriteOutcome::Unchanged)
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "Other other\nSvc svc\n");
    }

    #[test]
    fn include_paths_order() {
        let includes = include_paths(Path::new("proto/svc.proto"), &[PathBuf::from("extra")]);
        assert_eq!(includes.first(), Some(&PathBuf::from("proto")));
        assert_eq!(includes[1], PathBuf::from("."));
        assert_eq!(includes.last(), Some(&PathBuf::from("extra")));

        let includes = include_paths(Path::new("svc.proto"), &[]);
        assert_eq!(includes[0], PathBuf::from("."));
    }
}
