use std::path::{Component, Path, PathBuf};

use super::{path_to_file_name, File, FileResolver};
use crate::Error;

/// An ordered list of include directories, searched on the file system.
///
/// A file name resolves to the first directory containing it, so a file earlier in the search
/// order shadows any file of the same name in later directories.
#[derive(Debug, Default, Clone)]
pub struct IncludePaths {
    dirs: Vec<PathBuf>,
}

impl IncludePaths {
    pub fn new(dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        IncludePaths {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Appends a directory to the end of the search order.
    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.push(dir.into());
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Returns the first include directory containing `name`, and the full path of the file.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rpcgen::file::IncludePaths;
    /// let dir = tempfile::tempdir().unwrap();
    /// std::fs::create_dir_all(dir.path().join("first")).unwrap();
    /// std::fs::create_dir_all(dir.path().join("second")).unwrap();
    /// std::fs::write(dir.path().join("second/svc.proto"), "").unwrap();
    ///
    /// let includes = IncludePaths::new([dir.path().join("first"), dir.path().join("second")]);
    /// let (include, path) = includes.find("svc.proto").unwrap();
    /// assert_eq!(include, dir.path().join("second"));
    /// assert_eq!(path, dir.path().join("second/svc.proto"));
    /// assert!(includes.find("other.proto").is_none());
    /// ```
    pub fn find(&self, name: &str) -> Option<(&Path, PathBuf)> {
        self.dirs.iter().find_map(|dir| {
            let path = dir.join(name);
            path.is_file().then(|| (dir.as_path(), path))
        })
    }
}

impl FileResolver for IncludePaths {
    /// Converts a path under one of the include directories into a file name relative to the
    /// first such directory.
    fn resolve_path(&self, path: &Path) -> Option<String> {
        self.dirs
            .iter()
            .find_map(|dir| strip_include(path, dir).and_then(|rest| path_to_file_name(&rest)))
    }

    fn open_file(&self, name: &str) -> Result<File, Error> {
        match self.find(name) {
            Some((dir, path)) => {
                tracing::debug!(name, include = %dir.display(), "found file");
                File::open(name, &path)
            }
            None => Err(Error::file_not_found(name)),
        }
    }
}

/// Strips `dir` from the front of `path`, ignoring `.` components in both.
fn strip_include(path: &Path, dir: &Path) -> Option<PathBuf> {
    let path: PathBuf = path
        .components()
        .filter(|component| *component != Component::CurDir)
        .collect();
    let dir: PathBuf = dir
        .components()
        .filter(|component| *component != Component::CurDir)
        .collect();
    path.strip_prefix(dir).ok().map(Path::to_owned)
}
