//! Artifact emitters driven by the resolved [`Model`].

mod bindings;
mod doc;
mod go;
mod ts;

#[cfg(test)]
mod tests;

use std::{
    fs,
    path::{Path, PathBuf},
};

use bitflags::bitflags;

use crate::{
    error::ErrorKind,
    merge::WriteOutcome,
    model::{Model, ProtoFile},
    project, Error,
};

bitflags! {
    /// Selects which artifacts [`generate`] writes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GenerateFlags: u32 {
        /// Wire-format bindings, through `protoc`.
        const PB = 1;
        const ERRCODE = 1 << 1;
        const CLIENT = 1 << 2;
        /// Command id and path constants.
        const DEF = 1 << 3;
        /// TypeScript declarations.
        const TYPES = 1 << 4;
        /// Adds the service to the nearest `server_register.txt`.
        const REGISTER_OSS = 1 << 5;
        const TOOL = 1 << 6;
        const STATE_DB = 1 << 7;
        const STATE_REDIS = 1 << 8;
        const STATE_OBJ_CACHE = 1 << 9;
        const DOC = 1 << 10;
        const LOGIC = 1 << 11;
        const SERVER = 1 << 12;
        const CONF = 1 << 13;

        const STATES = Self::STATE_DB.bits()
            | Self::STATE_REDIS.bits()
            | Self::STATE_OBJ_CACHE.bits();

        /// Everything except documentation and service registration, which are only written
        /// on request.
        const ALL = Self::PB.bits()
            | Self::ERRCODE.bits()
            | Self::CLIENT.bits()
            | Self::DEF.bits()
            | Self::TYPES.bits()
            | Self::TOOL.bits()
            | Self::STATE_DB.bits()
            | Self::STATE_REDIS.bits()
            | Self::STATE_OBJ_CACHE.bits()
            | Self::LOGIC.bits()
            | Self::SERVER.bits()
            | Self::CONF.bits();
    }
}

const DEFAULT_RUNTIME_IMPORT: &str = "brick/rpc";
const DEFAULT_PROTOC: &str = "protoc";
const DB_PREFIX: &str = "$dispatch.mysql.";

/// Options for [`generate`].
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// The directory containing `src/`, under which artifacts are written.
    pub project_root: PathBuf,
    pub flags: GenerateFlags,
    /// Import path of the Go rpc runtime package referenced as `rpc.` by generated code.
    pub runtime_import: String,
    pub state: StateConfig,
    /// The `protoc` executable used for [`GenerateFlags::PB`].
    pub protoc: PathBuf,
    /// The root file as passed on the command line, handed to `protoc`.
    pub proto_path: PathBuf,
    /// Include paths handed to `protoc`.
    pub include_paths: Vec<PathBuf>,
}

/// Connection names written into the state scaffolds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateConfig {
    pub db: String,
    pub redis: String,
    pub obj_cache: String,
}

impl StateConfig {
    /// The database name, qualified with the dispatch prefix if it was given bare.
    pub fn db(&self) -> String {
        if self.db.is_empty() || self.db.contains(DB_PREFIX) {
            self.db.clone()
        } else {
            format!("{}{}", DB_PREFIX, self.db)
        }
    }
}

impl GenerateOptions {
    pub fn new(project_root: impl Into<PathBuf>, flags: GenerateFlags) -> Self {
        GenerateOptions {
            project_root: project_root.into(),
            flags,
            runtime_import: DEFAULT_RUNTIME_IMPORT.to_owned(),
            state: StateConfig::default(),
            protoc: PathBuf::from(DEFAULT_PROTOC),
            proto_path: PathBuf::new(),
            include_paths: Vec::new(),
        }
    }
}

/// A file touched by [`generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub path: PathBuf,
    pub outcome: WriteOutcome,
}

/// Writes every artifact selected by `options.flags` for the root file of `model`.
///
/// # Errors
///
/// Returns an error if the root file has no `go_package` option, an output directory cannot be
/// created, an existing hand-edited file cannot be parsed, or `protoc` fails.
pub fn generate(model: &Model, options: &GenerateOptions) -> Result<Vec<Output>, Error> {
    let file = model.root();
    if file.go_package().is_empty() {
        return Err(Error::from_kind(ErrorKind::MissingGoPackage {
            name: file.name().to_owned(),
        }));
    }

    let layout = Layout::new(&options.project_root, file);
    create_dir(&layout.module_dir)?;

    let flags = options.flags;
    // State scaffolds are only replaced when requested on their own.
    let scaffold_only = !(flags - GenerateFlags::STATES).is_empty();
    let has_methods = !file.methods().is_empty();
    let mut outputs = Vec::new();
    let mut emit = |path: PathBuf, outcome: WriteOutcome| {
        tracing::info!(path = %path.display(), ?outcome, "generated");
        outputs.push(Output { path, outcome });
    };

    if flags.contains(GenerateFlags::PB) {
        let (path, outcome) = bindings::generate(model, options, &layout)?;
        emit(path, outcome);
    }

    if flags.contains(GenerateFlags::TYPES) {
        create_dir(&layout.ts_dir)?;
        let path = layout.types();
        emit(path.clone(), ts::generate(model, &path)?);
    }

    if flags.contains(GenerateFlags::REGISTER_OSS) {
        let (path, outcome) = project::register_oss(&options.project_root, file)?;
        emit(path, outcome);
    }

    if flags.contains(GenerateFlags::ERRCODE) {
        if file.err_codes().is_empty() {
            tracing::debug!(file = file.name(), "no error codes declared");
        } else {
            let path = layout.errcode();
            emit(path.clone(), go::errcode(file, &path)?);
        }
    }

    if flags.contains(GenerateFlags::DOC) {
        let path = layout.doc();
        emit(path.clone(), doc::generate(model, &path)?);
    }

    if !has_methods {
        if flags.intersects(GenerateFlags::DEF | GenerateFlags::CLIENT | GenerateFlags::LOGIC) {
            tracing::info!(file = file.name(), "no rpc methods declared");
        }
    } else {
        if flags.contains(GenerateFlags::DEF) {
            let path = layout.def();
            emit(path.clone(), go::def(file, &path)?);
        }

        if flags.contains(GenerateFlags::CLIENT) {
            let path = layout.client();
            emit(path.clone(), go::client(file, options, &path)?);
        }

        if flags.contains(GenerateFlags::LOGIC) {
            create_dir(&layout.impl_dir())?;
            let path = layout.logic();
            emit(path.clone(), go::logic(file, options, &path)?);
            let path = layout.logic_cfg();
            emit(path.clone(), go::logic_cfg(file, options, &path)?);
        }

        if flags.contains(GenerateFlags::TOOL) {
            create_dir(&layout.tool_dir())?;
            let path = layout.tool();
            emit(path.clone(), go::tool(file, options, &path)?);
        }
    }

    if flags.contains(GenerateFlags::SERVER) {
        create_dir(&layout.server_dir())?;
        let path = layout.server();
        emit(path.clone(), go::server(file, options, &path)?);
    }

    if flags.contains(GenerateFlags::CONF) {
        create_dir(&layout.server_dir())?;
        let path = layout.conf();
        emit(path.clone(), go::conf(file, &path)?);
        let path = layout.supervisor_conf();
        emit(path.clone(), go::supervisor_conf(file, &path)?);
    }

    let states = [
        (GenerateFlags::STATE_DB, go::State::Db, options.state.db()),
        (
            GenerateFlags::STATE_REDIS,
            go::State::Redis,
            options.state.redis.clone(),
        ),
        (
            GenerateFlags::STATE_OBJ_CACHE,
            go::State::ObjCache,
            options.state.obj_cache.clone(),
        ),
    ];
    for (flag, state, value) in states {
        if flags.contains(flag) {
            create_dir(&layout.impl_dir())?;
            let path = layout.state(state);
            emit(path.clone(), go::state(state, &value, &path, scaffold_only)?);
        }
    }

    Ok(outputs)
}

/// Paths of every artifact generated for one service.
#[derive(Debug)]
pub(crate) struct Layout {
    module_dir: PathBuf,
    ts_dir: PathBuf,
    service: String,
}

impl Layout {
    pub(crate) fn new(project_root: &Path, file: &ProtoFile) -> Self {
        Layout {
            module_dir: project_root.join("src").join(file.go_import_path()),
            ts_dir: project_root.join("ts"),
            service: file.service().to_owned(),
        }
    }

    fn file(&self, dir: &Path, suffix: &str) -> PathBuf {
        dir.join(format!("{}{}", self.service, suffix))
    }

    fn impl_dir(&self) -> PathBuf {
        self.module_dir.join("impl")
    }

    fn server_dir(&self) -> PathBuf {
        self.module_dir.join("server")
    }

    fn tool_dir(&self) -> PathBuf {
        self.module_dir.join("tool")
    }

    fn client(&self) -> PathBuf {
        self.file(&self.module_dir, "client.go")
    }

    fn def(&self) -> PathBuf {
        self.file(&self.module_dir, "def.go")
    }

    fn errcode(&self) -> PathBuf {
        self.file(&self.module_dir, "errcode.go")
    }

    fn doc(&self) -> PathBuf {
        self.file(&self.module_dir, ".md")
    }

    fn bindings(&self) -> PathBuf {
        self.file(&self.module_dir, ".pb.bin")
    }

    fn logic(&self) -> PathBuf {
        self.file(&self.impl_dir(), "impl.go")
    }

    fn logic_cfg(&self) -> PathBuf {
        self.file(&self.impl_dir(), "cfg.go")
    }

    fn state(&self, state: go::State) -> PathBuf {
        self.file(&self.impl_dir(), state.file_suffix())
    }

    fn server(&self) -> PathBuf {
        self.file(&self.server_dir(), ".go")
    }

    fn conf(&self) -> PathBuf {
        self.file(&self.server_dir(), ".toml")
    }

    fn supervisor_conf(&self) -> PathBuf {
        self.server_dir()
            .join(format!("supervisor.{}.conf", self.service))
    }

    fn tool(&self) -> PathBuf {
        self.file(&self.tool_dir(), "_tool.go")
    }

    fn types(&self) -> PathBuf {
        self.ts_dir
            .join(format!("{}.{}.d.ts", self.service, self.service))
    }
}

pub(crate) fn create_dir(path: &Path) -> Result<(), Error> {
    fs::create_dir_all(path).map_err(|err| {
        Error::from_kind(ErrorKind::CreateDir {
            path: path.to_owned(),
            err,
        })
    })
}
