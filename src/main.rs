use std::{env, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rpcgen::{
    edit::add_rpc,
    generate::StateConfig,
    profile::{server_profile, ProfileAction, DEFAULT_CONTROL_PROGRAM},
    project::{find_project_root, include_paths, new_project},
    Compiler, GenerateFlags, GenerateOptions,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the directory layout of a new project.
    NewProject {
        /// The project root directory.
        #[clap(short = 'r', long = "root", value_name = "PATH", value_parser)]
        root: PathBuf,
    },
    /// Generate every artifact except documentation and service registration.
    GenerateAll(GenerateArgs),
    /// Generate wire-format bindings with protoc.
    GenerateBindings(GenerateArgs),
    /// Generate the error-code constants.
    GenerateErrcodes(GenerateArgs),
    /// Generate TypeScript declarations.
    GenerateTypes(GenerateArgs),
    /// Generate the client stubs and command definitions.
    GenerateClient(GenerateArgs),
    /// Generate the logic skeleton and tool.
    GenerateLogic(GenerateArgs),
    /// Generate the server entry point.
    GenerateServer(GenerateArgs),
    /// Generate the server and supervisor configuration.
    GenerateConf(GenerateArgs),
    /// Generate markdown documentation.
    GenerateDoc(GenerateArgs),
    /// Write the database state scaffold.
    SetStateDb {
        #[clap(flatten)]
        args: GenerateArgs,
        /// The database connection name.
        #[clap(long = "db", value_name = "NAME", default_value = "default")]
        db: String,
    },
    /// Write the redis state scaffold.
    SetStateRedis {
        #[clap(flatten)]
        args: GenerateArgs,
        /// The redis connection name.
        #[clap(long = "redis", value_name = "NAME")]
        redis: String,
    },
    /// Write the object cache state scaffold.
    SetStateObjcache {
        #[clap(flatten)]
        args: GenerateArgs,
        /// The object cache name.
        #[clap(long = "obj-cache", visible_alias = "obj_cache", value_name = "NAME")]
        obj_cache: String,
    },
    /// Add the service to the nearest server_register.txt.
    RegisterOss(GenerateArgs),
    /// Add an rpc method, with empty request and response messages, to a protobuf file.
    AddRpc {
        /// The protobuf file to edit.
        #[clap(short = 'p', long = "proto", value_name = "PROTO_FILE", value_parser)]
        proto: PathBuf,
        /// The rpc method name.
        #[clap(short = 'r', long = "rpc", value_name = "NAME")]
        name: String,
        /// Options of a list request, which are declared as a `<name>ListOption` enum.
        #[clap(short = 'l', long = "list", value_name = "OPTIONS", value_delimiter = ',')]
        list_options: Vec<String>,
    },
    /// Start or stop profiling a running server.
    ServerProfile {
        /// The server name.
        #[clap(short = 's', long = "server", value_name = "NAME")]
        server: String,
        /// The address of a single server instance.
        #[clap(short = 'a', long = "address", value_name = "ADDRESS")]
        address: Option<String>,
        /// Whether to start or stop profiling.
        #[clap(short = 'x', long = "action", value_name = "ACTION", value_enum)]
        action: ProfileAction,
        /// The control program to run.
        #[clap(long = "control", value_name = "PROGRAM", default_value = DEFAULT_CONTROL_PROGRAM)]
        control: PathBuf,
    },
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// The root protobuf file.
    #[clap(short = 'p', long = "proto", value_name = "PROTO_FILE", value_parser)]
    proto: PathBuf,
    /// Additional directories in which to search for imports.
    #[clap(
        short = 'I',
        long = "include",
        visible_alias = "proto_path",
        value_name = "PATH",
        value_delimiter = ',',
        value_parser
    )]
    includes: Vec<PathBuf>,
    /// The import path of the Go rpc runtime package.
    #[clap(long = "runtime", value_name = "IMPORT_PATH", default_value = "brick/rpc")]
    runtime: String,
    /// The protoc executable.
    #[clap(long = "protoc", value_name = "PATH", default_value = "protoc", value_parser)]
    protoc: PathBuf,
}

pub fn main() -> Result<()> {
    miette::set_panic_hook();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::NewProject { root } => new_project(&root)?,
        Command::GenerateAll(args) => run(&args, GenerateFlags::ALL, StateConfig::default())?,
        Command::GenerateBindings(args) => run(&args, GenerateFlags::PB, StateConfig::default())?,
        Command::GenerateErrcodes(args) => {
            run(&args, GenerateFlags::ERRCODE, StateConfig::default())?
        }
        Command::GenerateTypes(args) => run(&args, GenerateFlags::TYPES, StateConfig::default())?,
        Command::GenerateClient(args) => run(
            &args,
            GenerateFlags::CLIENT | GenerateFlags::DEF,
            StateConfig::default(),
        )?,
        Command::GenerateLogic(args) => run(
            &args,
            GenerateFlags::LOGIC | GenerateFlags::TOOL,
            StateConfig::default(),
        )?,
        Command::GenerateServer(args) => {
            run(&args, GenerateFlags::SERVER, StateConfig::default())?
        }
        Command::GenerateConf(args) => run(&args, GenerateFlags::CONF, StateConfig::default())?,
        Command::GenerateDoc(args) => run(&args, GenerateFlags::DOC, StateConfig::default())?,
        Command::SetStateDb { args, db } => run(
            &args,
            GenerateFlags::STATE_DB,
            StateConfig {
                db,
                ..Default::default()
            },
        )?,
        Command::SetStateRedis { args, redis } => run(
            &args,
            GenerateFlags::STATE_REDIS,
            StateConfig {
                redis,
                ..Default::default()
            },
        )?,
        Command::SetStateObjcache { args, obj_cache } => run(
            &args,
            GenerateFlags::STATE_OBJ_CACHE,
            StateConfig {
                obj_cache,
                ..Default::default()
            },
        )?,
        Command::RegisterOss(args) => {
            run(&args, GenerateFlags::REGISTER_OSS, StateConfig::default())?
        }
        Command::AddRpc {
            proto,
            name,
            list_options,
        } => {
            add_rpc(&proto, &name, &list_options)?;
        }
        Command::ServerProfile {
            server,
            address,
            action,
            control,
        } => {
            server_profile(&control, &server, address.as_deref(), action)?;
        }
    }
    Ok(())
}

fn run(args: &GenerateArgs, flags: GenerateFlags, state: StateConfig) -> Result<()> {
    let project_root = find_project_root(&env::current_dir().into_diagnostic()?)?;
    let includes = include_paths(&args.proto, &args.includes);

    let mut compiler = Compiler::new(&includes);
    compiler.add_file(&args.proto)?;
    let model = compiler.finish()?;

    let options = GenerateOptions {
        runtime_import: args.runtime.clone(),
        state,
        protoc: args.protoc.clone(),
        proto_path: args.proto.clone(),
        include_paths: includes,
        ..GenerateOptions::new(project_root, flags)
    };
    let outputs = rpcgen::generate(&model, &options)?;
    tracing::info!(files = outputs.len(), root = %options.project_root.display(), "done");
    Ok(())
}
