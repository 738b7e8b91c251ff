//! A code generator for protobuf services annotated with rpc command options.
//!
//! A [`Compiler`] loads a root `.proto` file and the closure of its imports, builds a
//! [`Model`] of every message, enum and rpc method, and resolves the type of each message field.
//! [`generate()`] then writes Go client stubs, server scaffolding, error-code tables and
//! TypeScript declarations from the model. Files which are edited by hand between runs are only
//! ever appended to.
//!
//! # Examples
//!
//! ```
//! # use std::fs;
//! # let tempdir = tempfile::TempDir::new().unwrap();
//! # let project = tempdir.path();
//! # fs::create_dir_all(project.join("proto")).unwrap();
//! # fs::write(project.join("proto/svc.proto"), r#"
//! #     package svc;
//! #     option go_package = "svc";
//! #     service Svc { rpc Ping(PingReq) returns (PingRsp) { option(ext.CmdID) = 1; } }
//! #     message PingReq {}
//! #     message PingRsp { string msg = 1; }
//! # "#).unwrap();
//! use rpcgen::{Compiler, GenerateFlags, GenerateOptions};
//!
//! let mut compiler = Compiler::new([project.join("proto")]);
//! compiler.add_file(project.join("proto/svc.proto"))?;
//! let model = compiler.finish()?;
//!
//! let options = GenerateOptions::new(project, GenerateFlags::CLIENT | GenerateFlags::DEF);
//! rpcgen::generate(&model, &options)?;
//!
//! let client = fs::read_to_string(project.join("src/svc/Svcclient.go")).unwrap();
//! assert!(client.contains("func Ping(ctx *rpc.Context, req *PingReq) (*PingRsp, error)"));
//! # Ok::<(), rpcgen::Error>(())
//! ```
//!
//! ### Error messages
//!
//! Errors implement [`miette::Diagnostic`]. Syntax errors and missing imports point at the
//! offending source when rendered with `miette`'s `fancy` feature.
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod edit;
pub mod file;
pub mod generate;
pub mod merge;
pub mod model;
pub mod names;
pub mod profile;
pub mod project;

mod build;
mod compile;
mod errcode;
mod error;
mod lex;
mod process;
mod resolve;
mod symbols;
mod tag;

use std::path::Path;

pub use {prost, prost_types};

pub use self::compile::Compiler;
pub use self::errcode::ErrCodeRegistry;
pub use self::error::Error;
pub use self::generate::{generate, GenerateFlags, GenerateOptions, Output};
pub use self::model::Model;
pub use self::symbols::SymbolTable;

/// Loads a root protobuf file and its imports, searching `includes` in order, and resolves the
/// resulting model.
///
/// This is equivalent to adding the file to a [`Compiler`] and calling
/// [`finish`](Compiler::finish).
pub fn compile(
    file: impl AsRef<Path>,
    includes: impl IntoIterator<Item = impl AsRef<Path>>,
) -> Result<Model, Error> {
    let mut compiler = Compiler::new(includes);
    compiler.add_file(file)?;
    compiler.finish()
}
