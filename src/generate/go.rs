use std::{collections::HashSet, fmt::Write, path::Path};

use crate::{
    merge::{
        join_imports, overwrite, write_if_absent, write_incremental, GoFunction, WriteOutcome,
    },
    model::{go_import, ProtoFile, RpcMethod},
    Error,
};

const GENERATED_HEADER: &str = "// Code generated by rpcgen. DO NOT EDIT.\n\n";

/// Imports available to every hand-editable file: the runtime, the service package and the
/// packages of its imports. Unused ones are dropped by [`join_imports`].
fn imports(file: &ProtoFile, runtime_import: &str, with_self: bool) -> Vec<String> {
    let mut imports = vec![runtime_import.to_owned()];
    if with_self {
        imports.push(go_import(file.go_package()));
    }
    imports.extend(file.imports().iter().map(|edge| go_import(&edge.go_package)));
    imports
}

/// The value of `ServiceName`, as registered with the rpc runtime.
fn service_name(file: &ProtoFile) -> &str {
    if file.package().is_empty() {
        file.service()
    } else {
        file.package()
    }
}

/// Qualifies a message type for use outside the service package.
fn qualify(file: &ProtoFile, ty: &str) -> String {
    if ty.contains('.') {
        ty.to_owned()
    } else {
        format!("{}.{}", file.go_package_name(), ty)
    }
}

fn comment_block(lines: &[String]) -> String {
    lines.iter().map(|line| format!("//{}\n", line)).collect()
}

pub(super) fn client(
    file: &ProtoFile,
    options: &super::GenerateOptions,
    path: &Path,
) -> Result<WriteOutcome, Error> {
    let functions: Vec<GoFunction> = file
        .methods()
        .iter()
        .map(|method| GoFunction {
            name: method.name.clone(),
            source: format!(
                "\nfunc {name}(ctx *rpc.Context, req *{req}) (*{rsp}, error) {{\n\
                 \trsp := &{rsp}{{}}\n\
                 \treturn rsp, rpc.ClientCall(ctx, ServiceName, {name}CMDPath, req, rsp)\n\
                 }}\n",
                name = method.name,
                req = method.request,
                rsp = method.response,
            ),
        })
        .collect();

    let imports = imports(file, &options.runtime_import, false);
    let header = |body: &str| {
        format!(
            "package {}\n\nimport (\n{}\n)\n\nvar ServiceName = \"{}\"\n",
            file.go_package_name(),
            join_imports(&imports, body),
            service_name(file),
        )
    };
    write_incremental(path, header, &functions)
}

pub(super) fn logic(
    file: &ProtoFile,
    options: &super::GenerateOptions,
    path: &Path,
) -> Result<WriteOutcome, Error> {
    let functions: Vec<GoFunction> = file
        .methods()
        .iter()
        .map(|method| GoFunction {
            name: method.name.clone(),
            source: format!(
                "\n{}func (s *Service) {}(ctx *rpc.Context, req *{}, rsp *{}) error {{\n\
                 \treturn nil\n\
                 }}\n",
                comment_block(&method.comment_lines),
                method.name,
                qualify(file, &method.request),
                qualify(file, &method.response),
            ),
        })
        .collect();

    let imports = imports(file, &options.runtime_import, true);
    let header = |body: &str| {
        format!(
            "package impl\n\nimport (\n{}\n)\n",
            join_imports(&imports, body)
        )
    };
    write_incremental(path, header, &functions)
}

pub(super) fn tool(
    file: &ProtoFile,
    options: &super::GenerateOptions,
    path: &Path,
) -> Result<WriteOutcome, Error> {
    let functions: Vec<GoFunction> = file
        .methods()
        .iter()
        .map(|method| GoFunction {
            name: method.name.clone(),
            source: format!(
                "\nfunc {name}(ctx *rpc.Context) (*{rsp}, error) {{\n\
                 \treq := &{req}{{}}\n\
                 \treturn {pkg}.{name}(ctx, req)\n\
                 }}\n",
                name = method.name,
                req = qualify(file, &method.request),
                rsp = qualify(file, &method.response),
                pkg = file.go_package_name(),
            ),
        })
        .collect();

    let imports = imports(file, &options.runtime_import, true);
    let header = |body: &str| {
        format!(
            "package main\n\nimport (\n{}\n)\n\nfunc main() {{\n\trpc.RunTool()\n}}\n",
            join_imports(&imports, &format!("rpc.\n{}", body)),
        )
    };
    write_incremental(path, header, &functions)
}

/// Command id and path constants, regenerated on every run.
pub(super) fn def(file: &ProtoFile, path: &Path) -> Result<WriteOutcome, Error> {
    let mut content = format!(
        "{}package {}\n\nconst (\n",
        GENERATED_HEADER,
        file.go_package_name()
    );
    for method in file.methods() {
        writeln!(content, "\t{}CMDID = {}", method.name, method.cmd_id).unwrap();
        let cmd_path = cmd_path(file, method);
        writeln!(content, "\t{}CMDPath = \"{}\"", method.name, cmd_path).unwrap();
        if method.flags != 0 {
            writeln!(content, "\t{}Flags = {}", method.name, method.flags).unwrap();
        }
    }
    content.push_str(")\n");
    overwrite(path, &content)
}

pub(crate) fn cmd_path(file: &ProtoFile, method: &RpcMethod) -> String {
    if method.url.is_empty() {
        format!("/{}/{}", file.service(), method.name)
    } else {
        method.url.clone()
    }
}

/// One constant per error code. A name declared by several error-code enums is written once.
pub(super) fn errcode(file: &ProtoFile, path: &Path) -> Result<WriteOutcome, Error> {
    let mut content = format!("{}package {}\n", GENERATED_HEADER, file.go_package_name());
    let mut seen = HashSet::new();
    for set in file.err_codes() {
        write!(content, "\n// {}\nconst (\n", set.name).unwrap();
        for value in &set.values {
            if !seen.insert(value.name.as_str()) {
                tracing::warn!(
                    name = value.name.as_str(),
                    set = set.name.as_str(),
                    "duplicate error code"
                );
                continue;
            }
            for line in &value.comments.leading {
                writeln!(content, "\t//{}", line).unwrap();
            }
            write!(content, "\t{} = {}", value.name, value.number).unwrap();
            match &value.comments.trailing {
                Some(trailing) => {
                    writeln!(content, " //{}", trailing).unwrap();
                }
                None => content.push('\n'),
            }
        }
        content.push_str(")\n");
    }
    overwrite(path, &content)
}

pub(super) fn logic_cfg(
    file: &ProtoFile,
    options: &super::GenerateOptions,
    path: &Path,
) -> Result<WriteOutcome, Error> {
    let content = format!(
        r#"package impl

import (
	"{runtime}"
)

// Service implements the {svc} rpc handlers.
type Service struct{{}}

// Config is read from server/{svc}.toml.
type Config struct {{
	Name    string `toml:"name"`
	Address string `toml:"address"`
}}

func LoadConfig(path string) (*Config, error) {{
	cfg := &Config{{}}
	return cfg, rpc.LoadConfig(path, cfg)
}}
"#,
        runtime = options.runtime_import,
        svc = file.service(),
    );
    write_if_absent(path, &content)
}

pub(super) fn server(
    file: &ProtoFile,
    options: &super::GenerateOptions,
    path: &Path,
) -> Result<WriteOutcome, Error> {
    let content = format!(
        r#"package main

import (
	"{runtime}"
	{pkg} "{import}"
	"{import}/impl"
)

func main() {{
	rpc.ServerMain({pkg}.ServiceName, &impl.Service{{}}, impl.LoadConfig)
}}
"#,
        runtime = options.runtime_import,
        pkg = file.go_package_name(),
        import = file.go_import_path(),
    );
    write_if_absent(path, &content)
}

pub(super) fn conf(file: &ProtoFile, path: &Path) -> Result<WriteOutcome, Error> {
    let content = format!(
        r#"name = "{svc}"
address = ":0"

[log]
level = "info"
path = "log/{svc}.log"
"#,
        svc = file.service(),
    );
    write_if_absent(path, &content)
}

pub(super) fn supervisor_conf(file: &ProtoFile, path: &Path) -> Result<WriteOutcome, Error> {
    let content = format!(
        r#"[program:{svc}]
command = %(here)s/{svc} -c %(here)s/{svc}.toml
directory = %(here)s
autostart = true
autorestart = true
stdout_logfile = %(here)s/log/{svc}.stdout.log
redirect_stderr = true
"#,
        svc = file.service(),
    );
    write_if_absent(path, &content)
}

/// A persistence backend whose connection name is written into a scaffold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum State {
    Db,
    Redis,
    ObjCache,
}

impl State {
    pub(super) fn file_suffix(self) -> &'static str {
        match self {
            State::Db => "statedb_autogen.go",
            State::Redis => "stateredis_autogen.go",
            State::ObjCache => "stateobjcache_autogen.go",
        }
    }

    fn constant(self) -> &'static str {
        match self {
            State::Db => "StateDb",
            State::Redis => "StateRedis",
            State::ObjCache => "StateObjCache",
        }
    }
}

/// Writes a state scaffold. Explicit requests replace the file, while full generation only
/// creates it.
pub(super) fn state(
    state: State,
    value: &str,
    path: &Path,
    only_if_absent: bool,
) -> Result<WriteOutcome, Error> {
    let content = format!(
        "{}package impl\n\nconst {} = \"{}\"\n",
        GENERATED_HEADER,
        state.constant(),
        value
    );
    if only_if_absent {
        write_if_absent(path, &content)
    } else {
        overwrite(path, &content)
    }
}
