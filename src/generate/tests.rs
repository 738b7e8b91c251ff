use std::{collections::HashMap, fs};

use super::*;
use crate::{
    file::{File, FileResolver},
    Compiler,
};

struct TestFileResolver {
    files: HashMap<&'static str, &'static str>,
}

impl FileResolver for TestFileResolver {
    fn resolve_path(&self, path: &Path) -> Option<String> {
        path.to_str().map(ToOwned::to_owned)
    }

    fn open_file(&self, name: &str) -> Result<File, Error> {
        match self.files.get(name) {
            Some(source) => File::from_source(name, source),
            None => Err(Error::file_not_found(name)),
        }
    }
}

fn model(root: &str, files: &[(&'static str, &'static str)]) -> Model {
    let mut compiler = Compiler::with_file_resolver(TestFileResolver {
        files: files.iter().copied().collect(),
    });
    compiler.add_file(root).unwrap();
    compiler.finish().unwrap()
}

const SVC: &str = r#"
package svc;
option go_package = "example.com/svc";

service Svc {
    // Sends a ping.
    rpc Ping(PingReq) returns (PingRsp) { option(ext.CmdID) = 1; }
    rpc Info(Outer) returns (Outer.Inner) {
        option(ext.CmdID) = 2;
        option(ext.Url) = "/v1/info";
        option(ext.Flags) = 4;
    }
}

enum Color {
    // The default.
    Red = 0;
    Blue = 1; // trailing
}

message Outer {
    message Inner {
        int64 id = 1;
    }
    Inner inner = 1;
    // Tags by name.
    map<string, Inner> tags = 2;
    repeated Color colors = 3;
    bool ok = 4; // flag
}

message PingReq {}

message PingRsp {
    string msg = 1;
    repeated uint32 ids = 2;
    double score = 3;
    bytes raw = 4;
}
"#;

#[test]
fn typescript_declarations() {
    let model = model("svc.proto", &[("svc.proto", SVC)]);

    similar_asserts::assert_eq!(
        ts::render(&model),
        r#"// Code generated by rpcgen. DO NOT EDIT.

declare namespace Svc {
    export const enum Color {
        // The default.
        Red = 0,
        Blue = 1, // trailing
    }

    export interface Outer {
        inner?: Outer_Inner;

        // Tags by name.
        tags?: {[key: string]: Outer_Inner};
        colors?: Array<Color>;
        ok?: boolean; // flag
    }

    export interface Outer_Inner {
        id?: string;
    }

    export interface PingReq {
    }

    export interface PingRsp {
        msg?: string;
        ids?: Array<number>;
        score?: number;
        raw?: string;
    }

    export interface SvcService {
        // Sends a ping.
        Ping: (r:PingReq) => PingRsp;
        Info: (r:Outer) => Outer.Inner;
    }
}
"#
    );
}

#[test]
fn definitions() {
    let dir = tempfile::tempdir().unwrap();
    let model = model("svc.proto", &[("svc.proto", SVC)]);
    let path = dir.path().join("Svcdef.go");

    assert_eq!(go::def(model.root(), &path).unwrap(), WriteOutcome::Created);
    similar_asserts::assert_eq!(
        fs::read_to_string(&path).unwrap(),
        r#"// Code generated by rpcgen. DO NOT EDIT.

package svc

const (
	PingCMDID = 1
	PingCMDPath = "/Svc/Ping"
	InfoCMDID = 2
	InfoCMDPath = "/v1/info"
	InfoFlags = 4
)
"#
    );
    assert_eq!(go::def(model.root(), &path).unwrap(), WriteOutcome::Overwritten);
}

#[test]
fn error_codes_are_deduplicated() {
    let dir = tempfile::tempdir().unwrap();
    let model = model(
        "codes.proto",
        &[(
            "codes.proto",
            r#"
                option go_package = "codes";
                enum ErrCode {
                    // Everything is fine.
                    Success = 0;
                    ErrDenied = 403; // no access
                }
                message Nested {
                    enum NestedErrCode { NestedOk = 0; ErrDenied = 1; ErrGone = 410; }
                }
            "#,
        )],
    );
    let path = dir.path().join("codeserrcode.go");
    go::errcode(model.root(), &path).unwrap();

    similar_asserts::assert_eq!(
        fs::read_to_string(&path).unwrap(),
        r#"// Code generated by rpcgen. DO NOT EDIT.

package codes

// NestedErrCode
const (
	NestedOk = 0
	ErrDenied = 1
	ErrGone = 410
)

// ErrCode
const (
	// Everything is fine.
	Success = 0
)
"#
    );
}

#[test]
fn documentation() {
    let model = model(
        "svc.proto",
        &[
            (
                "svc.proto",
                r#"
                    package svc;
                    option go_package = "svc";
                    service Svc {
                        // @desc: Checks liveness.
                        // @error: modX.ErrFoo, ErrLocal modX.ErrMissing
                        rpc Ping(PingReq) returns (PingRsp) { option(ext.CmdID) = 1; }
                    }
                    enum ErrCode { Ok = 0; ErrLocal = 5; }
                    message PingReq {}
                    message PingRsp {
                        string msg = 1; // the reply
                        Missing missing = 2;
                        repeated ErrCode codes = 3;
                    }
                "#,
            ),
            ("modX.proto", "enum ErrCode { Success = 0; ErrFoo = 1001; }"),
        ],
    );

    let doc = doc::render(&model);
    assert!(doc.starts_with("# Svc\n\nPackage `svc`.\n\n## Ping\n\n- Command ID: 1\n- Path: `/Svc/Ping`\n\nChecks liveness.\n"), "{}", doc);
    assert!(doc.contains("| 1001 | modX.ErrFoo |\n| 5 | svc.ErrLocal |\n| unknown | modX.ErrMissing |\n"), "{}", doc);
    assert!(doc.contains("### Request `PingReq`\n\nNo fields.\n"), "{}", doc);
    assert!(doc.contains("| msg | string | the reply |\n| missing | unknown |  |\n| codes | repeated ErrCode |  |\n"), "{}", doc);
    assert_eq!(model.err_codes().load_count(), 1);
}

#[test]
fn missing_go_package() {
    let dir = tempfile::tempdir().unwrap();
    let model = model("svc.proto", &[("svc.proto", "service Svc {}")]);
    let err = generate(&model, &GenerateOptions::new(dir.path(), GenerateFlags::ALL)).unwrap_err();

    assert_eq!(err.to_string(), "missing 'go_package' option in 'svc.proto'");
    assert!(!dir.path().join("src").exists());
}

#[test]
fn full_generation_layout() {
    let dir = tempfile::tempdir().unwrap();
    let model = model(
        "svc.proto",
        &[(
            "svc.proto",
            r#"
                package svc;
                option go_package = "example.com/svc";
                service Svc { rpc Ping(PingReq) returns (PingRsp) { option(ext.CmdID) = 1; } }
                enum ErrCode { Ok = 0; ErrFoo = 1; }
                message PingReq {}
                message PingRsp {}
            "#,
        )],
    );

    let options = GenerateOptions::new(dir.path(), GenerateFlags::ALL - GenerateFlags::PB);
    let outputs = generate(&model, &options).unwrap();

    let module = dir.path().join("src/example.com/svc");
    let mut expected = vec![
        dir.path().join("ts/Svc.Svc.d.ts"),
        module.join("Svcerrcode.go"),
        module.join("Svcdef.go"),
        module.join("Svcclient.go"),
        module.join("impl/Svcimpl.go"),
        module.join("impl/Svccfg.go"),
        module.join("tool/Svc_tool.go"),
        module.join("server/Svc.go"),
        module.join("server/Svc.toml"),
        module.join("server/supervisor.Svc.conf"),
        module.join("impl/Svcstatedb_autogen.go"),
        module.join("impl/Svcstateredis_autogen.go"),
        module.join("impl/Svcstateobjcache_autogen.go"),
    ];
    let mut paths: Vec<_> = outputs.iter().map(|output| output.path.clone()).collect();
    assert_eq!(paths, expected);
    assert!(outputs
        .iter()
        .all(|output| output.outcome == WriteOutcome::Created));
    for path in &paths {
        assert!(path.is_file(), "{}", path.display());
    }

    let logic = fs::read_to_string(module.join("impl/Svcimpl.go")).unwrap();
    assert!(logic.starts_with("package impl\n\nimport (\n\t\"brick/rpc\"\n\t\"example.com/svc\"\n)\n"));
    assert!(logic.contains(
        "func (s *Service) Ping(ctx *rpc.Context, req *svc.PingReq, rsp *svc.PingRsp) error {"
    ));

    let outputs = generate(&model, &options).unwrap();
    assert!(outputs
        .iter()
        .filter(|output| !output.path.ends_with("Svcdef.go")
            && !output.path.ends_with("Svcerrcode.go")
            && !output.path.ends_with("Svc.Svc.d.ts"))
        .all(|output| output.outcome == WriteOutcome::Unchanged));

    paths.sort();
    expected.sort();
    assert_eq!(paths, expected);
}

#[test]
fn explicit_state_generation_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let model = model(
        "svc.proto",
        &[("svc.proto", "option go_package = 'svc';\nservice Svc {}")],
    );
    let path = dir.path().join("src/svc/impl/Svcstatedb_autogen.go");

    let mut options = GenerateOptions::new(dir.path(), GenerateFlags::STATE_DB);
    options.state.db = "users".to_owned();
    assert_eq!(
        generate(&model, &options).unwrap()[0].outcome,
        WriteOutcome::Created
    );
    assert!(fs::read_to_string(&path)
        .unwrap()
        .ends_with("package impl\n\nconst StateDb = \"$dispatch.mysql.users\"\n"));

    options.state.db = "$dispatch.mysql.orders".to_owned();
    assert_eq!(
        generate(&model, &options).unwrap()[0].outcome,
        WriteOutcome::Overwritten
    );
    assert!(fs::read_to_string(&path).unwrap().contains("\"$dispatch.mysql.orders\""));
}

#[test]
fn methods_are_required_for_stubs() {
    let dir = tempfile::tempdir().unwrap();
    let model = model(
        "svc.proto",
        &[("svc.proto", "option go_package = 'svc';\nservice Svc {}")],
    );

    let options = GenerateOptions::new(
        dir.path(),
        GenerateFlags::CLIENT | GenerateFlags::DEF | GenerateFlags::LOGIC,
    );
    assert!(generate(&model, &options).unwrap().is_empty());
    assert!(!dir.path().join("src/svc/Svcclient.go").exists());
}

#[test]
fn imports_use_package_aliases() {
    let dir = tempfile::tempdir().unwrap();
    let model = model(
        "svc.proto",
        &[
            (
                "svc.proto",
                r#"
                    import "common.proto";
                    option go_package = "svc";
                    service Svc { rpc Get(common.Id) returns (GetRsp) { option(ext.CmdID) = 3; } }
                    message GetRsp {}
                "#,
            ),
            (
                "common.proto",
                "package common;\noption go_package = 'example.com/proto/v2;common';\nmessage Id {}",
            ),
        ],
    );

    let options = GenerateOptions::new(dir.path(), GenerateFlags::CLIENT);
    generate(&model, &options).unwrap();
    let client = fs::read_to_string(dir.path().join("src/svc/Svcclient.go")).unwrap();
    similar_asserts::assert_eq!(
        client,
        r#"package svc

import (
	"brick/rpc"
	common "example.com/proto/v2"
)

var ServiceName = "Svc"

func Get(ctx *rpc.Context, req *common.Id) (*GetRsp, error) {
	rsp := &GetRsp{}
	return rsp, rpc.ClientCall(ctx, ServiceName, GetCMDPath, req, rsp)
}
"#
    );
}

#[test]
fn client_stubs_omit_method_comments() {
    let dir = tempfile::tempdir().unwrap();
    let model = model("svc.proto", &[("svc.proto", SVC)]);
    let path = dir.path().join("Svcclient.go");
    let options = GenerateOptions::new(dir.path(), GenerateFlags::CLIENT);

    assert_eq!(
        go::client(model.root(), &options, &path).unwrap(),
        WriteOutcome::Created
    );
    let client = fs::read_to_string(&path).unwrap();
    assert!(!client.contains("Sends a ping."), "{}", client);
    assert!(client.contains(
        "\nfunc Ping(ctx *rpc.Context, req *PingReq) (*PingRsp, error) {\n\
         \trsp := &PingRsp{}\n"
    ));
}
