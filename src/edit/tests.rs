use std::fs;

use super::*;

const SVC: &str = r#"syntax = "proto3";

package svc;

service Svc {
	rpc Ping (PingReq) returns (PingRsp) {
		option(ext.CmdID) = 7;
	};
}

message PingReq {
}

message PingRsp {
	string msg = 1;
}
"#;

#[test]
fn inserts_method_and_messages() {
    let (content, outcome) = add_rpc_to_source("svc.proto", SVC, "Pong", &[]).unwrap();

    assert_eq!(
        outcome,
        AddRpcOutcome {
            cmd_id: 8,
            inserted_method: true,
            appended: vec!["PongReq".to_owned(), "PongRsp".to_owned()],
        }
    );
    similar_asserts::assert_eq!(
        content,
        r#"syntax = "proto3";

package svc;

service Svc {
	rpc Ping (PingReq) returns (PingRsp) {
		option(ext.CmdID) = 7;
	};

	// @desc:
	// @error:
	rpc Pong (PongReq) returns (PongRsp) {
		option(ext.CmdID) = 8;
	};
}

message PingReq {
}

message PingRsp {
	string msg = 1;
}

message PongReq {
}

message PongRsp {
}
"#
    );

    let file = File::from_source("svc.proto", &content).unwrap();
    let proto = build_file(&file, &mut SymbolTable::new());
    assert_eq!(proto.method("Pong").unwrap().cmd_id, 8);
}

#[test]
fn existing_declarations_are_kept() {
    let (content, outcome) = add_rpc_to_source("svc.proto", SVC, "Ping", &[]).unwrap();
    assert_eq!(content, SVC);
    assert_eq!(
        outcome,
        AddRpcOutcome {
            cmd_id: 7,
            inserted_method: false,
            appended: vec![],
        }
    );
}

#[test]
fn list_option_enum() {
    let options = vec!["name".to_owned(), "age".to_owned()];
    let (content, outcome) = add_rpc_to_source("svc.proto", SVC, "List", &options).unwrap();

    assert_eq!(
        outcome.appended,
        ["ListListOption", "ListReq", "ListRsp"]
    );
    assert!(content.contains(
        "\nenum ListListOption {\n\tListListOptionNil = 0;\n\tListListOptionName = 1;\n\tListListOptionAge = 2;\n}\n"
    ));

    let (again, outcome) = add_rpc_to_source("svc.proto", &content, "List", &options).unwrap();
    assert_eq!(again, content);
    assert!(outcome.appended.is_empty());
}

#[test]
fn empty_service() {
    let (content, outcome) =
        add_rpc_to_source("a.proto", "service A {}\nmessage FooReq {}\n", "Foo", &[]).unwrap();
    assert_eq!(outcome.cmd_id, 1);
    assert_eq!(outcome.appended, ["FooRsp"]);
    assert!(content.starts_with("service A {\n\n\t// @desc:"));
}

#[test]
fn service_not_found() {
    let err = add_rpc_to_source("a.proto", "message A {}", "Foo", &[]).unwrap_err();
    assert_eq!(err.to_string(), "no service declared in 'a.proto'");
}

#[test]
fn invalid_names_leave_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("svc.proto");
    fs::write(&path, SVC).unwrap();

    for name in ["Get-User", "GetUserReq", "GetUserRsp", ""] {
        let err = add_rpc(&path, name, &[]).unwrap_err();
        assert!(err.is_invalid_input(), "{}", name);
    }
    assert_eq!(fs::read_to_string(&path).unwrap(), SVC);

    add_rpc(&path, "GetUser", &[]).unwrap();
    assert!(fs::read_to_string(&path).unwrap().contains("rpc GetUser (GetUserReq)"));
}
