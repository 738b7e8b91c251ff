use super::*;

fn build(name: &str, source: &str) -> (ProtoFile, SymbolTable) {
    let file = File::from_source(name, source).unwrap();
    let mut symbols = SymbolTable::new();
    let proto = build_file(&file, &mut symbols);
    (proto, symbols)
}

#[test]
fn service_and_options() {
    let (file, _) = build(
        "proto/svc.proto",
        r#"
            syntax = "proto3";
            package svc;
            option go_package = "example.com/svc";

            service Svc {
                // Checks liveness.
                rpc Ping(PingReq) returns (PingRsp) {
                    option(ext.CmdID) = 1;
                    option(ext.Url) = "/svc/ping";
                    option(ext.Flags) = 3;
                }
                rpc Draft(DraftReq) returns (DraftRsp);
            }

            message PingReq {}
            message PingRsp {}
            message DraftReq {}
            message DraftRsp {}
        "#,
    );

    assert_eq!(file.name(), "proto/svc.proto");
    assert_eq!(file.module(), "svc");
    assert_eq!(file.package(), "svc");
    assert_eq!(file.service(), "Svc");
    assert_eq!(file.go_package(), "example.com/svc");
    assert_eq!(file.go_package_name(), "svc");

    assert_eq!(
        file.methods(),
        &[
            RpcMethod {
                name: "Ping".to_owned(),
                request: "PingReq".to_owned(),
                response: "PingRsp".to_owned(),
                cmd_id: 1,
                url: "/svc/ping".to_owned(),
                flags: 3,
                comment_lines: vec![" Checks liveness.".to_owned()],
            },
            RpcMethod {
                name: "Draft".to_owned(),
                request: "DraftReq".to_owned(),
                response: "DraftRsp".to_owned(),
                ..Default::default()
            },
        ]
    );
}

#[test]
fn service_falls_back_to_package() {
    let (file, _) = build("types.proto", "package types;\nmessage Item {}");

    assert_eq!(file.service(), "types");
    assert!(file.methods().is_empty());
    assert_eq!(file.go_package(), "");
}

#[test]
fn messages_are_pre_order() {
    let (file, symbols) = build(
        "nest.proto",
        r#"
            message Outer {
                message Inner {
                    message Deepest {}
                }
                Inner inner = 1;
            }
            message Sibling {}
        "#,
    );

    let names: Vec<_> = file
        .messages()
        .iter()
        .map(|&id| symbols.message(id).name())
        .collect();
    assert_eq!(names, ["Outer", "Inner", "Deepest", "Sibling"]);

    let outer = file.messages()[0];
    let inner = file.messages()[1];
    let deepest = file.messages()[2];
    assert_eq!(symbols.message(outer).parent(), None);
    assert_eq!(symbols.message(inner).parent(), Some(outer));
    assert_eq!(symbols.message(deepest).parent(), Some(inner));
    assert_eq!(symbols.message(outer).nested(), &[inner]);
    assert_eq!(symbols.get("nest_Inner"), Some(inner));
}

#[test]
fn fields() {
    let (file, symbols) = build(
        "fields.proto",
        r#"
            message Item {
                // The identifier.
                int64 id = 1; // trailing
                repeated string tags = 2;
                map<string, Item> children = 3;
                other.Thing thing = 4;
                sint32 small = 5;
            }
        "#,
    );

    let item = symbols.message(file.messages()[0]);
    assert_eq!(item.nested(), &[]);
    assert_eq!(
        item.fields(),
        &[
            Field::Normal {
                name: "id".to_owned(),
                ty: "int64".to_owned(),
                repeated: false,
                comments: Comments {
                    leading: vec![" The identifier.".to_owned()],
                    trailing: Some(" trailing".to_owned()),
                },
                message: None,
            },
            Field::Normal {
                name: "tags".to_owned(),
                ty: "string".to_owned(),
                repeated: true,
                comments: Comments::default(),
                message: None,
            },
            Field::Map {
                name: "children".to_owned(),
                key_ty: "string".to_owned(),
                value_ty: "Item".to_owned(),
                comments: Comments::default(),
                message: None,
            },
            Field::Normal {
                name: "thing".to_owned(),
                ty: "other.Thing".to_owned(),
                repeated: false,
                comments: Comments::default(),
                message: None,
            },
            Field::Normal {
                name: "small".to_owned(),
                ty: "sint32".to_owned(),
                repeated: false,
                comments: Comments::default(),
                message: None,
            },
        ]
    );
}

#[test]
fn enums_and_err_codes() {
    let (file, symbols) = build(
        "codes.proto",
        r#"
            enum ErrCode {
                Success = 0;
                // Login failed.
                ErrPasswordWrong = 1001;
            }
            message Order {
                enum State {
                    Open = 0;
                    Closed = 1;
                }
            }
            enum Color { Red = 0; }
        "#,
    );

    assert_eq!(file.err_codes().len(), 1);
    assert_eq!(file.err_codes()[0].name, "ErrCode");
    assert_eq!(
        file.err_codes()[0].values[1],
        EnumValue {
            name: "ErrPasswordWrong".to_owned(),
            number: 1001,
            comments: Comments {
                leading: vec![" Login failed.".to_owned()],
                trailing: None,
            },
        }
    );

    let names: Vec<_> = file
        .enums()
        .iter()
        .map(|&id| symbols.enum_(id).name())
        .collect();
    assert_eq!(names, ["State", "ErrCode", "Color"]);

    let order = file.messages()[0];
    let state = symbols.message(order).enums()[0];
    assert_eq!(symbols.enum_(state).parent(), Some(order));
    assert!(symbols.get_enum("codes_Color").is_some());
}

#[test]
fn duplicate_names_are_counted() {
    let file = File::from_source("a.proto", "message Item {}").unwrap();
    let mut symbols = SymbolTable::new();
    build_file(&file, &mut symbols);

    let other = File::from_source(
        "a.proto",
        "message Item {}\nmessage Wrapper { message Item {} }",
    )
    .unwrap();
    build_file(&other, &mut symbols);

    let ids = symbols.get_all("a_Item");
    assert_eq!(ids.len(), 3);
    for &id in ids {
        assert_eq!(symbols.message(id).dup_count(), 2);
    }
    assert_eq!(symbols.get("a_Item"), None);
    assert!(symbols.get("a_Wrapper").is_some());
}
