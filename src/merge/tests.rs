use std::fs;

use super::*;

fn function(name: &str) -> GoFunction {
    GoFunction {
        name: name.to_owned(),
        source: format!("\nfunc {}() error {{\n\treturn nil\n}}\n", name),
    }
}

fn names(source: &str) -> Vec<String> {
    declared_functions(Path::new("test.go"), source)
        .unwrap()
        .into_iter()
        .collect()
}

#[test]
fn top_level_functions() {
    let source = r#"
package svc

import "brick/rpc"

// Ping does things. func NotThis()
func Ping(ctx *rpc.Context, req *PingReq) (*PingRsp, error) {
	f := func() {}
	s := "func Fake() {"
	r := `
func AlsoFake() {`
	return nil, nil
}

func (s *Service) Pong(ctx *rpc.Context) error {
	/* } */
	return nil
}

func (Service) Peek() {}

var handler = func() {}
"#;

    assert_eq!(names(source), ["Peek", "Ping", "Pong"]);
}

#[test]
fn generic_receiver() {
    assert_eq!(
        names("func (s *Set[T]) Insert(value T) {}\nfunc Map[T any](x T) T { return x }"),
        ["Insert", "Map"]
    );
}

#[test]
fn malformed() {
    for source in [
        "func Ping() {",
        "func Ping() }",
        "func Ping() { s := \"unterminated }",
        "/* func Ping() {}",
    ] {
        let err = declared_functions(Path::new("bad.go"), source).unwrap_err();
        assert!(
            err.to_string().starts_with("failed to parse existing file 'bad.go'"),
            "{}",
            err
        );
    }
}

#[test]
fn import_filtering() {
    let imports = [
        "brick/rpc",
        "example.com/common",
        "example.com/svc",
        "pb \"example.com/proto/v2\"",
    ];
    let body = "func Ping(ctx *rpc.Context, req *svc.PingReq) (*pb.Rsp, error)";

    assert_eq!(
        join_imports(&imports, body),
        "\t\"brick/rpc\"\n\t\"example.com/svc\"\n\tpb \"example.com/proto/v2\""
    );
    assert_eq!(join_imports(&imports, "func Nothing() {}"), "");
}

#[test]
fn create_then_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("svcclient.go");
    let header = |body: &str| format!("package svc\n\nimport (\n{}\n)\n", join_imports(&["errors"], body));

    let outcome = write_incremental(&path, header, &[function("Ping")]).unwrap();
    assert_eq!(outcome, WriteOutcome::Created);
    let created = fs::read_to_string(&path).unwrap();
    assert_eq!(
        created,
        "package svc\n\nimport (\n\n)\n\nfunc Ping() error {\n\treturn nil\n}\n"
    );

    let outcome = write_incremental(&path, header, &[function("Ping")]).unwrap();
    assert_eq!(outcome, WriteOutcome::Unchanged);
    assert_eq!(fs::read_to_string(&path).unwrap(), created);

    let edited = created.replace("return nil", "return errors.New(\"edited\")");
    fs::write(&path, &edited).unwrap();

    let outcome =
        write_incremental(&path, header, &[function("Ping"), function("Pong")]).unwrap();
    assert_eq!(outcome, WriteOutcome::Appended(1));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        format!("{}\nfunc Pong() error {{\n\treturn nil\n}}\n", edited)
    );
}

#[test]
fn append_to_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.go");
    fs::write(&path, "package svc\n\nfunc Ping() {\n").unwrap();

    let err = write_incremental(&path, |_| String::new(), &[function("Pong")]).unwrap_err();
    assert!(err.to_string().contains("broken.go"));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "package svc\n\nfunc Ping() {\n"
    );
}

#[test]
fn write_if_absent_keeps_existing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("svc.toml");

    assert_eq!(write_if_absent(&path, "a").unwrap(), WriteOutcome::Created);
    assert_eq!(write_if_absent(&path, "b").unwrap(), WriteOutcome::Unchanged);
    assert_eq!(fs::read_to_string(&path).unwrap(), "a");
    assert_eq!(overwrite(&path, "c").unwrap(), WriteOutcome::Overwritten);
    assert_eq!(fs::read_to_string(&path).unwrap(), "c");
}
