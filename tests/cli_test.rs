//! CLI integration tests for the schemawalk binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("schemawalk"))
}

// Helper to create a temp file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const OBJECT_SCHEMA: &str = r#"{
    "type": "object",
    "properties": {
        "a": { "type": "integer" }
    }
}"#;

mod validate_command {
    use super::*;

    #[test]
    fn validate_valid_instance() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", OBJECT_SCHEMA);
        let instance = write_temp_file(&dir, "instance.json", r#"{"a": 5, "b": true}"#);

        cmd()
            .args([
                "validate",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn validate_wrong_type() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", OBJECT_SCHEMA);
        let instance = write_temp_file(&dir, "instance.json", r#"{"a": "x"}"#);

        cmd()
            .args([
                "validate",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Validation failed"))
            .stderr(predicate::str::contains("/a: [type]"));
    }

    #[test]
    fn validate_follows_relative_file_refs() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "item.json", r#"{"type": "string", "maxLength": 3}"#);
        let schema = write_temp_file(
            &dir,
            "list.json",
            r#"{"type": "array", "items": {"$ref": "item.json"}}"#,
        );
        let good = write_temp_file(&dir, "good.json", r#"["ab", "cde"]"#);
        let bad = write_temp_file(&dir, "bad.json", r#"["ab", "cdef"]"#);

        cmd()
            .args([
                "validate",
                good.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .success();

        cmd()
            .args([
                "validate",
                bad.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("/1: [maxLength]"));
    }

    #[test]
    fn validate_against_schema_fragment() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "defs.json",
            r#"{"definitions": {"positive": {"type": "integer", "minimum": 1}}}"#,
        );
        let instance = write_temp_file(&dir, "instance.json", "0");
        let source = format!("{}#/definitions/positive", schema.to_str().unwrap());

        cmd()
            .args(["validate", instance.to_str().unwrap(), "--schema", &source])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("[minimum]"));
    }

    #[test]
    fn validate_json_output_valid() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", OBJECT_SCHEMA);
        let instance = write_temp_file(&dir, "instance.json", r#"{"a": 1}"#);

        cmd()
            .args([
                "validate",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
                "--json",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#"{"valid":true}"#));
    }

    #[test]
    fn validate_json_output_invalid() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", OBJECT_SCHEMA);
        let instance = write_temp_file(&dir, "instance.json", r#"{"a": 1.5}"#);

        cmd()
            .args([
                "validate",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
                "--json",
            ])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains(r#""path":"/a""#))
            .stdout(predicate::str::contains(r#""keyword":"type""#));
    }

    #[test]
    fn validate_json_output_file_error() {
        let dir = TempDir::new().unwrap();
        let instance = write_temp_file(&dir, "instance.json", r#"{}"#);
        let schema = dir.path().join("missing.json");
        fs::write(&schema, "{}").unwrap();
        let schema_path = schema.to_str().unwrap().to_string();
        fs::remove_file(&schema).unwrap();

        cmd()
            .args([
                "validate",
                instance.to_str().unwrap(),
                "--schema",
                &schema_path,
                "--json",
            ])
            .assert()
            .code(3);
    }

    #[test]
    fn validate_dangling_ref_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r##"{"items": {"$ref": "#/definitions/missing"}}"##,
        );
        let instance = write_temp_file(&dir, "instance.json", "[1]");

        cmd()
            .args([
                "validate",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
                "--json",
            ])
            .assert()
            .code(2)
            .stdout(predicate::str::contains("dangling reference"));
    }
}

mod check_command {
    use super::*;

    #[test]
    fn check_valid_schema() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", OBJECT_SCHEMA);

        cmd()
            .args(["check", schema.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("Schema OK"));
    }

    #[test]
    fn check_reports_unknown_keywords_as_warnings() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", r#"{"totallyMadeUp": 1}"#);

        cmd()
            .args(["check", schema.to_str().unwrap()])
            .assert()
            .success()
            .stderr(predicate::str::contains("warning"))
            .stderr(predicate::str::contains("totallyMadeUp"));
    }

    #[test]
    fn check_syntax_error() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r#"{"properties": {"a": {"minimum": "zero"}}}"#,
        );

        cmd()
            .args(["check", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("1 syntax error(s)"))
            .stderr(predicate::str::contains("/properties/a: [minimum]"));
    }

    #[test]
    fn check_invalid_json() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "bad.json", r#"{ not valid json"#);

        cmd()
            .args(["check", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn check_file_not_found() {
        cmd()
            .args(["check", "/nonexistent/schema.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn check_verbose_logs_fetch() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", OBJECT_SCHEMA);

        cmd()
            .args(["-vv", "check", schema.to_str().unwrap()])
            .assert()
            .success()
            .stderr(predicate::str::contains("fetching schema document"));
    }
}

mod lint_command {
    use super::*;

    #[test]
    fn lint_valid_directory() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "a.json", OBJECT_SCHEMA);
        write_temp_file(&dir, "b.json", r#"{"items": {"$ref": "a.json"}}"#);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("2 files checked, all passed"));
    }

    #[test]
    fn lint_reports_errors() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "bad.json", r##"{"items": {"$ref": "#/nowhere"}}"##);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("E003"));
    }

    #[test]
    fn lint_strict_fails_on_warnings() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "schema.json", r#"{"type": "object", "x-note": "hi"}"#);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success();

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--strict"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("W001"));
    }

    #[test]
    fn lint_json_format() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "schema.json", r#"{"minItems": -1}"#);

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--format", "json"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(r#""code": "E002""#))
            .stdout(predicate::str::contains(r#""files_checked": 1"#));
    }

    #[test]
    fn lint_missing_path() {
        cmd()
            .args(["lint", "/nonexistent/dir"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("path not found"));
    }
}

mod required_args {
    use super::*;

    #[test]
    fn missing_schema_flag() {
        let dir = TempDir::new().unwrap();
        let instance = write_temp_file(&dir, "instance.json", "{}");

        cmd()
            .args(["validate", instance.to_str().unwrap()])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--schema"));
    }

    #[test]
    fn missing_instance_for_validate() {
        cmd()
            .args(["validate", "--schema", "schema.json"])
            .assert()
            .failure();
    }
}

mod help_and_version {
    use super::*;

    #[test]
    fn help_flag() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Resolve JSON Schema references"));
    }

    #[test]
    fn version_flag() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("schemawalk"));
    }

    #[test]
    fn validate_help() {
        cmd()
            .args(["validate", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--schema"))
            .stdout(predicate::str::contains("--json"));
    }
}
