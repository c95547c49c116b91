//! Schema linting - static analysis of schema files.
//!
//! Checks schema files for:
//! - JSON syntax errors (E001)
//! - Schema syntax errors (E002) and unknown keywords (W001)
//! - `$ref`s into the same document that address nothing (E003)
//! - `$ref` values that are not valid URI references (E004)

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::loader::load_json;
use crate::reference::JsonRef;
use crate::syntax::{SyntaxMessageKind, SyntaxRegistry};
use crate::types::escape_token;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/properties/id/$ref")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
/// Returns aggregated results for all files.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_schema_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        let file_errors = file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        let file_warnings = file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();

        total_errors += file_errors;
        total_warnings += file_warnings;
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single schema file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();
    let display_file = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();

    let schema = match load_json(file) {
        Ok(s) => s,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E001".to_string(),
                file: file.to_path_buf(),
                path: "/".to_string(),
                message: format!("syntax error: {}", e),
            });
            return FileResult {
                file: display_file,
                status: FileStatus::Error,
                diagnostics,
            };
        }
    };

    for message in SyntaxRegistry::default().check(&schema) {
        let (severity, code) = if message.kind == SyntaxMessageKind::UnknownKeyword {
            (Severity::Warning, "W001")
        } else {
            (Severity::Error, "E002")
        };
        let path = match &message.keyword {
            Some(keyword) => format!("{}/{}", message.pointer, escape_token(keyword)),
            None if message.pointer.is_empty() => "/".to_string(),
            None => message.pointer.clone(),
        };
        diagnostics.push(Diagnostic {
            severity,
            code: code.to_string(),
            file: file.to_path_buf(),
            path,
            message: message.message,
        });
    }

    check_refs(&schema, file, "", &schema, &mut diagnostics);

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: display_file,
        status,
        diagnostics,
    }
}

/// Recursively check $ref values in a schema.
fn check_refs(
    value: &Value,
    file: &Path,
    path: &str,
    root: &Value,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_val)) = map.get("$ref") {
                check_single_ref(ref_val, file, path, root, diagnostics);
            }

            for (key, val) in map {
                // Instance data, not schemas
                if key == "enum" || key == "default" {
                    continue;
                }
                let child_path = format!("{}/{}", path, escape_token(key));
                check_refs(val, file, &child_path, root, diagnostics);
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                let child_path = format!("{}/{}", path, i);
                check_refs(item, file, &child_path, root, diagnostics);
            }
        }
        _ => {}
    }
}

/// Check a single $ref value.
fn check_single_ref(
    ref_val: &str,
    file: &Path,
    path: &str,
    root: &Value,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let ref_path = format!("{}/$ref", path);

    let reference = match JsonRef::from_string(ref_val) {
        Ok(r) => r,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E004".to_string(),
                file: file.to_path_buf(),
                path: ref_path,
                message: e.to_string(),
            });
            return;
        }
    };

    // Other documents are only known at validation time
    if !reference.locator().is_empty() {
        return;
    }

    if reference.fragment().resolve(root).is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            code: "E003".to_string(),
            file: file.to_path_buf(),
            path: ref_path,
            message: format!("reference does not resolve: {}", ref_val),
        });
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_schema_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn lint_str(content: &str) -> FileResult {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        lint_file(file.path(), file.path().parent().unwrap())
    }

    #[test]
    fn lint_valid_schema() {
        let result = lint_str(
            r##"{
            "id": "http://example.com/test.json",
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "next": { "$ref": "#" },
                "tag": { "$ref": "#/definitions/tag" }
            },
            "definitions": { "tag": { "enum": [{"$ref": "#/nowhere"}] } }
        }"##,
        );
        assert_eq!(result.status, FileStatus::Ok, "{:?}", result.diagnostics);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn lint_invalid_json_syntax() {
        let result = lint_str("{ not valid json }");
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, "E001");
    }

    #[test]
    fn lint_schema_syntax_error() {
        let result = lint_str(r#"{ "properties": { "a": { "minLength": "two" } } }"#);
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, "E002");
        assert_eq!(result.diagnostics[0].path, "/properties/a/minLength");
    }

    #[test]
    fn lint_unknown_keyword_warning() {
        let result = lint_str(r#"{ "type": "object", "x-vendor": true }"#);
        assert_eq!(result.status, FileStatus::Warning);
        assert_eq!(result.diagnostics[0].code, "W001");
        assert_eq!(result.diagnostics[0].path, "/x-vendor");
    }

    #[test]
    fn lint_broken_internal_ref() {
        let result = lint_str(
            r##"{
            "type": "object",
            "properties": {
                "data": { "$ref": "#/definitions/missing" }
            }
        }"##,
        );
        assert_eq!(result.status, FileStatus::Error);
        let diag = result.diagnostics.iter().find(|d| d.code == "E003").unwrap();
        assert_eq!(diag.path, "/properties/data/$ref");
    }

    #[test]
    fn lint_invalid_reference_text() {
        let result = lint_str(r#"{ "items": { "$ref": "not a uri" } }"#);
        assert_eq!(result.status, FileStatus::Error);
        assert!(result.diagnostics.iter().any(|d| d.code == "E004"));
    }

    #[test]
    fn lint_skips_external_refs() {
        let result = lint_str(r#"{ "items": { "$ref": "other.json#/definitions/x" } }"#);
        assert_eq!(result.status, FileStatus::Ok);
    }

    #[test]
    fn lint_directory() {
        let dir = tempdir().unwrap();

        let valid_path = dir.path().join("valid.json");
        std::fs::write(&valid_path, r#"{"type": "object"}"#).unwrap();

        let invalid_path = dir.path().join("invalid.json");
        std::fs::write(&invalid_path, "{ not json }").unwrap();

        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let result = lint(dir.path(), false);
        assert_eq!(result.files_checked, 2);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 1);
        assert!(!result.is_ok());
    }

    #[test]
    fn lint_strict_mode() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.json");
        // Warning only (unknown keyword)
        std::fs::write(&file_path, r#"{"type": "object", "bogus": 1}"#).unwrap();

        let result = lint(&file_path, false);
        assert_eq!(result.files_checked, 1);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 0);
        assert_eq!(result.warnings, 1);

        let result = lint(&file_path, true);
        assert_eq!(result.passed, 0);
        assert_eq!(result.failed, 1);
    }
}
