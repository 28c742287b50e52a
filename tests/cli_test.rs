//! CLI integration tests for schema-form binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const FIXTURES: &str = "tests/fixtures";

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("schema-form"))
}

// Helper to create a temp file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod normalize_command {
    use super::*;

    #[test]
    fn normalize_by_name() {
        cmd()
            .args(["normalize", "vitals", "--schema-dir", FIXTURES])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""id":"vitals-form""#))
            .stdout(predicate::str::contains(r#""fieldDefinitions":{"weight""#))
            .stderr(predicate::str::contains("warning[W101]"))
            .stderr(predicate::str::contains("warning[W102]"))
            .stderr(predicate::str::contains("warning[W103]"));
    }

    #[test]
    fn normalize_by_path() {
        cmd()
            .args(["normalize", "tests/fixtures/contact.json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""sectionTemplates":{"s1""#));
    }

    #[test]
    fn normalize_with_pretty() {
        cmd()
            .args(["normalize", "contact", "--schema-dir", FIXTURES, "--pretty"])
            .assert()
            .success()
            // Pretty output has newlines and indentation
            .stdout(predicate::str::contains("{\n"));
    }

    #[test]
    fn normalize_with_output_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("processed.json");

        cmd()
            .args([
                "normalize",
                "contact",
                "--schema-dir",
                FIXTURES,
                "--output",
                output.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["formTemplate"]["id"], "contact");
        assert!(written["fieldDefinitions"]["f1"].is_object());
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn untouched_required_field_fails() {
        cmd()
            .args(["validate", "contact", "--schema-dir", FIXTURES])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Validation failed"))
            .stderr(predicate::str::contains("s1.f1: Name is required"));
    }

    #[test]
    fn values_file_satisfies_rules() {
        let dir = TempDir::new().unwrap();
        let values = write_temp_file(&dir, "values.json", r#"{ "s1.f1": "Ada Lovelace" }"#);

        cmd()
            .args([
                "validate",
                "contact",
                "--schema-dir",
                FIXTURES,
                "--values",
                values.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn defaults_are_validated() {
        // The seeded default of 70 kg is within range
        cmd()
            .args(["validate", "vitals", "--schema-dir", FIXTURES])
            .assert()
            .success();
    }

    #[test]
    fn range_violation_in_repeatable_group() {
        let dir = TempDir::new().unwrap();
        let values = write_temp_file(
            &dir,
            "values.json",
            r#"{ "vitals.measurements[0].weight": 900 }"#,
        );

        cmd()
            .args([
                "validate",
                "vitals",
                "--schema-dir",
                FIXTURES,
                "--values",
                values.to_str().unwrap(),
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains(
                "vitals.measurements[0].weight: Weight must be between 20 and 300 kg",
            ));
    }

    #[test]
    fn json_output_invalid() {
        cmd()
            .args(["validate", "contact", "--schema-dir", FIXTURES, "--json"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains(r#""s1.f1":["Name is required"]"#));
    }

    #[test]
    fn json_output_valid() {
        let dir = TempDir::new().unwrap();
        let values = write_temp_file(&dir, "values.json", r#"{ "s1.f1": "Ada" }"#);

        cmd()
            .args([
                "validate",
                "contact",
                "--schema-dir",
                FIXTURES,
                "--values",
                values.to_str().unwrap(),
                "--json",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""valid":true"#))
            .stdout(predicate::str::contains(r#""s1.f1":"Ada""#));
    }

    #[test]
    fn values_must_be_an_object() {
        let dir = TempDir::new().unwrap();
        let values = write_temp_file(&dir, "values.json", r#"["s1.f1"]"#);

        cmd()
            .args([
                "validate",
                "contact",
                "--schema-dir",
                FIXTURES,
                "--values",
                values.to_str().unwrap(),
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("JSON object"));
    }
}

mod outline_command {
    use super::*;

    #[test]
    fn shows_placeholders_for_dangling_references() {
        cmd()
            .args(["outline", "vitals", "--schema-dir", FIXTURES])
            .assert()
            .success()
            .stdout(predicate::str::contains("Vitals (vitals-form)"))
            .stdout(predicate::str::contains(
                "[group] Measurements (instance 1, min 1, max 3)",
            ))
            .stdout(predicate::str::contains(
                "Weight <decimal> vitals.measurements[0].weight = 70",
            ))
            .stdout(predicate::str::contains("field group not found: bloodPressure"))
            .stdout(predicate::str::contains("field not found: pulse"))
            .stdout(predicate::str::contains("section not found: history"))
            .stdout(predicate::str::contains("1 visible fields, 3 not found"));
    }

    #[test]
    fn display_rules_hide_fields() {
        let dir = TempDir::new().unwrap();
        let values = write_temp_file(&dir, "values.json", r#"{ "vitals.pulse": "not taken" }"#);

        cmd()
            .args([
                "outline",
                "vitals",
                "--schema-dir",
                FIXTURES,
                "--values",
                values.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("[group] Measurements"))
            .stdout(predicate::str::contains("Weight").not())
            .stdout(predicate::str::contains("0 visible fields, 3 not found"));
    }

    #[test]
    fn values_outside_the_form_are_ignored() {
        let dir = TempDir::new().unwrap();
        let values = write_temp_file(
            &dir,
            "values.json",
            r#"{ "s1.f1": "Ada", "s1.nickname": "Countess" }"#,
        );

        cmd()
            .args([
                "validate",
                "contact",
                "--schema-dir",
                FIXTURES,
                "--values",
                values.to_str().unwrap(),
                "--json",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""s1.f1":"Ada""#))
            .stdout(predicate::str::contains("nickname").not())
            .stderr(predicate::str::contains("does not address"));
    }

    #[test]
    fn json_outline() {
        cmd()
            .args(["outline", "contact", "--schema-dir", FIXTURES, "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""kind": "section""#))
            .stdout(predicate::str::contains(r#""path": "s1.f1""#));
    }
}

mod lint_command {
    use super::*;

    #[test]
    fn fixtures_pass_with_warnings() {
        cmd()
            .args(["lint", FIXTURES])
            .assert()
            .success()
            .stdout(predicate::str::contains("W102"))
            .stdout(predicate::str::contains("2 files checked"));
    }

    #[test]
    fn strict_fails_on_warnings() {
        cmd()
            .args(["lint", FIXTURES, "--strict"])
            .assert()
            .code(1);
    }

    #[test]
    fn syntax_error_fails() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "broken.json", "{ not json }");

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("E001"));
    }

    #[test]
    fn json_format() {
        cmd()
            .args(["lint", "tests/fixtures/contact.json", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""files_checked": 1"#))
            .stdout(predicate::str::contains(r#""status": "ok""#));
    }

    #[test]
    fn missing_path() {
        cmd()
            .args(["lint", "does/not/exist"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("path not found"));
    }
}

mod error_handling {
    use super::*;

    #[test]
    fn unknown_schema_name() {
        cmd()
            .args(["normalize", "nope", "--schema-dir", FIXTURES])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn invalid_json_schema() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "bad.json", "{ not json }");

        cmd()
            .args(["normalize", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn missing_form_template() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "empty.json", r#"{ "schemaVersion": "1.0" }"#);

        cmd()
            .args(["validate", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("missing FormTemplate"));
    }

    #[test]
    fn missing_form_id() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "anon.json", r#"{ "FormTemplate": { "sections": [] } }"#);

        cmd()
            .args(["outline", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("FormTemplate has no id"));
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
            .stdout(predicate::str::contains("normalize"))
            .stdout(predicate::str::contains("lint"));
    }

    #[test]
    fn version_flag() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("schema-form"));
    }

    #[test]
    fn missing_schema_argument() {
        cmd().arg("validate").assert().failure();
    }
}
