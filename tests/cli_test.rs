//! CLI integration tests for the oas-merge binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("oas-merge"))
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod merge_command {
    use super::*;

    #[test]
    fn basic_merge() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "ops.yaml", "get:\n  summary: s\n");
        let spec = write_file(
            &dir,
            "openapi.yaml",
            "paths:\n  /x:\n    $ref: \"./ops.yaml#/get\"\n",
        );

        cmd()
            .args(["merge", spec.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("#/components/schemas/get"))
            .stdout(predicate::str::contains(r#""summary":"s""#));
    }

    #[test]
    fn merge_with_pretty() {
        let dir = TempDir::new().unwrap();
        let spec = write_file(&dir, "openapi.yaml", "info:\n  title: Pets\n");

        cmd()
            .args(["merge", spec.to_str().unwrap(), "--pretty"])
            .assert()
            .success()
            // Pretty output has newlines and indentation
            .stdout(predicate::str::contains("{\n"));
    }

    #[test]
    fn merge_with_yaml_format() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "ops.yaml", "get:\n  summary: s\n");
        let spec = write_file(
            &dir,
            "openapi.yaml",
            "paths:\n  /x:\n    $ref: \"./ops.yaml#/get\"\n",
        );

        cmd()
            .args(["merge", spec.to_str().unwrap(), "--format", "yaml"])
            .assert()
            .success()
            .stdout(predicate::str::contains("components:"))
            .stdout(predicate::str::contains("summary: s"));
    }

    #[test]
    fn merge_with_output_file() {
        let dir = TempDir::new().unwrap();
        let spec = write_file(&dir, "openapi.yaml", "info:\n  title: Pets\n");
        let output = dir.path().join("flat.json");

        cmd()
            .args([
                "merge",
                spec.to_str().unwrap(),
                "--output",
                output.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.contains(r#""title":"Pets""#));
    }

    #[test]
    fn merge_with_config_file() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "params.yaml", "petLimit:\n  in: query\n");
        write_file(
            &dir,
            "settings.yaml",
            "classes:\n  parameters:\n    prefix: \"p_\"\n",
        );
        let spec = write_file(
            &dir,
            "openapi.yaml",
            "parameters:\n  $include.parameters: \"./params.yaml\"\n",
        );

        cmd()
            .args([
                "merge",
                spec.to_str().unwrap(),
                "--config",
                dir.path().join("settings.yaml").to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("p_petLimit"));
    }

    #[test]
    fn missing_spec_exits_with_io_code() {
        cmd()
            .args(["merge", "/nonexistent/openapi.yaml"])
            .assert()
            .failure()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn missing_ref_target_exits_with_io_code() {
        let dir = TempDir::new().unwrap();
        let spec = write_file(
            &dir,
            "openapi.yaml",
            "schema:\n  $ref: \"./missing.yaml#/Pet\"\n",
        );

        cmd()
            .args(["merge", spec.to_str().unwrap()])
            .assert()
            .failure()
            .code(3);
    }

    #[test]
    fn sequence_conflict_exits_with_structure_code() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "tags.yaml", "- name: a\n");
        let spec = write_file(
            &dir,
            "openapi.yaml",
            "tags:\n  $include: \"./tags.yaml\"\n  extra: 1\n",
        );

        cmd()
            .args(["merge", spec.to_str().unwrap()])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("sequence"));
    }
}

mod components_command {
    use super::*;

    #[test]
    fn lists_discovered_components() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "pet.yaml", "Pet:\n  type: object\n");
        let spec = write_file(
            &dir,
            "openapi.yaml",
            "schema:\n  $ref: \"./pet.yaml#/Pet\"\n",
        );

        cmd()
            .args(["components", spec.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("schemas/Pet"));
    }

    #[test]
    fn json_output() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "pet.yaml", "Pet:\n  type: object\n");
        let spec = write_file(
            &dir,
            "openapi.yaml",
            "schema:\n  $ref: \"./pet.yaml#/Pet\"\n",
        );

        cmd()
            .args(["components", spec.to_str().unwrap(), "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""class": "schemas""#))
            .stdout(predicate::str::contains(r#""name": "Pet""#));
    }

    #[test]
    fn no_components_message() {
        let dir = TempDir::new().unwrap();
        let spec = write_file(&dir, "openapi.yaml", "info:\n  title: Pets\n");

        cmd()
            .args(["components", spec.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("No shared components."));
    }
}
