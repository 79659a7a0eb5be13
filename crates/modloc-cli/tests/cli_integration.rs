use std::fs;
use std::path::Path;

use assert_cmd::prelude::*;
use predicates::prelude::*;

mod helpers;
use helpers::*;

fn import(cwd: &Path, extra: &[&str]) -> serde_json::Value {
    let out = bin_cmd(cwd)
        .args(["import", "Mod", "--game-dir", "game", "--output-dir", "out"])
        .args(extra)
        .args(["--format", "json"])
        .assert()
        .success()
        .get_output()
        .clone();
    stdout_json(&out)
}

#[test]
fn help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    bin_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("import")
                .and(predicate::str::contains("export"))
                .and(predicate::str::contains("baseline"))
                .and(predicate::str::contains("merge"))
                .and(predicate::str::contains("compile")),
        );
}

#[test]
fn import_writes_catalog_and_language_files() {
    let dir = tempfile::tempdir().unwrap();
    game_fixture(dir.path());

    let v = import(dir.path(), &["--language-code", "JP", "--language-id", "日本語"]);
    assert_eq!(v["module"], "Mod");
    assert_eq!(v["dry_run"], false);
    assert_eq!(v["scan"]["files_scanned"], 1);
    assert_eq!(v["normalize"]["auto_assigned"], 1);
    assert_eq!(v["reconcile"]["matched_by_id"], 1);

    let out = dir.path().join("out");
    let po = fs::read_to_string(out.join("Mod.po")).unwrap();
    assert!(po.contains(r#"msgstr "剣""#));
    assert!(out.join("Mod.csv").is_file());
    assert!(out
        .join("Mod/ModuleData/Languages/JP/language_data.xml")
        .is_file());
    let items = fs::read_to_string(out.join("Mod/ModuleData/items.xml")).unwrap();
    assert!(items.contains(r#"name="{=Mod"#));
}

#[test]
fn import_text_output_reports_progress() {
    let dir = tempfile::tempdir().unwrap();
    game_fixture(dir.path());
    bin_cmd(dir.path())
        .args(["import", "Mod", "--game-dir", "game", "--output-dir", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("import of Mod done"));
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    game_fixture(dir.path());

    let v = import(dir.path(), &["--dry-run"]);
    assert_eq!(v["dry_run"], true);
    assert!(!v["outputs"].as_array().unwrap().is_empty());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn unknown_module_fails() {
    let dir = tempfile::tempdir().unwrap();
    game_fixture(dir.path());
    bin_cmd(dir.path())
        .args(["import", "Nope", "--game-dir", "game"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn bad_merge_mode_is_rejected_by_the_parser() {
    let dir = tempfile::tempdir().unwrap();
    bin_cmd(dir.path())
        .args(["import", "Mod", "--merge-mode", "sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("merge mode"));
}

#[test]
fn config_in_working_dir_supplies_paths_and_language() {
    let dir = tempfile::tempdir().unwrap();
    game_fixture(dir.path());
    write(
        dir.path(),
        "modloc.toml",
        "[paths]\ngame_dir = \"game\"\noutput_dir = \"build\"\n\n[language]\ncode = \"JP\"\n",
    );

    bin_cmd(dir.path())
        .args(["import", "Mod", "--quiet"])
        .assert()
        .success();
    assert!(dir
        .path()
        .join("build/Mod/Mod/ModuleData/Languages/JP/language_data.xml")
        .is_file());
}

#[test]
fn export_rebuilds_language_files_from_catalog() {
    let dir = tempfile::tempdir().unwrap();
    game_fixture(dir.path());
    import(dir.path(), &["--language-code", "JP"]);
    let languages = dir.path().join("out/Mod/ModuleData/Languages/JP");
    fs::remove_dir_all(&languages).unwrap();

    let out = bin_cmd(dir.path())
        .args(["export", "Mod", "--output-dir", "out", "--language-code", "JP"])
        .args(["--format", "json"])
        .assert()
        .success()
        .get_output()
        .clone();
    let v = stdout_json(&out);
    assert_eq!(v["entries"], 2);
    let outputs = v["outputs"].as_array().unwrap();
    assert!(!outputs.is_empty());
    for o in outputs {
        assert!(dir.path().join(o["path"].as_str().unwrap()).is_file());
    }
    assert!(languages.join("language_data.xml").is_file());
}

#[test]
fn export_without_catalog_fails() {
    let dir = tempfile::tempdir().unwrap();
    bin_cmd(dir.path())
        .args(["export", "Mod", "--output-dir", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("catalog not found"));
}

#[test]
fn merge_skips_blank_entries() {
    let dir = tempfile::tempdir().unwrap();
    game_fixture(dir.path());
    import(dir.path(), &["--language-code", "JP"]);

    let out = bin_cmd(dir.path())
        .args(["merge", "out", "--output", "merged.po", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .clone();
    let v = stdout_json(&out);
    assert_eq!(v["entries"], 1);
    assert_eq!(v["skipped_blank"], 1);
    let merged = fs::read_to_string(dir.path().join("merged.po")).unwrap();
    assert!(merged.contains("剣"));
}

#[test]
fn compile_writes_mo_next_to_po() {
    let dir = tempfile::tempdir().unwrap();
    game_fixture(dir.path());
    import(dir.path(), &["--language-code", "JP"]);

    let out = bin_cmd(dir.path())
        .args(["compile", "out/Mod.po", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .clone();
    let v = stdout_json(&out);
    assert_eq!(v["entries"], 2);
    assert!(dir.path().join("out/Mod.mo").is_file());
}

#[test]
fn baseline_from_game_modules() {
    let dir = tempfile::tempdir().unwrap();
    game_fixture(dir.path());

    let out = bin_cmd(dir.path())
        .args(["baseline", "--game-dir", "game", "--output", "base.csv"])
        .args(["--format", "json"])
        .assert()
        .success()
        .get_output()
        .clone();
    let v = stdout_json(&out);
    assert!(v["ids"].as_u64().unwrap() >= 1);
    let csv = fs::read_to_string(dir.path().join("base.csv")).unwrap();
    assert!(csv.contains("sword_1"));
}

#[test]
fn baseline_needs_a_source() {
    let dir = tempfile::tempdir().unwrap();
    bin_cmd(dir.path())
        .arg("baseline")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--game-dir"));
}

#[test]
fn schema_dumps_every_summary() {
    let dir = tempfile::tempdir().unwrap();
    bin_cmd(dir.path())
        .args(["schema", "--out-dir", "schemas"])
        .assert()
        .success();
    for name in [
        "run_summary",
        "export_summary",
        "merge_summary",
        "baseline_summary",
        "compile_summary",
    ] {
        let body = fs::read_to_string(dir.path().join(format!("schemas/{name}.schema.json"))).unwrap();
        let _: serde_json::Value = serde_json::from_str(&body).unwrap();
    }
}
