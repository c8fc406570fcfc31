use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli(workspace: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("outliner-cli")?;
    cmd.arg("--workspace").arg(workspace);
    Ok(cmd)
}

#[test]
fn import_then_export_round_trips_outline_text() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let source = workspace.path().join("plan.txt");
    fs::write(&source, "Plan\n  Design\n    Sketch\n  Build\n\nShip\n")?;

    cli(workspace.path())?
        .args(["import", source.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 5 node(s)"));

    cli(workspace.path())?
        .arg("export")
        .assert()
        .success()
        .stdout("Plan\n  Design\n    Sketch\n  Build\nShip\n");

    let output = workspace.path().join("out").join("plan.txt");
    cli(workspace.path())?
        .args(["export", "--output", output.to_str().unwrap()])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(output)?,
        "Plan\n  Design\n    Sketch\n  Build\nShip\n"
    );
    Ok(())
}

#[test]
fn padded_node_text_survives_export_and_import() -> Result<(), Box<dyn Error>> {
    let source = tempdir()?;
    cli(source.path())?.args(["add", "  padded"]).assert().success();

    let exported = source.path().join("padded.txt");
    cli(source.path())?
        .args(["export", "--output", exported.to_str().unwrap()])
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&exported)?, "Hello, world!\n\\  padded\n");

    let target = tempdir()?;
    cli(target.path())?
        .args(["import", exported.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 node(s)"));
    cli(target.path())?
        .arg("show")
        .assert()
        .success()
        .stdout("* Hello, world!\n*   padded\n");
    Ok(())
}

#[test]
fn import_rejects_level_jumps() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let source = workspace.path().join("bad.txt");
    fs::write(&source, "Top\n      too deep\n")?;

    cli(workspace.path())?
        .args(["import", source.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
    assert!(!workspace.path().join(".outliner").join("data.json").exists());
    Ok(())
}

#[test]
fn edits_write_timestamped_backups() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(workspace.path())?.args(["add", "first"]).assert().success();

    let backups = workspace.path().join(".outliner").join("backups");
    assert!(backups.is_dir());

    cli(workspace.path())?
        .arg("backup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote backup"));
    let listed = cli(workspace.path())?
        .arg("backups")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let listed = String::from_utf8(listed)?;
    assert!(!listed.is_empty());
    for line in listed.lines() {
        assert!(line.ends_with(".json"), "unexpected line {line:?}");
    }
    Ok(())
}

#[test]
fn preferences_import_changes_rendering() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let import_path = workspace.path().join("prefs.json");
    fs::write(
        &import_path,
        r#"{
            "version": 1,
            "storage": { "backups_enabled": false },
            "outline": { "indent_width": 4, "initial_text": "Inbox" }
        }"#,
    )?;

    cli(workspace.path())?
        .args(["preferences", "import", import_path.to_str().unwrap()])
        .assert()
        .success();

    let parent = cli(workspace.path())?
        .args(["add", "child"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let parent = String::from_utf8(parent)?.trim().to_string();
    cli(workspace.path())?
        .args(["add", "grandchild", "--parent", &parent])
        .assert()
        .success();
    cli(workspace.path())?
        .arg("show")
        .assert()
        .success()
        .stdout("* Inbox\n- child\n    * grandchild\n");
    assert!(!workspace.path().join(".outliner").join("backups").exists());

    let export_path = workspace.path().join("prefs-export.json");
    cli(workspace.path())?
        .args(["preferences", "export", "--output", export_path.to_str().unwrap()])
        .assert()
        .success();
    let exported = fs::read_to_string(export_path)?;
    assert!(exported.contains("\"indent_width\": 4"));
    assert!(exported.contains("\"backups_enabled\": false"));
    Ok(())
}
