use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;

pub fn bin_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("modloc").unwrap();
    cmd.current_dir(cwd).arg("--no-color").env_remove("RUST_LOG");
    cmd
}

pub fn write(root: &Path, rel: &str, body: &str) {
    let p = root.join(rel);
    fs::create_dir_all(p.parent().unwrap()).unwrap();
    fs::write(p, body).unwrap();
}

/// A game folder with one module: a tagged string, an untagged one and a Japanese language file.
pub fn game_fixture(root: &Path) {
    write(
        root,
        "game/Modules/Mod/ModuleData/items.xml",
        r#"<Items><Item id="i1" name="{=sword_1}Sword"/><Item id="i2" name="Shield"/></Items>"#,
    );
    write(
        root,
        "game/Modules/Mod/ModuleData/Languages/JP/strings.xml",
        r#"<base><strings><string id="sword_1" text="剣"/></strings></base>"#,
    );
}

pub fn stdout_json(out: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&out.stdout).unwrap()
}
