use assert_cmd::Command;
use predicates::prelude::*;

fn cmd(config_home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("tunefetch").unwrap();
    // Keep the auto-created config file out of the real config directory
    cmd.env("XDG_CONFIG_HOME", config_home);
    cmd
}

#[test]
fn help_lists_subcommands() {
    let home = tempfile::tempdir().unwrap();
    cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("fetch")
                .and(predicate::str::contains("sources"))
                .and(predicate::str::contains("health")),
        );
}

#[test]
fn sources_lists_allow_list() {
    let home = tempfile::tempdir().unwrap();
    cmd(home.path())
        .arg("sources")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("youtube.com").and(predicate::str::contains("youtu.be")),
        );
}

#[test]
fn fetch_rejects_unrecognized_url_without_downloading() {
    let home = tempfile::tempdir().unwrap();
    cmd(home.path())
        .args(["fetch", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported link"));
}

#[test]
fn config_show_prints_defaults() {
    let home = tempfile::tempdir().unwrap();
    cmd(home.path())
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("192 kbps"));
}
