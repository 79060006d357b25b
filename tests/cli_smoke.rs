use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn teamboard_help_works() {
    Command::cargo_bin("teamboard")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("shared task board"));
}

#[test]
fn init_honors_an_existing_store_dir_override() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join(".teamboard.toml"),
        "[store]\ndir = \"collections\"\n",
    )
    .expect("write config");

    Command::cargo_bin("teamboard")
        .expect("binary")
        .env("TEAMBOARD_DIR", dir.path())
        .arg("init")
        .assert()
        .success();
    assert!(dir.path().join("collections").is_dir());

    // Later writes land in the same place init prepared.
    Command::cargo_bin("teamboard")
        .expect("binary")
        .env("TEAMBOARD_DIR", dir.path())
        .args(["register", "--name", "Asha", "--role", "member"])
        .assert()
        .success();
    assert!(dir.path().join("collections").join("users.json").is_file());
    assert!(!dir.path().join("users.json").exists());
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "init", "register", "login", "logout", "whoami", "board", "task", "user", "event",
    ];

    for cmd in subcommands {
        Command::cargo_bin("teamboard")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}
