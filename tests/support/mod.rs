use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

/// An isolated board data directory for one test.
pub struct TestBoard {
    dir: TempDir,
}

impl TestBoard {
    pub fn init() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let board = Self { dir };
        board
            .cmd()
            .arg("init")
            .assert()
            .success();
        board
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A command scoped to this board's data directory, with ambient
    /// identity stripped so tests control it explicitly.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("teamboard").expect("binary");
        cmd.env("TEAMBOARD_DIR", self.dir.path());
        cmd.env_remove("TEAMBOARD_USER");
        cmd
    }

    /// Register a user and return its generated id.
    pub fn register(&self, name: &str, role: &str, admin: bool) -> String {
        let mut cmd = self.cmd();
        cmd.args(["register", "--name", name, "--role", role, "--json"]);
        if admin {
            cmd.arg("--admin");
        }
        let output = cmd.output().expect("register runs");
        assert!(
            output.status.success(),
            "register failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let envelope: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("register emits JSON");
        envelope["data"]["user_id"]
            .as_str()
            .expect("register reports user_id")
            .to_string()
    }

    /// Create a task as the given faculty user and return the task id.
    pub fn create_task(&self, faculty_id: &str, title: &str) -> String {
        let output = self
            .cmd()
            .args([
                "task",
                "new",
                title,
                "--event",
                "Science Fair",
                "--event-date",
                "2026-09-15",
                "--user",
                faculty_id,
                "--json",
            ])
            .output()
            .expect("task new runs");
        assert!(
            output.status.success(),
            "task new failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let envelope: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("task new emits JSON");
        envelope["data"]["id"]
            .as_str()
            .expect("task new reports id")
            .to_string()
    }

    /// Parse the JSON envelope of a successful command.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .output()
            .expect("command runs");
        assert!(
            output.status.success(),
            "command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("command emits JSON")
    }
}
