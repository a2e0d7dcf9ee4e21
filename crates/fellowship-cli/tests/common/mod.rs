#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;
use url::Url;

/// An isolated home directory plus a local `file://` store.
pub struct Sandbox {
    _temp: TempDir,
    pub home: PathBuf,
    pub store_url: String,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = temp.path().join("store");
        std::fs::create_dir_all(&store).unwrap();
        let home = temp.path().join("home");
        std::fs::create_dir_all(&home).unwrap();

        let store_url = Url::from_directory_path(&store)
            .expect("Failed to convert path to file URL")
            .to_string();

        Self {
            _temp: temp,
            home,
            store_url,
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.home.join("data").join("fellowship")
    }

    /// Run the CLI binary against this sandbox.
    pub fn run(&self, args: &[&str]) -> Output {
        run_cli_with_env(args, &self.home, &self.store_url)
    }

    /// Run the CLI and expect success.
    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Register and sign in a member.
    pub fn register(&self, email: &str, name: &str) {
        self.run_success(&[
            "register",
            "--email",
            email,
            "--password",
            "hunter22",
            "--display-name",
            name,
        ]);
    }
}

/// Run the CLI with a custom HOME directory for isolated session storage.
pub fn run_cli_with_env(args: &[&str], home: &Path, store_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_fellowship"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env("FELLOWSHIP_ENDPOINT", store_url);
    cmd.env_remove("FELLOWSHIP_PROJECT_ID");
    cmd.env_remove("FELLOWSHIP_API_KEY");
    cmd.env_remove("FELLOWSHIP_AUTH_ENDPOINT");
    cmd.env_remove("RUST_LOG");
    cmd.env("NO_COLOR", "1");
    cmd.output().expect("Failed to execute CLI")
}

/// Parse JSON-lines output.
pub fn json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("Output line is not JSON"))
        .collect()
}
