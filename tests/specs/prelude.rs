//! Test helpers for behavioral specifications.
//!
//! Provides a project fixture and a command builder for the osiris CLI.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Returns the path to the osiris binary, checking the llvm-cov target
/// directory first so coverage runs work too. Falls back to resolving
/// relative to the test binary itself.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>; its
    // grandparent is target/debug/ where osiris is built.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn osiris_binary() -> PathBuf {
    binary_path("osiris")
}

const CSV_EXTRACTOR_SPEC: &str = r#"
name: filesystem.csv_extractor
version: 0.1.0
modes: [extract]
configSchema:
  type: object
  properties:
    path: {type: string}
    delimiter: {type: string}
    limit: {type: integer}
  required: [path]
x-runtime:
  driver: filesystem.csv_extractor
"#;

const CSV_WRITER_SPEC: &str = r#"
name: filesystem.csv_writer
version: 0.1.0
modes: [write]
configSchema:
  type: object
  properties:
    path: {type: string}
    delimiter: {type: string}
  required: [path]
x-runtime:
  driver: filesystem.csv_writer
"#;

const MYSQL_EXTRACTOR_SPEC: &str = r#"
name: mysql.extractor
version: 0.1.0
modes: [extract, discover]
configSchema:
  type: object
  properties:
    connection: {type: string}
    query: {type: string}
    password: {type: string}
secrets: [/password]
x-runtime:
  driver: mysql.extractor
"#;

/// A pipeline that round-trips entirely through the filesystem drivers:
/// read `data/actors.csv`, write `out/actors.csv`.
pub const CSV_ROUNDTRIP_OML: &str = r#"
oml_version: "0.1.0"
name: csv-roundtrip
steps:
  - id: extract-actors
    component: filesystem.csv_extractor
    mode: extract
    config:
      path: data/actors.csv
  - id: write-actors
    component: filesystem.csv_writer
    mode: write
    needs: [extract-actors]
    config:
      path: out/actors.csv
"#;

pub const ACTORS_CSV: &str = "id,name\n1,Tom\n2,Morgan\n3,Meryl\n";

/// An isolated project directory with a components/ tree and fixtures.
pub struct Project {
    _tmp: tempfile::TempDir,
    pub root: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        for (dir, spec) in [
            ("filesystem.csv_extractor", CSV_EXTRACTOR_SPEC),
            ("filesystem.csv_writer", CSV_WRITER_SPEC),
            ("mysql.extractor", MYSQL_EXTRACTOR_SPEC),
        ] {
            let spec_dir = root.join("components").join(dir);
            std::fs::create_dir_all(&spec_dir).unwrap();
            std::fs::write(spec_dir.join("spec.yaml"), spec).unwrap();
        }
        Self { _tmp: tmp, root }
    }

    /// Project with the CSV round-trip pipeline and its source data.
    pub fn with_csv_pipeline() -> Self {
        let project = Self::new();
        project.write("pipeline.yaml", CSV_ROUNDTRIP_OML);
        std::fs::create_dir_all(project.root.join("data")).unwrap();
        project.write("data/actors.csv", ACTORS_CSV);
        project
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.root.join(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).exists()
    }

    /// Run `osiris` with the given args in the project directory.
    pub fn osiris(&self, args: &[&str]) -> Output {
        Command::new(osiris_binary())
            .args(args)
            .current_dir(&self.root)
            .output()
            .expect("failed to spawn osiris")
    }

    /// Session directories under ./logs, sorted by name.
    pub fn sessions(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.root.join("logs"))
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn exit_code(output: &Output) -> i32 {
    output.status.code().unwrap_or(-1)
}
