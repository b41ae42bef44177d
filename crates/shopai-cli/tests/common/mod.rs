//! Shared test utilities for shopai-cli integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Get a Command for the shopai binary.
///
/// The command runs with `HOME` and `SHOPAI_MODELS_DIR` inside `home`, so a
/// developer's `~/.shopai` never leaks into a test.
#[allow(deprecated)]
pub fn shopai_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("shopai").expect("shopai binary should exist");
    cmd.env("HOME", home)
        .env("SHOPAI_MODELS_DIR", home.join("models"))
        .env_remove("SHOPAI_CONFIG")
        .env_remove("SHOPAI_DEVICE")
        .env("SHOPAI_COLOR", "never");
    cmd
}

/// Path of the catalog shipped with the repository.
pub fn shipped_catalog() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/products.json")
}

/// A temp dir holding a config file that points at the shipped catalog.
///
/// Models are not installed, the reranker and the generator are off, and no
/// index has been built.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::with_config(&format!(
            "data:\n  catalogPath: {}\n  indexDir: index\nreranker:\n  enabled: false\n",
            shipped_catalog().display()
        ))
    }

    pub fn with_config(yaml: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        fs::write(dir.path().join("config.yaml"), yaml).expect("write config");
        Self { dir }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.yaml")
    }

    /// `shopai --config <sandbox config>`.
    pub fn cmd(&self) -> Command {
        let mut cmd = shopai_cmd(self.dir.path());
        cmd.arg("--config").arg(self.config_path());
        cmd
    }
}
