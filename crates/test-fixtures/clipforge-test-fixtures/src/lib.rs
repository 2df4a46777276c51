//! Shared JSON clip fixtures for integration tests.
//!
//! Fixtures live under the repo-root `fixtures/` directory and are listed in
//! `fixtures/manifest.json`; tests address them by name so file layout can
//! change without touching test code.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    clips: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn manifest_entry(name: &str) -> Result<&'static str> {
    MANIFEST
        .clips
        .get(name)
        .map(|rel| rel.as_str())
        .ok_or_else(|| anyhow!("unknown clip fixture '{name}'"))
}

pub mod clips {
    use super::*;

    /// Names of every registered clip fixture.
    pub fn names() -> Vec<String> {
        MANIFEST.clips.keys().cloned().collect()
    }

    /// Raw JSON text of a fixture.
    pub fn json(name: &str) -> Result<String> {
        let path = path(name)?;
        fs::read_to_string(&path)
            .with_context(|| format!("failed to read clip fixture at {}", path.display()))
    }

    /// Deserialize a fixture into the caller's clip type.
    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let text = json(name)?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse clip fixture '{name}'"))
    }

    /// Absolute path of a fixture on disk.
    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(fixtures_root().join(manifest_entry(name)?))
    }
}
