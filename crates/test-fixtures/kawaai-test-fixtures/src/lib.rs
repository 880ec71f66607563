use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    models: HashMap<String, ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    dir: String,
    manifest: String,
}

pub fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn lookup(name: &str) -> Result<&'static ModelEntry> {
    MANIFEST
        .models
        .get(name)
        .ok_or_else(|| anyhow!("unknown model fixture '{name}'"))
}

pub mod models {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.models.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Directory the character lives in, relative to the fixtures root.
    pub fn dir(name: &str) -> Result<&'static str> {
        Ok(lookup(name)?.dir.as_str())
    }

    /// Manifest file name inside [`dir`].
    pub fn manifest_file(name: &str) -> Result<&'static str> {
        Ok(lookup(name)?.manifest.as_str())
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(&lookup(name)?.dir))
    }

    /// Every file of a character keyed by its path relative to the character directory.
    pub fn files(name: &str) -> Result<HashMap<String, Vec<u8>>> {
        let root = path(name)?;
        let mut out = HashMap::new();
        collect(&root, &root, &mut out)?;
        Ok(out)
    }

    fn collect(root: &Path, dir: &Path, out: &mut HashMap<String, Vec<u8>>) -> Result<()> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("failed to list fixture dir {}", dir.display()))?;
        for entry in entries {
            let p = entry?.path();
            if p.is_dir() {
                collect(root, &p, out)?;
                continue;
            }
            let rel = p
                .strip_prefix(root)
                .with_context(|| format!("fixture {} outside {}", p.display(), root.display()))?
                .to_string_lossy()
                .replace('\\', "/");
            let bytes =
                fs::read(&p).with_context(|| format!("failed to read fixture at {}", p.display()))?;
            out.insert(rel, bytes);
        }
        Ok(())
    }
}

pub fn read(rel: &str) -> Result<Vec<u8>> {
    let path = resolve_path(rel);
    fs::read(&path).with_context(|| format!("failed to read fixture at {}", path.display()))
}

pub fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_model_has_its_manifest() {
        for key in models::keys() {
            let dir = models::dir(&key).unwrap();
            let file = models::manifest_file(&key).unwrap();
            read(&format!("{dir}/{file}")).unwrap();
        }
    }

    #[test]
    fn files_are_keyed_relative_to_the_character() {
        let files = models::files("Haru").unwrap();
        assert!(files.contains_key("Haru.model3.json"));
        assert!(files.contains_key("motions/idle_00.motion3.json"));
        assert!(models::dir("Nobody").is_err());
    }
}
