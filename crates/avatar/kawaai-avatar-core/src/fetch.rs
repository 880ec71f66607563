//! Asset transport.

use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::FetchError;

/// Fetches asset bytes by path. Transport failures all map to [`FetchError`].
pub trait AssetFetcher {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>>;
}

/// Serves assets from a directory. Leading `/` in request paths is ignored.
#[derive(Clone, Debug)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

impl AssetFetcher for FsFetcher {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> {
        let full = self.root.join(path.trim_start_matches('/'));
        let path = path.to_string();
        async move {
            log::debug!("fetch {}", full.display());
            std::fs::read(&full).map_err(|source| match source.kind() {
                ErrorKind::NotFound => FetchError::NotFound { path },
                _ => FetchError::Io { path, source },
            })
        }
    }
}

/// Join a manifest-relative path under `base_dir` (which ends in `/` or is empty).
pub fn join(base_dir: &str, relative: &str) -> String {
    if base_dir.is_empty() || base_dir.ends_with('/') {
        format!("{base_dir}{relative}")
    } else {
        format!("{base_dir}/{relative}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_relative_paths() {
        assert_eq!(join("/live2d/Haru/", "Haru.moc3"), "/live2d/Haru/Haru.moc3");
        assert_eq!(join("models/Haru", "a.json"), "models/Haru/a.json");
        assert_eq!(join("", "a.json"), "a.json");
    }

    #[test]
    fn missing_file_is_not_found() {
        let f = FsFetcher::new(std::env::temp_dir());
        let err = futures::executor::block_on(f.fetch("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
    }
}
