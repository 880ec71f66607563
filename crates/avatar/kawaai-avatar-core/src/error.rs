//! Error taxonomy for loading, playback, lifecycle and rendering.
//!
//! - [`LoadError`]: fatal load failures. The model never becomes current.
//! - [`ClipError`]: a single motion/expression failed to parse. Logged and skipped.
//! - [`MotionStartError`]: runtime-degraded requests. No state is touched.
//! - [`FrameworkError`]: engine capability missing at first initialize.

use thiserror::Error;

use crate::motion::Priority;

/// Transport-level failure for a single asset path.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("asset not found: {path}")]
    NotFound { path: String },
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transport error for {path}: {reason}")]
    Transport { path: String, reason: String },
}

/// Failure to parse a motion, expression, physics or pose file.
#[derive(Debug, Error)]
pub enum ClipError {
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed segments in curve '{curve}': {reason}")]
    Segments { curve: String, reason: String },
    #[error("invalid clip: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("no graphics context available for renderer start-up")]
    NoContext,
    #[error("texture upload failed: {0}")]
    TextureUpload(String),
    #[error("renderer backend error: {0}")]
    Backend(String),
}

/// Fatal load errors surfaced to whoever called `load_assets`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: FetchError,
    },
    #[error("manifest parse error: {0}")]
    Manifest(#[source] serde_json::Error),
    #[error("manifest declares no rig file")]
    MissingRig,
    #[error("rig decode failed: {0}")]
    RigDecode(String),
    #[error("renderer unavailable: {0}")]
    RendererUnavailable(#[source] RendererError),
    #[error("texture {index} ({path}) failed to decode: {source}")]
    TextureDecode {
        index: usize,
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("texture {index} ({path}) failed to upload: {source}")]
    TextureUpload {
        index: usize,
        path: String,
        #[source]
        source: RendererError,
    },
    #[error("physics rig invalid: {0}")]
    Physics(#[source] ClipError),
    #[error("pose rig invalid: {0}")]
    Pose(#[source] ClipError),
}

/// Reasons a motion request is refused. The caller receives the signal; nothing panics.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MotionStartError {
    #[error("model is not ready")]
    NotReady,
    #[error("motion not found: {key}")]
    UnknownMotion { key: String },
    #[error("priority {requested:?} rejected (current {current:?}, reserved {reserved:?})")]
    ReservationRejected {
        requested: Priority,
        current: Priority,
        reserved: Priority,
    },
    #[error("motion group '{group}' is empty")]
    EmptyGroup { group: String },
    #[error("expression not found: {name}")]
    UnknownExpression { name: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameworkError {
    #[error("native animation engine is not available")]
    EngineUnavailable,
    #[error("global framework already installed")]
    AlreadyInstalled,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("failed to create a compatible graphics context")]
    NoContext,
    #[error("surface adapter is not initialized")]
    NotInitialized,
}

/// Per-stage failure inside `update`. Logged by the model; the frame continues.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("idle restart failed: {0}")]
    IdleRestart(#[from] MotionStartError),
    #[error("stage {stage} produced a non-finite value for '{parameter}'")]
    NonFinite {
        stage: &'static str,
        parameter: String,
    },
}

/// Session bring-up failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Framework(#[from] FrameworkError),
}
