//! Kawaai avatar runtime (renderer-agnostic)
//!
//! Loads a rigged 2D character (manifest, rig, textures, motions, expressions,
//! physics, pose) and drives the per-frame parameter pipeline that blends idle
//! motion, drag look-at, breathing, physics, lip-sync, eye-blink and pose
//! resolution before handing the result to a renderer.
//!
//! The graphics context, renderer, rig decoder, asset transport and native
//! engine are traits so hosts (and tests) plug in their own backends.

pub mod config;
pub mod effects;
pub mod error;
pub mod fetch;
pub mod framework;
pub mod ids;
pub mod loader;
pub mod manifest;
pub mod model;
pub mod motion;
pub mod params;
pub mod physics;
pub mod pipeline;
pub mod renderer;
pub mod rig;
pub mod scene;
pub mod session;
pub mod surface;
pub mod texture;
pub mod view;

// Re-exports for hosts
pub use config::{CharacterTransform, RuntimeConfig};
pub use error::{
    ClipError, FetchError, FrameError, FrameworkError, LoadError, MotionStartError,
    RendererError, SessionError, SurfaceError,
};
pub use fetch::{AssetFetcher, FsFetcher};
pub use framework::{AnimationEngine, FrameworkLease, FrameworkLifecycle, StartupOptions};
pub use ids::{IdRegistry, ParamId};
pub use loader::LoadEnv;
pub use manifest::ModelManifest;
pub use model::AvatarModel;
pub use motion::Priority;
pub use params::ParameterBuffer;
pub use pipeline::{FrameStage, FRAME_ORDER};
pub use renderer::{Renderer, RendererFactory};
pub use rig::{Rig, RigDecoder};
pub use scene::SceneManager;
pub use session::{normalize_pointer, AvatarSession, ClientRect, FrameClock};
pub use surface::{ContextHandle, GraphicsContext, Surface, SurfaceAdapter};
pub use view::{ModelMatrix, ViewMatrix};
