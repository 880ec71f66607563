#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use kawaai_avatar::error::{FetchError, RendererError};
use kawaai_avatar::framework::{AnimationEngine, StartupOptions};
use kawaai_avatar::surface::{BlendFactor, ContextAttributes};
use kawaai_avatar::texture::{TextureDesc, TextureId};
use kawaai_avatar::{
    AssetFetcher, AvatarModel, ContextHandle, GraphicsContext, LoadEnv, ParameterBuffer, Renderer,
    RendererFactory, Rig, RigDecoder, RuntimeConfig, Surface,
};
use nalgebra::Matrix4;

pub fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

/// Ordered record of every collaborator call, shared by all fakes of one test.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, e: impl Into<String>) {
        self.0.lock().unwrap().push(e.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.events().iter().position(|e| e.starts_with(prefix))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// In-memory asset server keyed by request path.
pub struct MemoryFetcher {
    files: HashMap<String, Vec<u8>>,
    log: EventLog,
}

impl MemoryFetcher {
    pub fn new(log: EventLog) -> Self {
        Self {
            files: HashMap::new(),
            log,
        }
    }

    /// Serve a fixture character under `{resources_path}{name}/`.
    pub fn with_model(mut self, resources_path: &str, name: &str) -> Self {
        let files = kawaai_test_fixtures::models::files(name).expect("fixture files");
        for (rel, bytes) in files {
            self.files.insert(format!("{resources_path}{name}/{rel}"), bytes);
        }
        self
    }

    pub fn insert(&mut self, path: &str, bytes: Vec<u8>) {
        self.files.insert(path.to_string(), bytes);
    }

    pub fn remove(&mut self, path: &str) {
        self.files.remove(path);
    }
}

impl AssetFetcher for MemoryFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        self.log.push(format!("fetch:{path}"));
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                path: path.to_string(),
            })
    }
}

pub struct FakeContext {
    log: EventLog,
    next: Cell<u32>,
    pub live_textures: RefCell<Vec<TextureId>>,
    pub fail_uploads: Cell<bool>,
}

impl FakeContext {
    pub fn new(log: EventLog) -> Rc<Self> {
        Rc::new(Self {
            log,
            next: Cell::new(1),
            live_textures: RefCell::new(Vec::new()),
            fail_uploads: Cell::new(false),
        })
    }
}

impl GraphicsContext for FakeContext {
    fn enable_blend(&self, _src: BlendFactor, _dst: BlendFactor) {
        self.log.push("gl.enable_blend");
    }
    fn blend_func_separate(
        &self,
        _src_rgb: BlendFactor,
        _dst_rgb: BlendFactor,
        _src_alpha: BlendFactor,
        _dst_alpha: BlendFactor,
    ) {
        self.log.push("gl.blend_func_separate");
    }
    fn viewport(&self, _x: i32, _y: i32, width: u32, height: u32) {
        self.log.push(format!("gl.viewport:{width}x{height}"));
    }
    fn clear(&self, r: f32, g: f32, b: f32, a: f32) {
        self.log.push(format!("gl.clear:{r},{g},{b},{a}"));
    }
    fn create_texture(&self, desc: &TextureDesc<'_>) -> Result<TextureId, RendererError> {
        if self.fail_uploads.get() {
            return Err(RendererError::TextureUpload("out of memory".into()));
        }
        let id = TextureId(self.next.get());
        self.next.set(id.0 + 1);
        self.live_textures.borrow_mut().push(id);
        self.log
            .push(format!("texture.upload:{}x{}", desc.width, desc.height));
        Ok(id)
    }
    fn delete_texture(&self, texture: TextureId) {
        self.live_textures.borrow_mut().retain(|t| *t != texture);
        self.log.push("texture.delete");
    }
}

pub struct FakeRenderer {
    log: EventLog,
}

impl Renderer for FakeRenderer {
    fn start_up(&mut self, _ctx: ContextHandle) -> Result<(), RendererError> {
        self.log.push("renderer.start_up");
        Ok(())
    }
    fn bind_texture(&mut self, index: usize, texture: TextureId) {
        self.log
            .push(format!("renderer.bind_texture:{index}:{}", texture.0));
    }
    fn set_premultiplied_alpha(&mut self, enabled: bool) {
        self.log.push(format!("renderer.premultiplied:{enabled}"));
    }
    fn set_mvp(&mut self, _mvp: &Matrix4<f32>) {
        self.log.push("renderer.set_mvp");
    }
    fn set_render_state(&mut self, viewport: [u32; 4]) {
        self.log
            .push(format!("renderer.render_state:{}x{}", viewport[2], viewport[3]));
    }
    fn draw_model(&mut self, _rig: &Rig, _params: &ParameterBuffer) -> Result<(), RendererError> {
        self.log.push("renderer.draw");
        Ok(())
    }
    fn release(&mut self) {
        self.log.push("renderer.release");
    }
}

pub struct FakeRenderers {
    pub log: EventLog,
}

impl RendererFactory for FakeRenderers {
    fn create(&self, _rig: &Rig) -> Box<dyn Renderer> {
        self.log.push("renderer.create");
        Box::new(FakeRenderer {
            log: self.log.clone(),
        })
    }
}

/// Rigs in the fixtures are stored as JSON.
pub struct JsonRigDecoder {
    pub log: EventLog,
}

impl RigDecoder for JsonRigDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Rig, String> {
        self.log.push("rig.decode");
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    }
}

pub struct FakeSurface {
    pub log: EventLog,
    pub layout: (u32, u32),
    pub context: Option<Rc<FakeContext>>,
}

impl Surface for FakeSurface {
    fn layout_size(&self) -> (u32, u32) {
        self.layout
    }
    fn set_size(&mut self, width: u32, height: u32) {
        self.log.push(format!("surface.set_size:{width}x{height}"));
    }
    fn create_context(&mut self, attrs: ContextAttributes) -> Option<ContextHandle> {
        assert!(attrs.alpha && attrs.premultiplied_alpha);
        self.log.push("surface.create_context");
        self.context.clone().map(|c| c as ContextHandle)
    }
}

impl Drop for FakeSurface {
    fn drop(&mut self) {
        self.log.push("surface.release");
    }
}

#[derive(Default)]
pub struct EngineCounters {
    pub start_ups: AtomicUsize,
    pub initializes: AtomicUsize,
    pub disposes: AtomicUsize,
}

impl EngineCounters {
    pub fn start_ups(&self) -> usize {
        self.start_ups.load(Ordering::SeqCst)
    }
    pub fn disposes(&self) -> usize {
        self.disposes.load(Ordering::SeqCst)
    }
}

pub struct FakeEngine {
    pub counters: Arc<EngineCounters>,
    pub available: bool,
    pub log: Option<EventLog>,
}

impl FakeEngine {
    pub fn new(counters: Arc<EngineCounters>) -> Self {
        Self {
            counters,
            available: true,
            log: None,
        }
    }

    pub fn logged(counters: Arc<EngineCounters>, log: EventLog) -> Self {
        Self {
            log: Some(log),
            ..Self::new(counters)
        }
    }
}

impl AnimationEngine for FakeEngine {
    fn is_available(&self) -> bool {
        self.available
    }
    fn start_up(&mut self, _options: &StartupOptions) {
        self.counters.start_ups.fetch_add(1, Ordering::SeqCst);
    }
    fn initialize(&mut self) {
        self.counters.initializes.fetch_add(1, Ordering::SeqCst);
    }
    fn dispose(&mut self) {
        self.counters.disposes.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.push("engine.dispose");
        }
    }
}

/// Everything one load needs, wired to a shared log.
pub struct Harness {
    pub log: EventLog,
    pub fetcher: MemoryFetcher,
    pub decoder: JsonRigDecoder,
    pub renderers: FakeRenderers,
    pub context: Rc<FakeContext>,
}

impl Harness {
    pub fn new(config: &RuntimeConfig, models: &[&str]) -> Self {
        let log = EventLog::default();
        let mut fetcher = MemoryFetcher::new(log.clone());
        for m in models {
            fetcher = fetcher.with_model(&config.resources_path, m);
        }
        Self {
            decoder: JsonRigDecoder { log: log.clone() },
            renderers: FakeRenderers { log: log.clone() },
            context: FakeContext::new(log.clone()),
            fetcher,
            log,
        }
    }

    pub fn env(&self) -> LoadEnv<'_, MemoryFetcher> {
        LoadEnv {
            fetcher: &self.fetcher,
            decoder: &self.decoder,
            renderers: &self.renderers,
            context: Some(self.context.clone() as ContextHandle),
        }
    }
}

/// Deterministic config; `breath` cleared so tests can read exact parameter values.
pub fn quiet_config() -> RuntimeConfig {
    RuntimeConfig {
        rng_seed: Some(7),
        breath: Vec::new(),
        ..RuntimeConfig::default()
    }
}

pub fn block_on<T>(f: impl std::future::Future<Output = T>) -> T {
    futures::executor::block_on(f)
}

/// Load fixture `name` directly into a fresh model.
pub fn load_model(
    harness: &Harness,
    config: Arc<RuntimeConfig>,
    name: &str,
) -> Result<AvatarModel, kawaai_avatar::LoadError> {
    let mut model = AvatarModel::new(Arc::clone(&config), Arc::default());
    let base = format!("{}{name}/", config.resources_path);
    let file = kawaai_test_fixtures::models::manifest_file(name).expect("fixture manifest");
    block_on(model.load_assets(&harness.env(), &base, file))?;
    Ok(model)
}

pub fn run_frames(model: &mut AvatarModel, frames: usize, dt: f32) {
    for _ in 0..frames {
        model.update(dt);
    }
}
