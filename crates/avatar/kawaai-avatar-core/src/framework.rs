//! Reference-counted bring-up of the native animation engine.
//!
//! The engine may be started once per process. Every avatar instance calls
//! [`FrameworkLifecycle::initialize`] (or holds a [`FrameworkLease`]) and the
//! engine is only started on the first acquire and disposed on the last release.
//! All counter transitions happen under one lock.

use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::OnceCell;

use crate::error::FrameworkError;
use crate::ids::IdRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
    Off,
}

/// Sink for engine log lines.
pub type LogSink = fn(LogLevel, &str);

/// Forwards engine output to the `log` facade.
pub fn diagnostics_sink(level: LogLevel, message: &str) {
    match level {
        LogLevel::Verbose => log::trace!(target: "engine", "{message}"),
        LogLevel::Debug => log::debug!(target: "engine", "{message}"),
        LogLevel::Info => log::info!(target: "engine", "{message}"),
        LogLevel::Warning => log::warn!(target: "engine", "{message}"),
        LogLevel::Error => log::error!(target: "engine", "{message}"),
        LogLevel::Off => {}
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StartupOptions {
    pub log_sink: LogSink,
    pub log_level: LogLevel,
}

impl Default for StartupOptions {
    fn default() -> Self {
        Self {
            log_sink: diagnostics_sink,
            log_level: LogLevel::Verbose,
        }
    }
}

/// The native engine behind the runtime.
pub trait AnimationEngine: Send {
    fn is_available(&self) -> bool;
    fn start_up(&mut self, options: &StartupOptions);
    fn initialize(&mut self);
    fn dispose(&mut self);
}

struct LifecycleState {
    engine: Box<dyn AnimationEngine>,
    initialized: bool,
    ref_count: usize,
}

pub struct FrameworkLifecycle {
    state: Mutex<LifecycleState>,
    ids: Arc<IdRegistry>,
}

impl std::fmt::Debug for FrameworkLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.lock();
        f.debug_struct("FrameworkLifecycle")
            .field("initialized", &s.initialized)
            .field("ref_count", &s.ref_count)
            .finish()
    }
}

impl FrameworkLifecycle {
    pub fn new(engine: impl AnimationEngine + 'static) -> Self {
        Self {
            state: Mutex::new(LifecycleState {
                engine: Box::new(engine),
                initialized: false,
                ref_count: 0,
            }),
            ids: Arc::new(IdRegistry::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Acquire one reference. The first acquire starts the engine.
    pub fn initialize(&self) -> Result<(), FrameworkError> {
        let mut s = self.lock();
        s.ref_count += 1;
        if s.initialized {
            return Ok(());
        }
        if !s.engine.is_available() {
            s.ref_count -= 1;
            log::error!("framework: native engine unavailable");
            return Err(FrameworkError::EngineUnavailable);
        }
        let options = StartupOptions::default();
        s.engine.start_up(&options);
        s.engine.initialize();
        s.initialized = true;
        log::info!("framework: engine started");
        Ok(())
    }

    /// Drop one reference. The last release disposes the engine.
    pub fn release(&self) {
        let mut s = self.lock();
        s.ref_count = s.ref_count.saturating_sub(1);
        if s.ref_count == 0 && s.initialized {
            s.engine.dispose();
            s.initialized = false;
            self.ids.clear();
            log::info!("framework: engine disposed");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    pub fn ref_count(&self) -> usize {
        self.lock().ref_count
    }

    /// Shared identifier registry.
    pub fn ids(&self) -> Arc<IdRegistry> {
        Arc::clone(&self.ids)
    }

    /// Initialize and return a guard that releases on drop.
    pub fn acquire(self: &Arc<Self>) -> Result<FrameworkLease, FrameworkError> {
        self.initialize()?;
        Ok(FrameworkLease {
            framework: Some(Arc::clone(self)),
        })
    }
}

/// One held reference on a [`FrameworkLifecycle`].
#[derive(Debug)]
pub struct FrameworkLease {
    framework: Option<Arc<FrameworkLifecycle>>,
}

impl FrameworkLease {
    pub fn framework(&self) -> Option<&Arc<FrameworkLifecycle>> {
        self.framework.as_ref()
    }

    /// Release now instead of at drop.
    pub fn release(mut self) {
        if let Some(fw) = self.framework.take() {
            fw.release();
        }
    }
}

impl Drop for FrameworkLease {
    fn drop(&mut self) {
        if let Some(fw) = self.framework.take() {
            fw.release();
        }
    }
}

static GLOBAL: OnceCell<Arc<FrameworkLifecycle>> = OnceCell::new();

/// Install the process-wide framework. Only the first call succeeds.
pub fn install_global(
    engine: impl AnimationEngine + 'static,
) -> Result<Arc<FrameworkLifecycle>, FrameworkError> {
    let fw = Arc::new(FrameworkLifecycle::new(engine));
    GLOBAL
        .set(Arc::clone(&fw))
        .map_err(|_| FrameworkError::AlreadyInstalled)?;
    Ok(fw)
}

pub fn global() -> Option<Arc<FrameworkLifecycle>> {
    GLOBAL.get().cloned()
}
