//! Parameter/part identifiers and the interning registry owned by the framework.

use std::fmt;
use std::sync::{Arc, Mutex};

use hashbrown::HashMap;

/// Standard parameter identifiers understood by every rig.
pub mod default_ids {
    pub const PARAM_ANGLE_X: &str = "ParamAngleX";
    pub const PARAM_ANGLE_Y: &str = "ParamAngleY";
    pub const PARAM_ANGLE_Z: &str = "ParamAngleZ";
    pub const PARAM_BODY_ANGLE_X: &str = "ParamBodyAngleX";
    pub const PARAM_EYE_BALL_X: &str = "ParamEyeBallX";
    pub const PARAM_EYE_BALL_Y: &str = "ParamEyeBallY";
    pub const PARAM_MOUTH_OPEN_Y: &str = "ParamMouthOpenY";
    pub const PARAM_BREATH: &str = "ParamBreath";
}

/// Interned identifier for a parameter or part. Equality is by name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(Arc<str>);

/// Parts share the identifier type.
pub type PartId = ParamId;

impl ParamId {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParamId({})", self.0)
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry handing out shared handles for identifier names.
#[derive(Debug, Default)]
pub struct IdRegistry {
    ids: Mutex<HashMap<Box<str>, ParamId>>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `name`, registering it on first use.
    pub fn get(&self, name: &str) -> ParamId {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(id) = ids.get(name) {
            return id.clone();
        }
        let id = ParamId::new(name);
        ids.insert(name.into(), id.clone());
        id
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every registered handle (engine teardown).
    pub fn clear(&self) {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// Resolved handles for the parameters the frame pipeline writes directly.
#[derive(Clone, Debug)]
pub struct StandardIds {
    pub angle_x: ParamId,
    pub angle_y: ParamId,
    pub angle_z: ParamId,
    pub body_angle_x: ParamId,
    pub eye_ball_x: ParamId,
    pub eye_ball_y: ParamId,
    pub mouth_open_y: ParamId,
}

impl StandardIds {
    pub fn resolve(registry: &IdRegistry) -> Self {
        Self {
            angle_x: registry.get(default_ids::PARAM_ANGLE_X),
            angle_y: registry.get(default_ids::PARAM_ANGLE_Y),
            angle_z: registry.get(default_ids::PARAM_ANGLE_Z),
            body_angle_x: registry.get(default_ids::PARAM_BODY_ANGLE_X),
            eye_ball_x: registry.get(default_ids::PARAM_EYE_BALL_X),
            eye_ball_y: registry.get(default_ids::PARAM_EYE_BALL_Y),
            mouth_open_y: registry.get(default_ids::PARAM_MOUTH_OPEN_Y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_interns_names() {
        let reg = IdRegistry::new();
        let a = reg.get("ParamAngleX");
        let b = reg.get("ParamAngleX");
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(reg.len(), 1);

        let _ = StandardIds::resolve(&reg);
        assert_eq!(reg.len(), 7);
    }
}
