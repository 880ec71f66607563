//! Character manifest (`*.model3.json`) model.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Fade value older exporters write when no override is declared.
pub const FADE_UNSET: f32 = -1.0;

const GROUP_EYE_BLINK: &str = "EyeBlink";
const GROUP_LIP_SYNC: &str = "LipSync";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelManifest {
    #[serde(default)]
    pub version: u32,
    pub file_references: FileReferences,
    #[serde(default)]
    pub groups: Vec<ParameterGroup>,
    #[serde(default)]
    pub hit_areas: Vec<HitArea>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileReferences {
    #[serde(default)]
    pub moc: Option<String>,
    #[serde(default)]
    pub textures: Vec<String>,
    #[serde(default)]
    pub physics: Option<String>,
    #[serde(default)]
    pub pose: Option<String>,
    #[serde(default)]
    pub expressions: Vec<ExpressionRef>,
    /// Group name → ordered motion references. Group order follows the file.
    #[serde(default)]
    pub motions: IndexMap<String, Vec<MotionRef>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpressionRef {
    pub name: String,
    pub file: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MotionRef {
    pub file: String,
    #[serde(default)]
    pub fade_in_time: Option<f32>,
    #[serde(default)]
    pub fade_out_time: Option<f32>,
}

impl MotionRef {
    /// Declared fade-in override, if any.
    pub fn fade_in(&self) -> Option<f32> {
        declared(self.fade_in_time)
    }

    pub fn fade_out(&self) -> Option<f32> {
        declared(self.fade_out_time)
    }
}

fn declared(v: Option<f32>) -> Option<f32> {
    v.filter(|v| *v != FADE_UNSET)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterGroup {
    pub target: String,
    pub name: String,
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HitArea {
    pub id: String,
    pub name: String,
}

impl ModelManifest {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Rig file name, treating an empty string as undeclared.
    pub fn rig_file(&self) -> Option<&str> {
        self.file_references
            .moc
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    pub fn physics_file(&self) -> Option<&str> {
        self.file_references
            .physics
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    pub fn pose_file(&self) -> Option<&str> {
        self.file_references.pose.as_deref().filter(|s| !s.is_empty())
    }

    pub fn textures(&self) -> &[String] {
        &self.file_references.textures
    }

    pub fn expressions(&self) -> &[ExpressionRef] {
        &self.file_references.expressions
    }

    pub fn motion_groups(&self) -> impl Iterator<Item = (&str, &[MotionRef])> {
        self.file_references
            .motions
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of motion entries declared for `group` (0 for unknown groups).
    pub fn motion_count(&self, group: &str) -> usize {
        self.file_references
            .motions
            .get(group)
            .map_or(0, |m| m.len())
    }

    fn group_ids(&self, name: &str) -> &[String] {
        self.groups
            .iter()
            .find(|g| g.target == "Parameter" && g.name == name)
            .map_or(&[], |g| g.ids.as_slice())
    }

    pub fn eye_blink_ids(&self) -> &[String] {
        self.group_ids(GROUP_EYE_BLINK)
    }

    pub fn lip_sync_ids(&self) -> &[String] {
        self.group_ids(GROUP_LIP_SYNC)
    }
}

/// Motion map key for a group entry.
pub fn motion_key(group: &str, index: usize) -> String {
    format!("{group}_{index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "Version": 3,
        "FileReferences": {
            "Moc": "Haru.moc3",
            "Textures": ["tex/texture_00.png"],
            "Physics": "",
            "Expressions": [{ "Name": "F01", "File": "expressions/F01.exp3.json" }],
            "Motions": {
                "Idle": [
                    { "File": "motions/idle_00.motion3.json", "FadeInTime": 0.5, "FadeOutTime": -1 },
                    { "File": "motions/idle_01.motion3.json" }
                ],
                "TapBody": [{ "File": "motions/tap_00.motion3.json" }]
            }
        },
        "Groups": [
            { "Target": "Parameter", "Name": "EyeBlink", "Ids": ["ParamEyeLOpen", "ParamEyeROpen"] },
            { "Target": "Parameter", "Name": "LipSync", "Ids": ["ParamMouthOpenY"] }
        ]
    }"#;

    #[test]
    fn parses_references_and_groups() {
        let m = ModelManifest::from_slice(MANIFEST.as_bytes()).expect("manifest");
        assert_eq!(m.rig_file(), Some("Haru.moc3"));
        assert_eq!(m.physics_file(), None);
        assert_eq!(m.pose_file(), None);
        assert_eq!(m.motion_count("Idle"), 2);
        assert_eq!(m.motion_count("Missing"), 0);
        assert_eq!(m.eye_blink_ids(), ["ParamEyeLOpen", "ParamEyeROpen"]);
        assert_eq!(m.lip_sync_ids(), ["ParamMouthOpenY"]);
        let groups: Vec<&str> = m.motion_groups().map(|(g, _)| g).collect();
        assert_eq!(groups, ["Idle", "TapBody"]);
    }

    #[test]
    fn fade_sentinel_is_not_an_override() {
        let m = ModelManifest::from_slice(MANIFEST.as_bytes()).expect("manifest");
        let idle = &m.file_references.motions["Idle"];
        assert_eq!(idle[0].fade_in(), Some(0.5));
        assert_eq!(idle[0].fade_out(), None);
        assert_eq!(idle[1].fade_in(), None);
        assert_eq!(motion_key("Idle", 1), "Idle_1");
    }
}
