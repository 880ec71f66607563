//! Owns the loaded models and the shared view transform.

use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::error::LoadError;
use crate::fetch::AssetFetcher;
use crate::ids::IdRegistry;
use crate::loader::LoadEnv;
use crate::model::AvatarModel;
use crate::view::ViewMatrix;

#[derive(Debug)]
pub struct SceneManager {
    config: Arc<RuntimeConfig>,
    ids: Arc<IdRegistry>,
    models: Vec<AvatarModel>,
    scene_index: usize,
    view: ViewMatrix,
    /// Character directory of the last load request; selects the transform row.
    current_dir: String,
}

impl SceneManager {
    pub fn new(config: Arc<RuntimeConfig>, ids: Arc<IdRegistry>) -> Self {
        let view = ViewMatrix::for_character(&config.view, &config.default_character);
        Self {
            config,
            ids,
            models: Vec::new(),
            scene_index: 0,
            view,
            current_dir: String::new(),
        }
    }

    fn setup_view(&mut self) {
        let row = self.config.character_transform(&self.current_dir);
        log::debug!(
            "view for {}: scale {} translate ({}, {})",
            self.current_dir,
            row.scale,
            row.translate_x,
            row.translate_y
        );
        self.view = ViewMatrix::for_character(&self.config.view, row);
    }

    /// Load `{resources_path}{dir}/{file}`. The new model becomes current on success;
    /// on failure the scene keeps its previous models and the error is returned.
    pub async fn load_model<F: AssetFetcher>(
        &mut self,
        env: &LoadEnv<'_, F>,
        dir: &str,
        file: &str,
    ) -> Result<&mut AvatarModel, LoadError> {
        self.current_dir = dir.to_string();
        self.setup_view();

        let base = format!("{}{dir}/", self.config.resources_path);
        let mut model = AvatarModel::new(Arc::clone(&self.config), Arc::clone(&self.ids));
        model.load_assets(env, &base, file).await?;

        self.models.push(model);
        self.scene_index = self.models.len() - 1;
        log::info!("scene: {dir} is model {}", self.scene_index);
        Ok(&mut self.models[self.scene_index])
    }

    /// Advance every loaded model.
    pub fn update(&mut self, dt: f32) {
        for m in &mut self.models {
            m.update(dt);
        }
    }

    /// Draw the current model with the view transform.
    pub fn draw(&mut self) {
        let view = *self.view.matrix();
        if let Some(m) = self.models.get_mut(self.scene_index) {
            m.draw(&view);
        }
    }

    pub fn set_render_state(&mut self, viewport: [u32; 4]) {
        if let Some(m) = self.models.get_mut(self.scene_index) {
            m.set_render_state(viewport);
        }
    }

    /// Re-derive the view after the surface changed size.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        log::debug!("scene: resize to {width}x{height}");
        self.setup_view();
    }

    pub fn release(&mut self) {
        for m in &mut self.models {
            m.release();
        }
        self.models.clear();
        self.scene_index = 0;
    }

    pub fn current_model(&self) -> Option<&AvatarModel> {
        self.models.get(self.scene_index)
    }

    pub fn current_model_mut(&mut self) -> Option<&mut AvatarModel> {
        self.models.get_mut(self.scene_index)
    }

    pub fn model(&self, index: usize) -> Option<&AvatarModel> {
        self.models.get(index)
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn view(&self) -> &ViewMatrix {
        &self.view
    }

    pub fn current_dir(&self) -> &str {
        &self.current_dir
    }
}
