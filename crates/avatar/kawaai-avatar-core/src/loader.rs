//! Asset loading for [`AvatarModel`].
//!
//! Steps run strictly in order; each depends on the previous one:
//! 1. manifest
//! 2. rig (fatal when undeclared or undecodable)
//! 3. renderer creation, 4. renderer start-up on the active context
//! 5. textures: fetched concurrently, decoded and uploaded in manifest order
//! 6. expressions (recoverable per file)
//! 7. physics and pose (optional, fatal when declared but broken)
//! 8. motions (recoverable per file), keyed `{group}_{index}`
//! 9. baseline snapshot, 10. standard ids, 11. breathing
//! 12. eye-blink / lip-sync bindings, 13. eye blink
//! 14. model matrix, 15. deferred idle start

use futures::future::try_join_all;

use crate::effects::{Breath, EyeBlink, Pose};
use crate::error::{FetchError, LoadError, RendererError};
use crate::fetch::{join, AssetFetcher};
use crate::ids::{ParamId, StandardIds};
use crate::manifest::{motion_key, ModelManifest};
use crate::model::{seeded_rng, AvatarModel};
use crate::motion::{ExpressionClip, MotionClip};
use crate::params::ParameterBuffer;
use crate::physics::PhysicsRig;
use crate::renderer::RendererFactory;
use crate::rig::RigDecoder;
use crate::surface::ContextHandle;
use crate::texture;
use crate::view::ModelMatrix;

/// Collaborators a load needs.
pub struct LoadEnv<'a, F> {
    pub fetcher: &'a F,
    pub decoder: &'a dyn RigDecoder,
    pub renderers: &'a dyn RendererFactory,
    /// Active graphics context; the renderer cannot start without one.
    pub context: Option<ContextHandle>,
}

impl<F> Clone for LoadEnv<'_, F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher,
            decoder: self.decoder,
            renderers: self.renderers,
            context: self.context.clone(),
        }
    }
}

fn fetch_err(what: &'static str) -> impl FnOnce(FetchError) -> LoadError {
    move |source| LoadError::Fetch { what, source }
}

impl AvatarModel {
    /// Load `{base_dir}{manifest_file}` and everything it references.
    ///
    /// On error every resource created so far is released and the model stays
    /// not ready.
    pub async fn load_assets<F: AssetFetcher>(
        &mut self,
        env: &LoadEnv<'_, F>,
        base_dir: &str,
        manifest_file: &str,
    ) -> Result<(), LoadError> {
        if self.ready {
            self.release();
        }
        match self.load_inner(env, base_dir, manifest_file).await {
            Ok(()) => {
                self.ready = true;
                log::info!(
                    "loaded {base_dir}{manifest_file}: {} textures, {} motions, {} expressions",
                    self.textures.len(),
                    self.motions.len(),
                    self.expressions.len()
                );
                Ok(())
            }
            Err(e) => {
                log::error!("failed to load {base_dir}{manifest_file}: {e}");
                self.release();
                self.manifest = None;
                self.rig = None;
                Err(e)
            }
        }
    }

    async fn load_inner<F: AssetFetcher>(
        &mut self,
        env: &LoadEnv<'_, F>,
        base_dir: &str,
        manifest_file: &str,
    ) -> Result<(), LoadError> {
        let fetcher = env.fetcher;

        // 1) Manifest
        let bytes = fetcher
            .fetch(&join(base_dir, manifest_file))
            .await
            .map_err(fetch_err("manifest"))?;
        let manifest = ModelManifest::from_slice(&bytes).map_err(LoadError::Manifest)?;

        // 2) Rig
        let rig_file = manifest.rig_file().ok_or(LoadError::MissingRig)?;
        let bytes = fetcher
            .fetch(&join(base_dir, rig_file))
            .await
            .map_err(fetch_err("rig"))?;
        let rig = env.decoder.decode(&bytes).map_err(LoadError::RigDecode)?;
        self.params = ParameterBuffer::from_rig(&rig, &self.ids);
        log::debug!(
            "rig {rig_file}: {} parameters, {} parts",
            rig.parameters.len(),
            rig.parts.len()
        );

        // 3) + 4) Renderer
        let mut renderer = env.renderers.create(&rig);
        let ctx = env
            .context
            .clone()
            .ok_or(LoadError::RendererUnavailable(RendererError::NoContext))?;
        renderer
            .start_up(ctx.clone())
            .map_err(LoadError::RendererUnavailable)?;
        self.renderer = Some(renderer);
        self.context = Some(ctx.clone());

        // 5) Textures
        self.load_textures(fetcher, base_dir, &manifest, &ctx).await?;

        // 6) Expressions
        for e in manifest.expressions() {
            let bytes = match fetcher.fetch(&join(base_dir, &e.file)).await {
                Ok(b) => b,
                Err(err) => {
                    log::warn!("skipping expression {}: {err}", e.name);
                    continue;
                }
            };
            match ExpressionClip::parse(&e.name, &bytes, &self.ids) {
                Ok(clip) => {
                    self.register_expression(&e.name, clip);
                }
                Err(err) => log::warn!("skipping expression {}: {err}", e.name),
            }
        }

        // 7) Physics and pose
        if let Some(file) = manifest.physics_file() {
            let bytes = fetcher
                .fetch(&join(base_dir, file))
                .await
                .map_err(fetch_err("physics"))?;
            self.physics = Some(PhysicsRig::parse(&bytes, &self.ids).map_err(LoadError::Physics)?);
        }
        if let Some(file) = manifest.pose_file() {
            let bytes = fetcher
                .fetch(&join(base_dir, file))
                .await
                .map_err(fetch_err("pose"))?;
            self.pose =
                Some(Pose::parse(&bytes, &self.ids, &mut self.params).map_err(LoadError::Pose)?);
        }

        // Effect bindings are needed by the motions below.
        let intern = |names: &[String]| -> Vec<ParamId> {
            names.iter().map(|n| self.ids.get(n)).collect()
        };
        let eye_blink_ids = intern(manifest.eye_blink_ids());
        let lip_sync_ids = intern(manifest.lip_sync_ids());

        // 8) Motions
        for (group, refs) in manifest.motion_groups() {
            for (i, r) in refs.iter().enumerate() {
                let key = motion_key(group, i);
                let bytes = match fetcher.fetch(&join(base_dir, &r.file)).await {
                    Ok(b) => b,
                    Err(err) => {
                        log::warn!("skipping motion {key}: {err}");
                        continue;
                    }
                };
                let mut clip = match MotionClip::parse(&key, &bytes, &self.ids) {
                    Ok(c) => c,
                    Err(err) => {
                        log::warn!("skipping motion {key}: {err}");
                        continue;
                    }
                };
                if let Some(v) = r.fade_in() {
                    clip.set_fade_in(v);
                }
                if let Some(v) = r.fade_out() {
                    clip.set_fade_out(v);
                }
                clip.set_effect_ids(&eye_blink_ids, &lip_sync_ids);
                log::debug!("motion {key} <- {}", r.file);
                self.motions.insert(key, std::sync::Arc::new(clip));
            }
        }

        // 9) Baseline
        self.params.save();

        // 10) + 11) Standard ids and breathing
        self.standard_ids = Some(StandardIds::resolve(&self.ids));
        self.breath = Some(Breath::new(&self.config.breath, &self.ids));

        // 12) + 13) Eye blink and lip sync
        self.eye_blink = Some(EyeBlink::new(
            eye_blink_ids.clone(),
            seeded_rng(self.config.rng_seed, 1),
        ));
        self.eye_blink_ids = eye_blink_ids;
        self.lip_sync_ids = lip_sync_ids;

        // 14) Model matrix
        let mut mm = ModelMatrix::new(rig.canvas.width, rig.canvas.height);
        mm.center_on_canvas_width();
        self.model_matrix = mm;

        // 15) Deferred idle start
        let idle = &self.config.idle_group;
        let has_idle =
            (0..manifest.motion_count(idle)).any(|i| self.motions.contains_key(&motion_key(idle, i)));
        if has_idle {
            self.idle_countdown = Some(self.config.idle_start_delay_secs);
        } else {
            log::warn!("no '{idle}' motion loaded, character stays static");
        }

        self.rig = Some(rig);
        self.manifest = Some(manifest);
        Ok(())
    }

    async fn load_textures<F: AssetFetcher>(
        &mut self,
        fetcher: &F,
        base_dir: &str,
        manifest: &ModelManifest,
        ctx: &ContextHandle,
    ) -> Result<(), LoadError> {
        // Blank slots stay unbound; the rest keep their manifest index.
        let slots: Vec<(usize, &String)> = manifest
            .textures()
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_empty())
            .collect();
        let fetches = slots.iter().map(|(_, p)| {
            let full = join(base_dir, p);
            async move { fetcher.fetch(&full).await.map_err(fetch_err("texture")) }
        });
        let images = try_join_all(fetches).await?;

        for (bytes, (index, path)) in images.into_iter().zip(slots) {
            let img = texture::decode_rgba(&bytes).map_err(|source| LoadError::TextureDecode {
                index,
                path: path.clone(),
                source,
            })?;
            let id = texture::upload(ctx.as_ref(), &img).map_err(|source| {
                LoadError::TextureUpload {
                    index,
                    path: path.clone(),
                    source,
                }
            })?;
            self.textures.push(id);
            if let Some(r) = self.renderer.as_mut() {
                r.bind_texture(index, id);
            }
            log::debug!("texture {index} <- {path} ({}x{})", img.width(), img.height());
        }
        if let Some(r) = self.renderer.as_mut() {
            r.set_premultiplied_alpha(true);
        }
        Ok(())
    }
}
