//! LLM sessions: incremental prompt construction and generation.
//!
//! A session is Open until closed, and Closed is terminal. The underlying
//! engine does not expose partial reconfiguration, so `update_options` is a
//! full rebuild: release the old handle, create a new one, replay the
//! accumulated prompt chunks into it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::SessionDefaults;
use crate::error::{PerceptError, Result};
use crate::fetch::{CachePurpose, FileResolver, FileSource};
use crate::media::{ImageFrame, MediaDecoder};

use super::{LlmEngineModule, LlmSessionHandle};

const SESSION_TASK: &str = "LlmSession";

/// Prompt template strings wrapped around each turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PromptTemplates {
    pub user_prefix: String,
    pub user_suffix: String,
    pub model_prefix: String,
    pub model_suffix: String,
    pub system_prefix: String,
    pub system_suffix: String,
}

/// Per-session options. Compared structurally; every field optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionOptions {
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub random_seed: Option<u64>,
    pub prompt_templates: Option<PromptTemplates>,
    /// Optional LoRA adapter applied on top of the base model.
    pub lora: Option<FileSource>,
    /// Enables image input for this session.
    pub enable_vision_modality: Option<bool>,
}

/// Fully-populated session configuration handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub random_seed: u64,
    pub prompt_templates: PromptTemplates,
    pub lora_path: Option<PathBuf>,
    pub enable_vision_modality: bool,
}

impl SessionOptions {
    /// Pure options-to-config mapping; the LoRA source must already be
    /// resolved by the caller.
    pub(crate) fn resolved(&self, lora_path: Option<PathBuf>) -> SessionConfig {
        SessionConfig {
            temperature: self.temperature.unwrap_or(SessionDefaults::TEMPERATURE),
            top_k: self.top_k.unwrap_or(SessionDefaults::TOP_K),
            top_p: self.top_p.unwrap_or(SessionDefaults::TOP_P),
            random_seed: self.random_seed.unwrap_or(SessionDefaults::RANDOM_SEED),
            prompt_templates: self.prompt_templates.clone().unwrap_or_default(),
            lora_path,
            enable_vision_modality: self.enable_vision_modality.unwrap_or(false),
        }
    }
}

/// Token and latency statistics for one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub prompt_token_count: u32,
    pub generation_token_count: u32,
    pub latency_ms: u64,
}

/// One completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub response: String,
    pub stats: GenerationStats,
}

/// Prompt pieces accumulated since session creation, kept for replay when
/// the underlying handle is rebuilt.
#[derive(Clone)]
enum Chunk {
    Text(String),
    Image(ImageFrame),
}

struct OpenState<S> {
    handle: S,
    options: SessionOptions,
    config: SessionConfig,
    chunks: Vec<Chunk>,
}

enum SessionState<S> {
    Open(OpenState<S>),
    Closed,
}

/// A mutable, closeable conversation spawned from a loaded LLM engine.
pub struct LlmSession<E: LlmEngineModule> {
    id: String,
    engine: Arc<E>,
    resolver: Arc<FileResolver>,
    decoder: Arc<dyn MediaDecoder>,
    state: Mutex<SessionState<E::Session>>,
}

impl<E: LlmEngineModule> std::fmt::Debug for LlmSession<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSession").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<E: LlmEngineModule> LlmSession<E> {
    pub(super) async fn create(
        engine: Arc<E>,
        resolver: Arc<FileResolver>,
        decoder: Arc<dyn MediaDecoder>,
        options: SessionOptions,
    ) -> Result<Self> {
        let config = resolve_config(&resolver, &options).await?;
        let handle = engine
            .new_session(&config)
            .await
            .map_err(|e| PerceptError::init_failed(SESSION_TASK, e))?;

        let id = uuid::Uuid::new_v4().to_string();
        debug!("{}: created session {}", SESSION_TASK, id);
        Ok(Self {
            id,
            engine,
            resolver,
            decoder,
            state: Mutex::new(SessionState::Open(OpenState {
                handle,
                options,
                config,
                chunks: Vec::new(),
            })),
        })
    }

    /// Unique identifier of this session.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append text to the pending prompt. No inference happens here.
    pub async fn add_query_chunk(&self, text: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let open = self.require_open(&mut state)?;
        open.handle
            .add_text(text)
            .await
            .map_err(|e| PerceptError::inference(SESSION_TASK, e))?;
        open.chunks.push(Chunk::Text(text.to_string()));
        Ok(())
    }

    /// Decode the referenced image and attach it to the pending prompt.
    /// Fails unless the session was created with vision modality enabled.
    pub async fn add_image(&self, image: &FileSource) -> Result<()> {
        let mut state = self.state.lock().await;
        let open = self.require_open(&mut state)?;
        if !open.config.enable_vision_modality {
            return Err(PerceptError::VisionModalityDisabled {
                id: self.id.clone(),
            });
        }

        let path = self.resolver.resolve(image, CachePurpose::Assets).await?;
        let frame = self
            .decoder
            .decode_image(&path)
            .await
            .map_err(|e| PerceptError::inference(SESSION_TASK, e))?
            .normalized();

        open.handle
            .add_image(&frame)
            .await
            .map_err(|e| PerceptError::inference(SESSION_TASK, e))?;
        open.chunks.push(Chunk::Image(frame));
        Ok(())
    }

    /// Run one full generation from the accumulated prompt.
    pub async fn generate_response(&self) -> Result<GenerationResult> {
        let mut state = self.state.lock().await;
        let open = self.require_open(&mut state)?;

        let started = Instant::now();
        let native = open
            .handle
            .generate()
            .await
            .map_err(|e| PerceptError::inference(SESSION_TASK, e))?;

        Ok(GenerationResult {
            response: native.text,
            stats: GenerationStats {
                prompt_token_count: native.prompt_token_count,
                generation_token_count: native.generation_token_count,
                latency_ms: started.elapsed().as_millis() as u64,
            },
        })
    }

    /// Duplicate this session into an independent one: same configuration,
    /// same conversation state, separate underlying handle.
    pub async fn clone_session(&self) -> Result<LlmSession<E>> {
        let mut state = self.state.lock().await;
        let open = self.require_open(&mut state)?;

        let handle = open
            .handle
            .clone_handle()
            .await
            .map_err(|e| PerceptError::init_failed(SESSION_TASK, e))?;

        let id = uuid::Uuid::new_v4().to_string();
        debug!("{}: cloned session {} into {}", SESSION_TASK, self.id, id);
        Ok(LlmSession {
            id,
            engine: self.engine.clone(),
            resolver: self.resolver.clone(),
            decoder: self.decoder.clone(),
            state: Mutex::new(SessionState::Open(OpenState {
                handle,
                options: open.options.clone(),
                config: open.config.clone(),
                chunks: open.chunks.clone(),
            })),
        })
    }

    /// Rebuild the underlying handle with new options.
    ///
    /// The engine offers no partial reconfiguration, so this is a full
    /// recreation: the old handle is released first, a fresh one is built,
    /// and the accumulated prompt chunks are replayed into it. If any step
    /// of the rebuild fails the session ends up Closed, since the old handle
    /// is already gone and a half-rebuilt session must not look Open.
    pub async fn update_options(&self, options: SessionOptions) -> Result<()> {
        let mut state = self.state.lock().await;
        let previous = match std::mem::replace(&mut *state, SessionState::Closed) {
            SessionState::Open(open) => open,
            SessionState::Closed => {
                return Err(PerceptError::SessionClosed {
                    id: self.id.clone(),
                })
            }
        };

        if let Err(e) = previous.handle.release().await {
            warn!("{}: stale handle release failed (ignored): {}", SESSION_TASK, e);
        }

        let config = resolve_config(&self.resolver, &options).await?;
        let handle = self
            .engine
            .new_session(&config)
            .await
            .map_err(|e| PerceptError::init_failed(SESSION_TASK, e))?;

        for chunk in &previous.chunks {
            let replayed = match chunk {
                Chunk::Text(text) => handle.add_text(text).await,
                Chunk::Image(frame) => handle.add_image(frame).await,
            };
            if let Err(e) = replayed {
                if let Err(release_err) = handle.release().await {
                    warn!(
                        "{}: rebuilt handle release failed (ignored): {}",
                        SESSION_TASK, release_err
                    );
                }
                return Err(PerceptError::inference(SESSION_TASK, e));
            }
        }

        *state = SessionState::Open(OpenState {
            handle,
            options,
            config,
            chunks: previous.chunks,
        });
        Ok(())
    }

    /// Release the underlying handle. The session is unusable afterwards;
    /// every further call (including a second `close`) fails with
    /// [`PerceptError::SessionClosed`].
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, SessionState::Closed) {
            SessionState::Open(open) => {
                if let Err(e) = open.handle.release().await {
                    warn!("{}: release failed (ignored): {}", SESSION_TASK, e);
                }
                debug!("{}: closed session {}", SESSION_TASK, self.id);
                Ok(())
            }
            SessionState::Closed => Err(PerceptError::SessionClosed {
                id: self.id.clone(),
            }),
        }
    }

    fn require_open<'a>(
        &self,
        state: &'a mut SessionState<E::Session>,
    ) -> Result<&'a mut OpenState<E::Session>> {
        match state {
            SessionState::Open(open) => Ok(open),
            SessionState::Closed => Err(PerceptError::SessionClosed {
                id: self.id.clone(),
            }),
        }
    }
}

async fn resolve_config(
    resolver: &FileResolver,
    options: &SessionOptions,
) -> Result<SessionConfig> {
    let lora_path = match &options.lora {
        Some(source) => Some(resolver.resolve(source, CachePurpose::Models).await?),
        None => None,
    };
    Ok(options.resolved(lora_path))
}
