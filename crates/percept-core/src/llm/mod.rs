//! LLM inference: engine lifecycle plus the session layer.
//!
//! Unlike the one-shot task adapters, a loaded LLM engine spawns multiple
//! independent sessions, each carrying its own sampling configuration and
//! conversation state. The engine handle itself still lives in a single-slot
//! [`ModuleCache`]; sessions hold `Arc` clones of it.
//!
//! [`ModuleCache`]: crate::module::ModuleCache

mod session;

pub use session::{
    GenerationResult, GenerationStats, LlmSession, PromptTemplates, SessionConfig,
    SessionOptions,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LlmDefaults;
use crate::engine::{EngineFactory, EngineModule};
use crate::error::Result;
use crate::fetch::{FileResolver, FileSource};
use crate::media::{ImageFrame, MediaDecoder};
use crate::module::ModuleCache;
use crate::tasks::options::Delegate;

/// Engine-level LLM options. Session-level knobs (sampling, templates) live
/// in [`SessionOptions`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LlmOptions {
    /// Combined prompt-plus-response token budget per session.
    pub max_tokens: Option<u32>,
    /// Images accepted per prompt when vision modality is enabled.
    pub max_num_images: Option<u32>,
    pub delegate: Option<Delegate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub max_tokens: u32,
    pub max_num_images: u32,
    pub delegate: Delegate,
}

impl LlmOptions {
    pub fn resolved(&self) -> LlmConfig {
        LlmConfig {
            max_tokens: self.max_tokens.unwrap_or(LlmDefaults::MAX_TOKENS),
            max_num_images: self.max_num_images.unwrap_or(LlmDefaults::MAX_NUM_IMAGES),
            delegate: self.delegate.unwrap_or_default(),
        }
    }
}

/// What an LLM engine returns from one full generation.
#[derive(Debug, Clone)]
pub struct NativeGeneration {
    pub text: String,
    pub prompt_token_count: u32,
    pub generation_token_count: u32,
}

/// A loaded LLM engine capable of spawning session handles.
#[async_trait]
pub trait LlmEngineModule: EngineModule {
    type Session: LlmSessionHandle;

    async fn new_session(&self, config: &SessionConfig) -> Result<Self::Session>;
}

/// One native conversation handle.
#[async_trait]
pub trait LlmSessionHandle: Send + Sync + 'static {
    async fn add_text(&self, text: &str) -> Result<()>;

    async fn add_image(&self, frame: &ImageFrame) -> Result<()>;

    /// One full, non-streaming generation from everything added so far.
    async fn generate(&self) -> Result<NativeGeneration>;

    /// Duplicate this handle's configuration and conversation state into an
    /// independent handle.
    async fn clone_handle(&self) -> Result<Self>
    where
        Self: Sized;

    async fn release(&self) -> Result<()>;
}

/// LLM task adapter: engine lifecycle plus session creation.
pub struct LlmEngine<F>
where
    F: EngineFactory<LlmConfig>,
    F::Module: LlmEngineModule,
{
    module: ModuleCache<F::Module, LlmOptions>,
    resolver: Arc<FileResolver>,
    factory: Arc<F>,
    decoder: Arc<dyn MediaDecoder>,
}

impl<F> LlmEngine<F>
where
    F: EngineFactory<LlmConfig>,
    F::Module: LlmEngineModule,
{
    const TASK: &'static str = "LlmInference";

    pub fn new(
        resolver: Arc<FileResolver>,
        factory: Arc<F>,
        decoder: Arc<dyn MediaDecoder>,
    ) -> Self {
        Self {
            module: ModuleCache::new(Self::TASK),
            resolver,
            factory,
            decoder,
        }
    }

    /// Load (or reuse) the LLM described by `source`.
    pub async fn initialize(&self, source: FileSource, options: LlmOptions) -> Result<()> {
        let factory = self.factory.clone();
        self.module
            .initialize_with_caching(&self.resolver, source, options, move |path, options| {
                async move {
                    factory
                        .create_from_options(&path, &options.resolved())
                        .await
                }
            })
            .await
    }

    /// Release the loaded engine. Sessions already spawned keep their own
    /// engine references; callers should close them first.
    pub async fn unload(&self) {
        self.module.unload().await;
    }

    /// Spawn an independent session from the loaded engine.
    pub async fn create_session(
        &self,
        options: SessionOptions,
    ) -> Result<LlmSession<F::Module>> {
        let engine = self.module.require_module().await?;
        LlmSession::create(
            engine,
            self.resolver.clone(),
            self.decoder.clone(),
            options,
        )
        .await
    }
}
