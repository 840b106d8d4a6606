//! Integration tests for module lifecycle, task adapters, and LLM sessions.
//!
//! Engines are mocked at the collaborator boundary; everything else —
//! resolver, module cache, adapters, sessions — is the real thing running
//! against temp directories.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use percept_library::engine::{
    EngineFactory, EngineModule, ImageClassifierEngine, ImageSegmenterEngine, NativeCategory,
    NativeMask, TextClassifierEngine,
};
use percept_library::llm::{
    LlmConfig, LlmEngine, LlmEngineModule, LlmOptions, LlmSessionHandle, NativeGeneration,
    SessionConfig, SessionOptions,
};
use percept_library::tasks::options::{ClassifierConfig, ClassifierOptions, SegmenterConfig, SegmenterOptions};
use percept_library::{
    AudioBuffer, FileResolver, FileSource, ImageClassifier, ImageFrame, ImageSegmenter,
    MediaDecoder, PerceptError, Result, TextClassifier,
};

// ---------------------------------------------------------------------------
// Test environment
// ---------------------------------------------------------------------------

struct TestEnv {
    _bundle: TempDir,
    _cache: TempDir,
    resolver: Arc<FileResolver>,
}

fn test_env() -> TestEnv {
    // Readable logs under `RUST_LOG=debug cargo test`.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let bundle = TempDir::new().expect("Failed to create bundle dir");
    let cache = TempDir::new().expect("Failed to create cache dir");
    std::fs::write(bundle.path().join("model.tflite"), b"model-weights").unwrap();
    std::fs::write(bundle.path().join("photo.jpg"), b"not-really-a-jpeg").unwrap();

    let resolver = FileResolver::new(cache.path())
        .unwrap()
        .with_bundle_root(bundle.path());
    TestEnv {
        _bundle: bundle,
        _cache: cache,
        resolver: Arc::new(resolver),
    }
}

// ---------------------------------------------------------------------------
// Mock decoder
// ---------------------------------------------------------------------------

struct FixedDecoder {
    width: u32,
    height: u32,
}

#[async_trait]
impl MediaDecoder for FixedDecoder {
    async fn decode_image(&self, _path: &Path) -> Result<ImageFrame> {
        Ok(ImageFrame {
            width: self.width,
            height: self.height,
            channels: 3,
            pixels: vec![0; (self.width * self.height * 3) as usize],
        })
    }

    async fn decode_audio(&self, _path: &Path) -> Result<AudioBuffer> {
        Ok(AudioBuffer {
            sample_rate: 16_000,
            channels: 1,
            samples: vec![0.0; 160],
        })
    }
}

// ---------------------------------------------------------------------------
// Mock text classifier engine
// ---------------------------------------------------------------------------

struct TextFactory {
    builds: AtomicUsize,
    releases: Arc<AtomicUsize>,
    fail_next: AtomicBool,
}

impl TextFactory {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            builds: AtomicUsize::new(0),
            releases: Arc::new(AtomicUsize::new(0)),
            fail_next: AtomicBool::new(false),
        })
    }
}

struct TextModule {
    max_results: i32,
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl EngineFactory<ClassifierConfig> for TextFactory {
    type Module = TextModule;

    async fn create_from_options(
        &self,
        model_path: &Path,
        config: &ClassifierConfig,
    ) -> Result<TextModule> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PerceptError::Other("bad model format".into()));
        }
        // The resolver must have produced a real file.
        assert!(model_path.exists());
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(TextModule {
            max_results: config.max_results,
            releases: self.releases.clone(),
        })
    }
}

#[async_trait]
impl EngineModule for TextModule {
    async fn release(&self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl TextClassifierEngine for TextModule {
    async fn classify(&self, _text: &str) -> Result<Vec<NativeCategory>> {
        // Deliberately not sorted by score; adapters must keep this order.
        let labels = ["news", "sports", "weather", "finance", "travel"];
        let mut categories: Vec<NativeCategory> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| NativeCategory {
                index: i as i32,
                score: 0.1 + 0.15 * (i as f32),
                label: label.to_string(),
                display_name: None,
            })
            .collect();
        if self.max_results >= 0 {
            categories.truncate(self.max_results as usize);
        }
        Ok(categories)
    }
}

// ---------------------------------------------------------------------------
// Mock image classifier / segmenter engines
// ---------------------------------------------------------------------------

struct ImageFactory {
    seen_dimensions: Arc<Mutex<Option<(u32, u32)>>>,
}

struct ImageModule {
    seen_dimensions: Arc<Mutex<Option<(u32, u32)>>>,
}

#[async_trait]
impl EngineFactory<ClassifierConfig> for ImageFactory {
    type Module = ImageModule;

    async fn create_from_options(
        &self,
        _model_path: &Path,
        _config: &ClassifierConfig,
    ) -> Result<ImageModule> {
        Ok(ImageModule {
            seen_dimensions: self.seen_dimensions.clone(),
        })
    }
}

#[async_trait]
impl EngineModule for ImageModule {
    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ImageClassifierEngine for ImageModule {
    async fn classify(&self, frame: &ImageFrame) -> Result<Vec<NativeCategory>> {
        *self.seen_dimensions.lock().unwrap() = Some((frame.width, frame.height));
        Ok(vec![NativeCategory {
            index: 0,
            score: 0.9,
            label: "cat".into(),
            display_name: None,
        }])
    }
}

struct SegmenterFactory;

struct SegmenterModule;

#[async_trait]
impl EngineFactory<SegmenterConfig> for SegmenterFactory {
    type Module = SegmenterModule;

    async fn create_from_options(
        &self,
        _model_path: &Path,
        _config: &SegmenterConfig,
    ) -> Result<SegmenterModule> {
        Ok(SegmenterModule)
    }
}

#[async_trait]
impl EngineModule for SegmenterModule {
    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ImageSegmenterEngine for SegmenterModule {
    async fn segment(&self, _frame: &ImageFrame) -> Result<Vec<NativeMask>> {
        Ok(vec![NativeMask {
            width: 4,
            height: 2,
            pixels: vec![0, 0, 1, 1, 1, 1, 0, 0],
        }])
    }
}

// ---------------------------------------------------------------------------
// Mock LLM engine
// ---------------------------------------------------------------------------

struct LlmFactory {
    session_releases: Arc<AtomicUsize>,
    fail_session_creation: Arc<AtomicBool>,
}

impl LlmFactory {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            session_releases: Arc::new(AtomicUsize::new(0)),
            fail_session_creation: Arc::new(AtomicBool::new(false)),
        })
    }
}

struct MockLlm {
    session_releases: Arc<AtomicUsize>,
    fail_session_creation: Arc<AtomicBool>,
}

#[async_trait]
impl EngineFactory<LlmConfig> for LlmFactory {
    type Module = MockLlm;

    async fn create_from_options(
        &self,
        _model_path: &Path,
        _config: &LlmConfig,
    ) -> Result<MockLlm> {
        Ok(MockLlm {
            session_releases: self.session_releases.clone(),
            fail_session_creation: self.fail_session_creation.clone(),
        })
    }
}

#[async_trait]
impl EngineModule for MockLlm {
    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl LlmEngineModule for MockLlm {
    type Session = MockLlmSession;

    async fn new_session(&self, config: &SessionConfig) -> Result<MockLlmSession> {
        if self.fail_session_creation.load(Ordering::SeqCst) {
            return Err(PerceptError::Other("engine out of memory".into()));
        }
        Ok(MockLlmSession {
            temperature: config.temperature,
            transcript: Mutex::new(Vec::new()),
            images: AtomicUsize::new(0),
            releases: self.session_releases.clone(),
        })
    }
}

struct MockLlmSession {
    temperature: f32,
    transcript: Mutex<Vec<String>>,
    images: AtomicUsize,
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl LlmSessionHandle for MockLlmSession {
    async fn add_text(&self, text: &str) -> Result<()> {
        self.transcript.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn add_image(&self, _frame: &ImageFrame) -> Result<()> {
        self.images.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn generate(&self) -> Result<NativeGeneration> {
        let transcript = self.transcript.lock().unwrap();
        Ok(NativeGeneration {
            text: format!("echo[t={}]: {}", self.temperature, transcript.join(" ")),
            prompt_token_count: transcript.len() as u32,
            generation_token_count: 1,
        })
    }

    async fn clone_handle(&self) -> Result<MockLlmSession> {
        Ok(MockLlmSession {
            temperature: self.temperature,
            transcript: Mutex::new(self.transcript.lock().unwrap().clone()),
            images: AtomicUsize::new(self.images.load(Ordering::SeqCst)),
            releases: self.releases.clone(),
        })
    }

    async fn release(&self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn llm_engine(env: &TestEnv, factory: Arc<LlmFactory>) -> LlmEngine<LlmFactory> {
    LlmEngine::new(
        env.resolver.clone(),
        factory,
        Arc::new(FixedDecoder {
            width: 64,
            height: 64,
        }),
    )
}

// ---------------------------------------------------------------------------
// Module lifecycle properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_idempotent_reinitialization() {
    let env = test_env();
    let factory = TextFactory::new();
    let classifier = TextClassifier::new(env.resolver.clone(), factory.clone());

    let source = FileSource::bundle("model.tflite");
    let options = ClassifierOptions {
        max_results: Some(3),
        ..Default::default()
    };

    classifier
        .initialize(source.clone(), options.clone())
        .await
        .unwrap();

    // Delete the cached model file: if the second initialize touched the
    // resolver it would have to recreate it.
    let cached = env.resolver.cache_root().join("models").join("model.tflite");
    std::fs::remove_file(&cached).unwrap();

    classifier.initialize(source, options).await.unwrap();

    assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
    assert!(!cached.exists());
}

#[tokio::test]
async fn test_cache_invalidation_on_option_change() {
    let env = test_env();
    let factory = TextFactory::new();
    let classifier = TextClassifier::new(env.resolver.clone(), factory.clone());

    let source = FileSource::bundle("model.tflite");
    classifier
        .initialize(
            source.clone(),
            ClassifierOptions {
                score_threshold: Some(0.3),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    classifier
        .initialize(
            source,
            ClassifierOptions {
                score_threshold: Some(0.6),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
    assert_eq!(factory.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_factory_failure_leaves_adapter_uninitialized() {
    let env = test_env();
    let factory = TextFactory::new();
    let classifier = TextClassifier::new(env.resolver.clone(), factory.clone());

    factory.fail_next.store(true, Ordering::SeqCst);
    let err = classifier
        .initialize(FileSource::bundle("model.tflite"), Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PerceptError::InitializationFailed { .. }));

    let err = classifier.classify("hello").await.unwrap_err();
    assert!(matches!(
        err,
        PerceptError::NotInitialized {
            task: "TextClassifier"
        }
    ));

    // A later initialize starts clean.
    classifier
        .initialize(FileSource::bundle("model.tflite"), Default::default())
        .await
        .unwrap();
    assert!(classifier.classify("hello").await.is_ok());
}

#[tokio::test]
async fn test_end_to_end_bundle_scenario() {
    let env = test_env();
    let factory = TextFactory::new();
    let classifier = TextClassifier::new(env.resolver.clone(), factory.clone());

    let source = FileSource::bundle("model.tflite");
    let options = ClassifierOptions {
        max_results: Some(3),
        ..Default::default()
    };

    classifier
        .initialize(source.clone(), options.clone())
        .await
        .unwrap();
    classifier.initialize(source, options).await.unwrap();
    assert_eq!(factory.builds.load(Ordering::SeqCst), 1);

    let result = classifier.classify("hello").await.unwrap();
    assert!(result.categories.len() <= 3);
    // Engine order preserved, not score order.
    let names: Vec<_> = result
        .categories
        .iter()
        .map(|c| c.category_name.as_str())
        .collect();
    assert_eq!(names, vec!["news", "sports", "weather"]);

    classifier.unload().await;
    assert_eq!(factory.releases.load(Ordering::SeqCst), 1);
    let err = classifier.classify("hello").await.unwrap_err();
    assert!(matches!(err, PerceptError::NotInitialized { .. }));
}

// ---------------------------------------------------------------------------
// Vision adapters
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_image_classifier_downscales_oversized_frames() {
    let env = test_env();
    let seen = Arc::new(Mutex::new(None));
    let classifier = ImageClassifier::new(
        env.resolver.clone(),
        Arc::new(ImageFactory {
            seen_dimensions: seen.clone(),
        }),
        Arc::new(FixedDecoder {
            width: 4096,
            height: 2048,
        }),
    );

    classifier
        .initialize(FileSource::bundle("model.tflite"), Default::default())
        .await
        .unwrap();
    let result = classifier
        .classify(&FileSource::bundle("photo.jpg"))
        .await
        .unwrap();

    assert_eq!(result.categories[0].category_name, "cat");
    // 4096x2048 subsampled with stride 4.
    assert_eq!(*seen.lock().unwrap(), Some((1024, 512)));
}

#[tokio::test]
async fn test_segmenter_writes_masks_to_disk() {
    let env = test_env();
    let segmenter = ImageSegmenter::new(
        env.resolver.clone(),
        Arc::new(SegmenterFactory),
        Arc::new(FixedDecoder {
            width: 64,
            height: 64,
        }),
    );

    segmenter
        .initialize(
            FileSource::bundle("model.tflite"),
            SegmenterOptions::default(),
        )
        .await
        .unwrap();
    let result = segmenter
        .segment(&FileSource::bundle("photo.jpg"))
        .await
        .unwrap();

    assert_eq!(result.masks.len(), 1);
    let mask = &result.masks[0];
    assert_eq!((mask.width, mask.height), (4, 2));
    assert!(mask.path.starts_with(env.resolver.cache_root()));
    assert_eq!(
        std::fs::read(&mask.path).unwrap(),
        vec![0, 0, 1, 1, 1, 1, 0, 0]
    );
}

// ---------------------------------------------------------------------------
// LLM sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_session_generation_accumulates_chunks() {
    let env = test_env();
    let engine = llm_engine(&env, LlmFactory::new());
    engine
        .initialize(FileSource::bundle("model.tflite"), LlmOptions::default())
        .await
        .unwrap();

    let session = engine.create_session(SessionOptions::default()).await.unwrap();
    session.add_query_chunk("hello").await.unwrap();
    session.add_query_chunk("world").await.unwrap();

    let result = session.generate_response().await.unwrap();
    assert!(result.response.ends_with("hello world"));
    assert_eq!(result.stats.prompt_token_count, 2);
    assert_eq!(result.stats.generation_token_count, 1);
}

#[tokio::test]
async fn test_session_isolation_after_clone_close() {
    let env = test_env();
    let factory = LlmFactory::new();
    let engine = llm_engine(&env, factory.clone());
    engine
        .initialize(FileSource::bundle("model.tflite"), LlmOptions::default())
        .await
        .unwrap();

    let original = engine.create_session(SessionOptions::default()).await.unwrap();
    original.add_query_chunk("shared history").await.unwrap();

    let clone = original.clone_session().await.unwrap();
    assert_ne!(original.id(), clone.id());
    clone.close().await.unwrap();
    assert_eq!(factory.session_releases.load(Ordering::SeqCst), 1);

    // The original stays usable, history intact.
    let result = original.generate_response().await.unwrap();
    assert!(result.response.ends_with("shared history"));
}

#[tokio::test]
async fn test_operations_fail_after_close() {
    let env = test_env();
    let engine = llm_engine(&env, LlmFactory::new());
    engine
        .initialize(FileSource::bundle("model.tflite"), LlmOptions::default())
        .await
        .unwrap();

    let session = engine.create_session(SessionOptions::default()).await.unwrap();
    session.close().await.unwrap();

    assert!(matches!(
        session.add_query_chunk("hi").await.unwrap_err(),
        PerceptError::SessionClosed { .. }
    ));
    assert!(matches!(
        session.generate_response().await.unwrap_err(),
        PerceptError::SessionClosed { .. }
    ));
    assert!(matches!(
        session.clone_session().await.unwrap_err(),
        PerceptError::SessionClosed { .. }
    ));
    assert!(matches!(
        session.update_options(SessionOptions::default()).await.unwrap_err(),
        PerceptError::SessionClosed { .. }
    ));
    assert!(matches!(
        session.close().await.unwrap_err(),
        PerceptError::SessionClosed { .. }
    ));
}

#[tokio::test]
async fn test_update_options_rebuilds_and_replays() {
    let env = test_env();
    let factory = LlmFactory::new();
    let engine = llm_engine(&env, factory.clone());
    engine
        .initialize(FileSource::bundle("model.tflite"), LlmOptions::default())
        .await
        .unwrap();

    let session = engine
        .create_session(SessionOptions {
            temperature: Some(0.2),
            ..Default::default()
        })
        .await
        .unwrap();
    session.add_query_chunk("remember me").await.unwrap();

    session
        .update_options(SessionOptions {
            temperature: Some(0.9),
            ..Default::default()
        })
        .await
        .unwrap();

    // Old handle released exactly once; new handle saw the replayed chunk
    // and the new temperature.
    assert_eq!(factory.session_releases.load(Ordering::SeqCst), 1);
    let result = session.generate_response().await.unwrap();
    assert!(result.response.starts_with("echo[t=0.9]"));
    assert!(result.response.ends_with("remember me"));
}

#[tokio::test]
async fn test_update_options_failure_closes_session() {
    let env = test_env();
    let factory = LlmFactory::new();
    let engine = llm_engine(&env, factory.clone());
    engine
        .initialize(FileSource::bundle("model.tflite"), LlmOptions::default())
        .await
        .unwrap();

    let session = engine.create_session(SessionOptions::default()).await.unwrap();
    factory.fail_session_creation.store(true, Ordering::SeqCst);

    let err = session
        .update_options(SessionOptions {
            temperature: Some(0.5),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PerceptError::InitializationFailed { .. }));

    // The old handle is gone; the session must not look open.
    assert!(matches!(
        session.generate_response().await.unwrap_err(),
        PerceptError::SessionClosed { .. }
    ));
}

#[tokio::test]
async fn test_add_image_requires_vision_modality() {
    let env = test_env();
    let engine = llm_engine(&env, LlmFactory::new());
    engine
        .initialize(FileSource::bundle("model.tflite"), LlmOptions::default())
        .await
        .unwrap();

    let session = engine.create_session(SessionOptions::default()).await.unwrap();
    let err = session
        .add_image(&FileSource::bundle("photo.jpg"))
        .await
        .unwrap_err();
    assert!(matches!(err, PerceptError::VisionModalityDisabled { .. }));

    let vision_session = engine
        .create_session(SessionOptions {
            enable_vision_modality: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    vision_session
        .add_image(&FileSource::bundle("photo.jpg"))
        .await
        .unwrap();
}
