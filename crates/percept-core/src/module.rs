//! Single-slot module lifecycle cache.
//!
//! Each task adapter owns exactly one [`ModuleCache`]: at most one loaded
//! engine handle, together with the source descriptor and options it was
//! built from. Re-initializing with structurally equal parameters is a no-op
//! (the hot path under development-time hot reload); anything else releases
//! the old handle before building the new one.
//!
//! Initialize and unload on one cache are serialized by the cache's own
//! mutex. Inference runs on `Arc` clones handed out by [`require_module`],
//! so concurrent calls never contend on the slot lock. Release stays
//! explicit: callers must drain in-flight inference before unloading.
//!
//! [`require_module`]: ModuleCache::require_module

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::engine::EngineModule;
use crate::error::{PerceptError, Result};
use crate::fetch::{CachePurpose, FileResolver, FileSource};

struct Loaded<T, O> {
    handle: Arc<T>,
    source: FileSource,
    options: O,
}

/// At-most-one-loaded-module cache, generic over the engine handle type `T`
/// and the options type `O`.
pub struct ModuleCache<T, O> {
    task: &'static str,
    slot: Mutex<Option<Loaded<T, O>>>,
}

impl<T, O> ModuleCache<T, O>
where
    T: EngineModule,
    O: PartialEq + Clone + Send,
{
    /// Create an empty cache tagged with the owning task's name.
    pub fn new(task: &'static str) -> Self {
        Self {
            task,
            slot: Mutex::new(None),
        }
    }

    /// The task tag used in error messages.
    pub fn task(&self) -> &'static str {
        self.task
    }

    /// Initialize the module, reusing the loaded handle when `source` and
    /// `options` are structurally equal to the cached pair.
    ///
    /// On a miss: resolves the source, releases any previous handle, then
    /// invokes `factory` with the resolved path and options. A factory
    /// failure leaves the slot empty (a half-built handle is never stored)
    /// and surfaces as [`PerceptError::InitializationFailed`] carrying the
    /// task tag, as do resolution failures.
    pub async fn initialize_with_caching<F, Fut>(
        &self,
        resolver: &FileResolver,
        source: FileSource,
        options: O,
        factory: F,
    ) -> Result<()>
    where
        F: FnOnce(PathBuf, O) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(loaded) = slot.as_ref() {
            if loaded.source == source && loaded.options == options {
                debug!("{}: already initialized with identical parameters", self.task);
                return Ok(());
            }
        }

        let resolved = resolver
            .resolve(&source, CachePurpose::Models)
            .await
            .map_err(|e| PerceptError::init_failed(self.task, e))?;

        if let Some(previous) = slot.take() {
            info!("{}: releasing previous module before rebuild", self.task);
            release_quietly(self.task, &previous.handle).await;
        }

        let handle = match factory(resolved, options.clone()).await {
            Ok(handle) => handle,
            Err(e) => {
                // Slot stays empty; a later initialize starts clean.
                return Err(match e {
                    already @ PerceptError::InitializationFailed { .. } => already,
                    other => PerceptError::init_failed(self.task, other),
                });
            }
        };

        *slot = Some(Loaded {
            handle: Arc::new(handle),
            source,
            options,
        });
        info!("{}: module initialized", self.task);
        Ok(())
    }

    /// The cached handle, or [`PerceptError::NotInitialized`].
    pub async fn require_module(&self) -> Result<Arc<T>> {
        let slot = self.slot.lock().await;
        slot.as_ref()
            .map(|loaded| loaded.handle.clone())
            .ok_or(PerceptError::NotInitialized { task: self.task })
    }

    /// Whether a module is currently loaded.
    pub async fn is_initialized(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Release the cached handle and clear the slot. Idempotent; release
    /// failures are logged and swallowed so unload always succeeds.
    pub async fn unload(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(loaded) = slot.take() {
            release_quietly(self.task, &loaded.handle).await;
            info!("{}: module unloaded", self.task);
        }
    }
}

async fn release_quietly<T: EngineModule>(task: &str, handle: &Arc<T>) {
    if let Err(e) = handle.release().await {
        warn!("{}: module release failed (ignored): {}", task, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Debug)]
    struct FakeModule {
        releases: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EngineModule for FakeModule {
        async fn release(&self) -> Result<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fixture {
        _bundle: TempDir,
        _cache: TempDir,
        resolver: FileResolver,
        source: FileSource,
    }

    async fn fixture() -> Fixture {
        let bundle = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        tokio::fs::write(bundle.path().join("model.tflite"), b"weights")
            .await
            .unwrap();
        let resolver = FileResolver::new(cache.path())
            .unwrap()
            .with_bundle_root(bundle.path());
        Fixture {
            _bundle: bundle,
            _cache: cache,
            resolver,
            source: FileSource::bundle("model.tflite"),
        }
    }

    #[tokio::test]
    async fn test_initialize_then_require() {
        let fx = fixture().await;
        let cache: ModuleCache<FakeModule, u32> = ModuleCache::new("Test");
        let releases = Arc::new(AtomicUsize::new(0));

        let r = releases.clone();
        cache
            .initialize_with_caching(&fx.resolver, fx.source.clone(), 1, |_, _| async move {
                Ok(FakeModule { releases: r })
            })
            .await
            .unwrap();

        assert!(cache.is_initialized().await);
        assert!(cache.require_module().await.is_ok());
    }

    #[tokio::test]
    async fn test_identical_parameters_skip_factory() {
        let fx = fixture().await;
        let cache: ModuleCache<FakeModule, u32> = ModuleCache::new("Test");
        let builds = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let builds = builds.clone();
            let releases = releases.clone();
            cache
                .initialize_with_caching(&fx.resolver, fx.source.clone(), 7, |_, _| async move {
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok(FakeModule { releases })
                })
                .await
                .unwrap();
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(releases.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_option_change_releases_old_handle_once() {
        let fx = fixture().await;
        let cache: ModuleCache<FakeModule, u32> = ModuleCache::new("Test");
        let releases = Arc::new(AtomicUsize::new(0));

        for options in [1u32, 2] {
            let releases = releases.clone();
            cache
                .initialize_with_caching(
                    &fx.resolver,
                    fx.source.clone(),
                    options,
                    |_, _| async move { Ok(FakeModule { releases }) },
                )
                .await
                .unwrap();
        }

        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_factory_failure_leaves_slot_empty() {
        let fx = fixture().await;
        let cache: ModuleCache<FakeModule, u32> = ModuleCache::new("Test");

        let err = cache
            .initialize_with_caching(&fx.resolver, fx.source.clone(), 1, |_, _| async move {
                Err::<FakeModule, _>(PerceptError::Other("bad model format".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PerceptError::InitializationFailed { task: "Test", .. }
        ));
        let err = cache.require_module().await.unwrap_err();
        assert!(matches!(err, PerceptError::NotInitialized { task: "Test" }));
    }

    #[tokio::test]
    async fn test_resolution_failure_wrapped_with_task_tag() {
        let fx = fixture().await;
        let cache: ModuleCache<FakeModule, u32> = ModuleCache::new("Test");

        let err = cache
            .initialize_with_caching(
                &fx.resolver,
                FileSource::bundle("missing.tflite"),
                1,
                |_, _| async move {
                    Ok(FakeModule {
                        releases: Arc::new(AtomicUsize::new(0)),
                    })
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PerceptError::InitializationFailed { .. }));
    }

    #[tokio::test]
    async fn test_unload_is_idempotent() {
        let fx = fixture().await;
        let cache: ModuleCache<FakeModule, u32> = ModuleCache::new("Test");
        let releases = Arc::new(AtomicUsize::new(0));

        let r = releases.clone();
        cache
            .initialize_with_caching(&fx.resolver, fx.source.clone(), 1, |_, _| async move {
                Ok(FakeModule { releases: r })
            })
            .await
            .unwrap();

        cache.unload().await;
        cache.unload().await;

        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert!(!cache.is_initialized().await);
    }
}
