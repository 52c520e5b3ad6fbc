//! Asset manager - cached, coalescing asset loads
//!
//! [`AssetManager::load_asset`] resolves a request in one synchronous step:
//!
//! 1. a completed asset in the cache is returned immediately
//! 2. a load already in flight for the same key is shared: every caller
//!    awaits the same future and receives the same handle or error
//! 3. otherwise the loader for the path's format is started and its load
//!    registered as pending
//!
//! When a load finishes it leaves the pending set; a success is inserted into
//! the bounded cache, a failure caches nothing.
//!
//! # Example
//!
//! ```rust
//! use gateway_assets::{AssetConfig, AssetFormat, AssetLoader, AssetManager, LoadResponder, ModelData};
//! use std::rc::Rc;
//!
//! struct Embedded;
//!
//! impl AssetLoader for Embedded {
//!     fn load(&self, _path: &str, responder: LoadResponder) {
//!         responder.succeed(ModelData::new(b"glTF".to_vec()));
//!     }
//!     fn supported_formats(&self) -> &[AssetFormat] {
//!         &[AssetFormat::Glb]
//!     }
//!     fn name(&self) -> &'static str {
//!         "embedded"
//!     }
//! }
//!
//! let manager = AssetManager::new(AssetConfig::default());
//! manager.register_loader(Rc::new(Embedded));
//!
//! let asset = pollster::block_on(manager.load_asset("hall.glb", Default::default())).unwrap();
//! assert_eq!(asset.data.len(), 4);
//! ```

use crate::asset::{AssetHandle, LoadOptions, LoadedAsset, PreloadRequest};
use crate::cache::{AssetCache, CacheStats};
use crate::config::AssetConfig;
use crate::error::{AssetError, Result};
use crate::format::AssetCategory;
use crate::loader::{AssetLoader, LoadResponder, LoaderRegistry};
use futures::channel::oneshot;
use futures::future::{self, join_all, LocalBoxFuture, Shared};
use futures::FutureExt;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type PendingLoad = Shared<LocalBoxFuture<'static, Result<AssetHandle>>>;

/// Statistics about the asset manager
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssetStats {
    /// Completed assets currently cached
    pub loaded: usize,
    /// Loads in flight
    pub loading: usize,
    pub max_cache_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl From<CacheStats> for AssetStats {
    fn from(stats: CacheStats) -> Self {
        Self {
            loaded: stats.entries,
            loading: 0,
            max_cache_size: stats.max_entries,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
        }
    }
}

struct Inner {
    registry: RefCell<LoaderRegistry>,
    cache: RefCell<AssetCache>,
    pending: RefCell<FxHashMap<String, PendingLoad>>,
    config: AssetConfig,
}

impl Inner {
    fn finish(&self, key: &str, result: &Result<AssetHandle>) {
        self.pending.borrow_mut().remove(key);
        match result {
            Ok(asset) => {
                self.cache
                    .borrow_mut()
                    .insert(key.to_string(), Rc::clone(asset));
                tracing::info!("Asset loaded: {}", asset.path);
            }
            Err(err) => tracing::error!("Failed to load asset '{}': {}", key, err),
        }
    }
}

/// Loads assets through registered loaders, caching completed ones
#[derive(Clone)]
pub struct AssetManager {
    inner: Rc<Inner>,
}

impl AssetManager {
    /// Create a manager with no loaders registered
    pub fn new(config: AssetConfig) -> Self {
        let cache = AssetCache::new(config.max_cache_size, config.eviction);
        Self {
            inner: Rc::new(Inner {
                registry: RefCell::new(LoaderRegistry::new()),
                cache: RefCell::new(cache),
                pending: RefCell::new(FxHashMap::default()),
                config,
            }),
        }
    }

    pub fn config(&self) -> &AssetConfig {
        &self.inner.config
    }

    /// Register a loader for every format it supports
    pub fn register_loader(&self, loader: Rc<dyn AssetLoader>) {
        self.inner.registry.borrow_mut().register(loader);
    }

    /// Cache key for `path` under the configured key strategy
    pub fn key_for(&self, path: &str) -> String {
        self.inner.config.key_strategy.key_for(path)
    }

    /// Load the asset at `path`
    ///
    /// Cache lookup, coalescing and loader start all happen before this
    /// returns; the returned future only waits for the outcome.
    pub fn load_asset(
        &self,
        path: &str,
        options: LoadOptions,
    ) -> LocalBoxFuture<'static, Result<AssetHandle>> {
        match self.start_load(path, options) {
            Ok(load) => load,
            Err(err) => future::ready(Err(err)).boxed_local(),
        }
    }

    /// Load the binary glTF model `name` of `category`
    pub fn load_model(
        &self,
        category: AssetCategory,
        name: &str,
        options: LoadOptions,
    ) -> LocalBoxFuture<'static, Result<AssetHandle>> {
        self.load_asset(&category.model_path(name), options)
    }

    /// Load every request concurrently, returning the ones that succeeded
    ///
    /// Individual failures are logged and left out of the result. The batch
    /// only fails if a request is malformed, in which case nothing is started.
    pub async fn preload_assets<I, R>(&self, requests: I) -> Result<Vec<AssetHandle>>
    where
        I: IntoIterator<Item = R>,
        R: Into<PreloadRequest>,
    {
        let requests: Vec<PreloadRequest> = requests.into_iter().map(Into::into).collect();
        if let Some(bad) = requests.iter().position(|r| r.path.trim().is_empty()) {
            return Err(AssetError::InvalidRequest(format!(
                "preload entry {} has an empty path",
                bad
            )));
        }

        let total = requests.len();
        tracing::info!("Preloading {} assets", total);

        let loads = requests.into_iter().map(|request| {
            let load = self.load_asset(&request.path, request.options);
            async move { (request.path, load.await) }
        });

        let mut loaded = Vec::with_capacity(total);
        for (path, result) in join_all(loads).await {
            match result {
                Ok(asset) => loaded.push(asset),
                Err(err) => tracing::warn!("Failed to preload '{}': {}", path, err),
            }
        }

        tracing::info!("Preloaded {}/{} assets", loaded.len(), total);
        Ok(loaded)
    }

    /// Completed asset for `path`, without counting a cache hit
    pub fn cached(&self, path: &str) -> Option<AssetHandle> {
        let key = self.key_for(path);
        self.inner.cache.borrow().peek(&key).cloned()
    }

    /// Whether a load for `path` is in flight
    pub fn is_loading(&self, path: &str) -> bool {
        let key = self.key_for(path);
        self.inner.pending.borrow().contains_key(&key)
    }

    /// Drop every completed asset; in-flight loads are unaffected
    pub fn clear_cache(&self) {
        self.inner.cache.borrow_mut().clear();
        tracing::info!("Asset cache cleared");
    }

    pub fn stats(&self) -> AssetStats {
        let mut stats = AssetStats::from(self.inner.cache.borrow().stats());
        stats.loading = self.inner.pending.borrow().len();
        stats
    }

    fn start_load(
        &self,
        path: &str,
        options: LoadOptions,
    ) -> Result<LocalBoxFuture<'static, Result<AssetHandle>>> {
        if path.trim().is_empty() {
            return Err(AssetError::InvalidRequest("empty asset path".into()));
        }

        let key = self.key_for(path);
        if let Some(asset) = self.inner.cache.borrow_mut().get(&key) {
            return Ok(future::ready(Ok(asset)).boxed_local());
        }
        if let Some(pending) = self.inner.pending.borrow().get(&key) {
            tracing::debug!("Joining in-flight load of '{}'", key);
            return Ok(pending.clone().boxed_local());
        }

        let (format, loader) = self.inner.registry.borrow().resolve(path)?;
        let (sender, receiver) = oneshot::channel::<Result<AssetHandle>>();

        // Bookkeeping runs when the loader reports, even if nobody awaits
        let responder = {
            let inner: Weak<Inner> = Rc::downgrade(&self.inner);
            let key = key.clone();
            let path = path.to_string();
            let transform = options.transform();
            LoadResponder::new(path.clone(), options.on_progress.clone(), move |result| {
                let result = result.map(|data| {
                    Rc::new(LoadedAsset {
                        key: key.clone(),
                        path,
                        format,
                        data,
                        transform,
                    })
                });
                if let Some(inner) = inner.upgrade() {
                    inner.finish(&key, &result);
                }
                if sender.send(result).is_err() {
                    tracing::debug!("No caller left waiting for '{}'", key);
                }
            })
        };

        let load = {
            let path = path.to_string();
            async move {
                match receiver.await {
                    Ok(result) => result,
                    Err(_) => Err(AssetError::Cancelled(path)),
                }
            }
            .boxed_local()
            .shared()
        };

        self.inner
            .pending
            .borrow_mut()
            .insert(key.clone(), load.clone());
        tracing::debug!("Loading '{}' with {}", path, loader.name());
        loader.load(path, responder);

        Ok(load.boxed_local())
    }
}

impl Default for AssetManager {
    fn default() -> Self {
        Self::new(AssetConfig::default())
    }
}
