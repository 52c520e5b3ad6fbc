//! Gateway Assets
//!
//! Loading and caching of 3D models for the gateway scene:
//!
//! - **Loaders**: format-specific collaborators behind [`AssetLoader`],
//!   registered per file extension
//! - **Cache**: a bounded map of completed assets with FIFO or LRU eviction
//! - **Manager**: coalesces concurrent requests for the same asset so each
//!   asset is loaded at most once at a time, and preloads batches

mod asset;
mod cache;
mod config;
mod error;
mod file;
mod format;
mod loader;
mod manager;

pub use asset::{AssetHandle, LoadOptions, LoadedAsset, PreloadRequest, Transform};
pub use cache::{AssetCache, CacheStats};
pub use config::{AssetConfig, EvictionPolicy, KeyStrategy};
pub use error::{AssetError, Result};
pub use file::{FileLoader, GLB_MAGIC};
pub use format::{AssetCategory, AssetFormat};
pub use loader::{AssetLoader, LoadResponder, LoaderRegistry, ModelData, ProgressCallback};
pub use manager::{AssetManager, AssetStats};
