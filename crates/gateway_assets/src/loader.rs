//! Asset loader system
//!
//! A loader is the collaborator that actually fetches and decodes a model.
//! It is handed the source path and a [`LoadResponder`] bundling the three
//! completion callbacks (success, progress, error) and reports through it,
//! either before `load` returns or at any later point.
//!
//! Loaders are registered per [`AssetFormat`]; the registry picks one by
//! file extension.

use crate::error::{AssetError, Result};
use crate::format::AssetFormat;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Progress callback, receives a fraction in `0.0..=1.0`
pub type ProgressCallback = Rc<dyn Fn(f64)>;

/// Raw model produced by a loader
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelData {
    pub bytes: Vec<u8>,
}

impl ModelData {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

type CompletionHook = Box<dyn FnOnce(Result<ModelData>)>;

/// Completion callbacks for one load
///
/// Consuming [`succeed`](Self::succeed) or [`fail`](Self::fail) reports the
/// outcome. Dropping the responder without doing either fails the load with
/// [`AssetError::Cancelled`]. The outcome is delivered the moment it is
/// reported, whether or not anyone is awaiting the load.
pub struct LoadResponder {
    path: String,
    on_complete: Option<CompletionHook>,
    on_progress: Option<ProgressCallback>,
}

impl LoadResponder {
    pub(crate) fn new<F>(
        path: impl Into<String>,
        on_progress: Option<ProgressCallback>,
        on_complete: F,
    ) -> Self
    where
        F: FnOnce(Result<ModelData>) + 'static,
    {
        Self {
            path: path.into(),
            on_complete: Some(Box::new(on_complete)),
            on_progress,
        }
    }

    /// Path being loaded
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Forward a progress fraction to the requester
    pub fn progress(&self, fraction: f64) {
        if let Some(on_progress) = &self.on_progress {
            on_progress(fraction.clamp(0.0, 1.0));
        }
    }

    pub fn succeed(mut self, data: ModelData) {
        self.complete(Ok(data));
    }

    pub fn fail(mut self, error: AssetError) {
        self.complete(Err(error));
    }

    fn complete(&mut self, result: Result<ModelData>) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(result);
        }
    }
}

impl Drop for LoadResponder {
    fn drop(&mut self) {
        if self.on_complete.is_some() {
            tracing::warn!("Loader dropped '{}' without reporting", self.path);
            let cancelled = AssetError::Cancelled(self.path.clone());
            self.complete(Err(cancelled));
        }
    }
}

/// Trait for asset loaders
pub trait AssetLoader {
    /// Start loading `path`, reporting the outcome through `responder`
    fn load(&self, path: &str, responder: LoadResponder);

    /// Formats this loader handles
    fn supported_formats(&self) -> &[AssetFormat];

    /// Get the loader name for debugging
    fn name(&self) -> &'static str;
}

/// Registry of available asset loaders, one per format
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: FxHashMap<AssetFormat, Rc<dyn AssetLoader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `loader` for every format it supports, replacing earlier ones
    pub fn register(&mut self, loader: Rc<dyn AssetLoader>) {
        for format in loader.supported_formats() {
            tracing::debug!("Registered '{}' for .{}", loader.name(), format);
            self.loaders.insert(*format, Rc::clone(&loader));
        }
    }

    pub fn get(&self, format: AssetFormat) -> Option<Rc<dyn AssetLoader>> {
        self.loaders.get(&format).cloned()
    }

    /// Loader for the format of `path`
    pub fn resolve(&self, path: &str) -> Result<(AssetFormat, Rc<dyn AssetLoader>)> {
        let format = AssetFormat::from_path(path)?;
        let loader = self
            .get(format)
            .ok_or_else(|| AssetError::UnsupportedFormat(format.extension().to_string()))?;
        Ok((format, loader))
    }

    pub fn supports(&self, format: AssetFormat) -> bool {
        self.loaders.contains_key(&format)
    }
}
