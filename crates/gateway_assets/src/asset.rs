//! Loaded assets and per-request options

use crate::format::AssetFormat;
use crate::loader::{ModelData, ProgressCallback};
use gateway_core::Vec3;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a loaded asset
///
/// Callers coalesced onto the same load receive clones of one handle, so
/// `Rc::ptr_eq` identifies them as the same asset.
pub type AssetHandle = Rc<LoadedAsset>;

/// Placement applied to a model when it is spawned
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Uniform scale factor
    pub scale: f64,
    pub position: Vec3,
    /// Euler rotation in degrees
    pub rotation: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            position: Vec3::default(),
            rotation: Vec3::default(),
        }
    }
}

/// A completed load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedAsset {
    /// Cache key derived from `path`
    pub key: String,
    /// Path as originally requested
    pub path: String,
    pub format: AssetFormat,
    pub data: ModelData,
    /// Placement from the request that started the load
    pub transform: Transform,
}

/// Options for a single load request
///
/// Only the request that starts a load has its options applied; requests
/// coalesced onto an in-flight load or served from the cache share the
/// existing asset as is.
#[derive(Clone, Default)]
pub struct LoadOptions {
    pub scale: Option<f64>,
    pub position: Option<Vec3>,
    pub rotation: Option<Vec3>,
    pub on_progress: Option<ProgressCallback>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn on_progress<F: Fn(f64) + 'static>(mut self, callback: F) -> Self {
        self.on_progress = Some(Rc::new(callback));
        self
    }

    pub(crate) fn transform(&self) -> Transform {
        let defaults = Transform::default();
        Transform {
            scale: self.scale.unwrap_or(defaults.scale),
            position: self.position.unwrap_or(defaults.position),
            rotation: self.rotation.unwrap_or(defaults.rotation),
        }
    }
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("scale", &self.scale)
            .field("position", &self.position)
            .field("rotation", &self.rotation)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// One entry of a preload batch
#[derive(Debug, Clone, Default)]
pub struct PreloadRequest {
    pub path: String,
    pub options: LoadOptions,
}

impl PreloadRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            options: LoadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }
}

impl From<&str> for PreloadRequest {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for PreloadRequest {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_fill_transform() {
        let transform = LoadOptions::new()
            .scale(2.5)
            .position(Vec3::new(0.0, 0.0, -10.0))
            .transform();
        assert_eq!(transform.scale, 2.5);
        assert_eq!(transform.position, Vec3::new(0.0, 0.0, -10.0));
        assert_eq!(transform.rotation, Vec3::default());

        assert_eq!(LoadOptions::default().transform(), Transform::default());
    }
}
