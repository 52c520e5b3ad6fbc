//! Asset formats and model categories

use crate::error::{AssetError, Result};
use std::fmt;
use std::str::FromStr;

/// 3D model file formats understood by the loader registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetFormat {
    /// Binary glTF 2.0
    Glb,
    /// JSON glTF 2.0
    Gltf,
    /// Wavefront OBJ
    Obj,
    /// Autodesk FBX
    Fbx,
}

impl AssetFormat {
    pub const ALL: [AssetFormat; 4] = [
        AssetFormat::Glb,
        AssetFormat::Gltf,
        AssetFormat::Obj,
        AssetFormat::Fbx,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            AssetFormat::Glb => "glb",
            AssetFormat::Gltf => "gltf",
            AssetFormat::Obj => "obj",
            AssetFormat::Fbx => "fbx",
        }
    }

    /// Match a file extension, ignoring case
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(extension))
    }

    /// Detect the format from the text after the last `.` of `path`
    pub fn from_path(path: &str) -> Result<Self> {
        let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        Self::from_extension(extension)
            .ok_or_else(|| AssetError::UnsupportedFormat(extension.to_lowercase()))
    }
}

impl fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Well-known model directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetCategory {
    Buildings,
    Props,
    Environment,
    Characters,
    Vehicles,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 5] = [
        AssetCategory::Buildings,
        AssetCategory::Props,
        AssetCategory::Environment,
        AssetCategory::Characters,
        AssetCategory::Vehicles,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AssetCategory::Buildings => "buildings",
            AssetCategory::Props => "props",
            AssetCategory::Environment => "environment",
            AssetCategory::Characters => "characters",
            AssetCategory::Vehicles => "vehicles",
        }
    }

    /// Directory holding models of this category, with a trailing slash
    pub fn dir(self) -> String {
        format!("/assets/models/{}/", self.name())
    }

    /// Path of the binary glTF model `name` in this category
    pub fn model_path(self, name: &str) -> String {
        format!("{}{}.glb", self.dir(), name)
    }
}

impl FromStr for AssetCategory {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| AssetError::InvalidRequest(format!("unknown asset category '{}'", s)))
    }
}
