//! Filesystem asset loader
//!
//! Resolves asset paths against a root directory (a leading `/` is treated
//! as relative to the root) and reads the model bytes in chunks, reporting
//! progress as it goes. Binary glTF files must start with the `glTF` magic.

use crate::error::AssetError;
use crate::format::AssetFormat;
use crate::loader::{AssetLoader, LoadResponder, ModelData};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

/// Magic bytes at the start of every binary glTF file
pub const GLB_MAGIC: &[u8; 4] = b"glTF";

const CHUNK_SIZE: usize = 64 * 1024;

/// Loader reading models from a directory tree
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of `path` under the root
    ///
    /// Paths that would climb out of the root are rejected.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(AssetError::InvalidRequest(format!(
                "asset path '{}' leaves the asset root",
                path
            )));
        }
        Ok(self.root.join(relative))
    }

    fn read(&self, path: &str, responder: &LoadResponder) -> Result<ModelData, AssetError> {
        let location = self.resolve(path)?;
        let mut file = File::open(&location).map_err(|err| io_error(path, err))?;
        let total = file
            .metadata()
            .map(|m| m.len() as usize)
            .map_err(|err| io_error(path, err))?;

        let mut bytes = Vec::with_capacity(total);
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let read = file.read(&mut chunk).map_err(|err| io_error(path, err))?;
            if read == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..read]);
            if total > 0 {
                responder.progress(bytes.len() as f64 / total as f64);
            }
        }

        if AssetFormat::from_path(path) == Ok(AssetFormat::Glb) && !bytes.starts_with(GLB_MAGIC) {
            return Err(AssetError::load_failure(path, "missing binary glTF header"));
        }
        Ok(ModelData::new(bytes))
    }
}

impl AssetLoader for FileLoader {
    fn load(&self, path: &str, responder: LoadResponder) {
        match self.read(path, &responder) {
            Ok(data) => responder.succeed(data),
            Err(err) => responder.fail(err),
        }
    }

    fn supported_formats(&self) -> &[AssetFormat] {
        &AssetFormat::ALL
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

fn io_error(path: &str, err: io::Error) -> AssetError {
    if err.kind() == io::ErrorKind::NotFound {
        AssetError::NotFound(path.to_string())
    } else {
        AssetError::load_failure(path, err)
    }
}
