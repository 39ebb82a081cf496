use crate::error::EnrichError;
use log::info;
use std::io;
use std::path::{Path, PathBuf};

const STORE_DIR_NAME: &str = "eco_enrich";
pub const CHECKPOINT_FILE_NAME: &str = "elevations.csv";
pub const CACHE_FILE_NAME: &str = "elevation_cache.json";

/// Default folder for checkpoint and cache files: `<user cache dir>/eco_enrich`.
pub fn default_store_dir() -> Result<PathBuf, EnrichError> {
    dirs::cache_dir()
        .map(|p| p.join(STORE_DIR_NAME))
        .ok_or(EnrichError::StoreDirResolution)
}

pub async fn ensure_store_dir_exists(path: &Path) -> Result<(), EnrichError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(EnrichError::StoreDirCreation(
            path.to_path_buf(),
            io::Error::new(io::ErrorKind::AlreadyExists, "path exists but is not a directory"),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating store directory: {}", path.display());
            tokio::fs::create_dir_all(path)
                .await
                .map_err(|e| EnrichError::StoreDirCreation(path.to_path_buf(), e))
        }
        Err(e) => Err(EnrichError::StoreDirCreation(path.to_path_buf(), e)),
    }
}
