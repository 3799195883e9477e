//! Error types for the window, GPU and asset layers
//!
//! The simulation core never fails; everything here comes from the outside
//! world.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for fallible collaborator operations
pub type Result<T> = std::result::Result<T, DonutError>;

#[derive(Error, Debug)]
pub enum DonutError {
    /// Reading an asset from disk failed
    #[error("Failed to read asset {path}: {source}")]
    AssetIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An image file could not be decoded
    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A required asset does not exist
    #[error("Asset not found: {0}")]
    AssetMissing(PathBuf),

    /// The rendering surface could not be created or acquired
    #[error("Surface error: {0}")]
    Surface(String),

    #[error("Failed to create window: {0}")]
    WindowCreation(#[from] winit::error::OsError),

    /// The background asset thread could not be started
    #[error("Failed to start asset loader thread: {0}")]
    LoaderSpawn(#[source] std::io::Error),

    /// No GPU adapter can present to the window
    #[error("No suitable GPU adapter found")]
    AdapterUnavailable,

    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

impl DonutError {
    /// Whether the error only affects an optional asset
    pub fn is_asset_error(&self) -> bool {
        matches!(
            self,
            DonutError::AssetIo { .. } | DonutError::ImageDecode { .. } | DonutError::AssetMissing(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_asset() {
        let err = DonutError::AssetMissing(PathBuf::from("textures/matcaps/3.png"));
        assert_eq!(err.to_string(), "Asset not found: textures/matcaps/3.png");
        assert!(err.is_asset_error());
    }

    #[test]
    fn test_gpu_errors_are_not_asset_errors() {
        assert!(!DonutError::AdapterUnavailable.is_asset_error());
        assert!(!DonutError::Surface("lost".into()).is_asset_error());
    }

    #[test]
    fn test_loader_spawn_keeps_io_source() {
        use std::error::Error as _;

        let err = DonutError::LoaderSpawn(std::io::Error::new(
            std::io::ErrorKind::OutOfMemory,
            "no threads left",
        ));
        assert_eq!(
            err.to_string(),
            "Failed to start asset loader thread: no threads left"
        );
        assert!(!err.is_asset_error());
        assert!(err.source().is_some());
    }
}
