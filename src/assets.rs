//! # Asset Loading
//!
//! Matcap images are read and decoded on a background thread, and the font
//! resource is located there too. The result comes back through a oneshot channel that the frame
//! loop polls without blocking, so the window is responsive while the disk
//! is busy.
//!
//! A missing or broken matcap is replaced by a flat grey 1×1 texture. The
//! font is never parsed: only its presence is checked, and a missing or
//! empty file leaves `font` empty. The host spawns the particle field once
//! the font has resolved.

use futures::channel::oneshot;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::error::{DonutError, Result};

const FALLBACK_GREY: [u8; 4] = [128, 128, 128, 255];

/// Decoded RGBA8 matcap
#[derive(Debug, Clone, PartialEq)]
pub struct MatcapImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    /// True when this is the grey stand-in for an image that failed to load
    pub is_fallback: bool,
}

impl MatcapImage {
    pub fn fallback() -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: FALLBACK_GREY.to_vec(),
            is_fallback: true,
        }
    }
}

/// A font file that exists and is not empty
#[derive(Debug, Clone, PartialEq)]
pub struct FontResource {
    pub path: PathBuf,
    pub len: u64,
}

/// Everything the scene needs from disk
#[derive(Debug, Clone)]
pub struct LoadedAssets {
    /// One entry per variant, in variant order
    pub matcaps: Vec<MatcapImage>,
    pub font: Option<FontResource>,
}

impl LoadedAssets {
    pub fn fallback_count(&self) -> usize {
        self.matcaps.iter().filter(|m| m.is_fallback).count()
    }
}

fn read_asset(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => DonutError::AssetMissing(path.to_path_buf()),
        _ => DonutError::AssetIo {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Reads and decodes one matcap image
pub fn load_matcap(path: &Path) -> Result<MatcapImage> {
    let bytes = read_asset(path)?;
    let image = image::load_from_memory(&bytes).map_err(|source| DonutError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(MatcapImage {
        width,
        height,
        rgba: rgba.into_raw(),
        is_fallback: false,
    })
}

/// Resolves the font file without reading its contents
pub fn locate_font(path: &Path) -> Result<FontResource> {
    let metadata = fs::metadata(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => DonutError::AssetMissing(path.to_path_buf()),
        _ => DonutError::AssetIo {
            path: path.to_path_buf(),
            source,
        },
    })?;
    if !metadata.is_file() || metadata.len() == 0 {
        return Err(DonutError::AssetMissing(path.to_path_buf()));
    }
    Ok(FontResource {
        path: path.to_path_buf(),
        len: metadata.len(),
    })
}

/// Loads every asset synchronously, substituting fallbacks where needed
pub fn load_all(config: &AppConfig) -> LoadedAssets {
    let matcaps = (1..=config.variant_count)
        .map(|variant| {
            let path = config.matcap_path(variant);
            load_matcap(&path).unwrap_or_else(|err| {
                log::warn!("{}; using grey fallback", err);
                MatcapImage::fallback()
            })
        })
        .collect();

    let font = match locate_font(&config.font_location()) {
        Ok(font) => {
            log::info!("Found font {} ({} bytes)", font.path.display(), font.len);
            Some(font)
        }
        Err(err) => {
            log::error!("{}; donuts will not be shown", err);
            None
        }
    };

    LoadedAssets { matcaps, font }
}

enum LoaderState {
    Pending(oneshot::Receiver<LoadedAssets>),
    Done,
}

/// Handle to assets loading on a background thread
pub struct AssetLoader {
    state: LoaderState,
}

impl AssetLoader {
    /// Starts loading on a new thread
    pub fn spawn(config: &AppConfig) -> Result<Self> {
        let (sender, receiver) = oneshot::channel();
        let config = config.clone();
        log::info!(
            "Loading {} matcaps from {}",
            config.variant_count,
            config.asset_root.display()
        );

        std::thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || {
                let assets = load_all(&config);
                // the receiver is gone if the app closed first
                let _ = sender.send(assets);
            })
            .map_err(DonutError::LoaderSpawn)?;

        Ok(Self {
            state: LoaderState::Pending(receiver),
        })
    }

    /// Returns the assets once, as soon as they are ready. Never blocks.
    pub fn poll(&mut self) -> Option<LoadedAssets> {
        let LoaderState::Pending(receiver) = &mut self.state else {
            return None;
        };

        match receiver.try_recv() {
            Ok(Some(assets)) => {
                self.state = LoaderState::Done;
                log::info!(
                    "Assets ready ({} matcaps, {} fallbacks)",
                    assets.matcaps.len(),
                    assets.fallback_count()
                );
                Some(assets)
            }
            Ok(None) => None,
            Err(oneshot::Canceled) => {
                log::error!("Asset loader exited without a result");
                self.state = LoaderState::Done;
                None
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, LoaderState::Pending(_))
    }
}
