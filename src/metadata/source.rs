//! Image inputs: raw bytes, files on disk, or base64 data URLs as produced by
//! an in-browser camera capture.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("not a data URL")]
    NotDataUrl,
    #[error("data URL is not base64 encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub enum ImageSource {
    Bytes { file_name: String, data: Vec<u8> },
    Path(PathBuf),
    DataUrl { file_name: String, url: String },
}

impl ImageSource {
    pub fn file_name(&self) -> String {
        match self {
            ImageSource::Bytes { file_name, .. } | ImageSource::DataUrl { file_name, .. } => {
                file_name.clone()
            }
            ImageSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    }

    /// Load the raw image bytes.
    pub fn read(&self) -> Result<Vec<u8>, SourceError> {
        match self {
            ImageSource::Bytes { data, .. } => Ok(data.clone()),
            ImageSource::Path(path) => read_file(path),
            ImageSource::DataUrl { url, .. } => decode_data_url(url).map(|(_, data)| data),
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, SourceError> {
    std::fs::read(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Split a `data:<mime>;base64,<payload>` URL into its mime type and bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), SourceError> {
    let rest = url.trim().strip_prefix("data:").ok_or(SourceError::NotDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(SourceError::NotDataUrl)?;

    let mime = match header.strip_suffix(";base64") {
        Some(mime) => mime,
        None => return Err(SourceError::NotBase64),
    };

    let data = STANDARD.decode(payload.trim())?;
    Ok((mime.to_string(), data))
}

/// Encode bytes as a data URL for display.
pub fn encode_data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}
