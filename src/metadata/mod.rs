//! Photo metadata extraction.
//!
//! Reads GPS position, capture time and device from a photo's EXIF block.
//! Extraction never fails: a file that cannot be parsed yields a record with
//! only the file name and capture method set, so verification degrades to a
//! lower trust tier instead of blocking the seller.

mod reader;
pub mod source;

#[cfg(test)]
pub(crate) mod fixtures;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

use crate::geo::Coordinates;

pub use source::{decode_data_url, encode_data_url, ImageSource, SourceError};

/// How an image entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureMethod {
    /// Taken live through the in-app camera flow.
    Camera,
    /// Selected from existing files.
    Upload,
}

impl CaptureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMethod::Camera => "CAMERA",
            CaptureMethod::Upload => "UPLOAD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CAMERA" => Some(CaptureMethod::Camera),
            "UPLOAD" => Some(CaptureMethod::Upload),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMetadata {
    pub gps_coordinates: Option<Coordinates>,
    pub timestamp: Option<DateTime<Utc>>,
    pub device_info: Option<String>,
    pub capture_method: CaptureMethod,
    pub file_name: String,
}

impl PhotoMetadata {
    /// A record with no embedded metadata.
    pub fn empty(file_name: impl Into<String>, capture_method: CaptureMethod) -> Self {
        Self {
            gps_coordinates: None,
            timestamp: None,
            device_info: None,
            capture_method,
            file_name: file_name.into(),
        }
    }

    /// Use `location` as the photo position when the file carried no GPS.
    ///
    /// Live captures from a browser rarely embed EXIF, so the capture flow
    /// supplies the device's geolocation instead. Embedded GPS always wins.
    pub fn with_fallback_location(mut self, location: Option<Coordinates>) -> Self {
        if self.gps_coordinates.is_none() {
            self.gps_coordinates = location.filter(|c| c.is_valid());
        }
        self
    }

    pub fn has_gps(&self) -> bool {
        self.gps_coordinates.is_some()
    }
}

/// Extract metadata from raw image bytes.
pub fn extract(data: &[u8], file_name: &str, capture_method: CaptureMethod) -> PhotoMetadata {
    let mut metadata = PhotoMetadata::empty(file_name, capture_method);

    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(e) => {
            tracing::debug!("No readable metadata in {}: {}", file_name, e);
            return metadata;
        }
    };

    metadata.gps_coordinates = reader::read_gps(&exif);
    metadata.timestamp = reader::read_timestamp(&exif);
    metadata.device_info = reader::read_device(&exif);

    metadata
}

/// Extract metadata from a file on disk. Unreadable files yield empty metadata.
pub fn extract_from_path(path: &Path, capture_method: CaptureMethod) -> PhotoMetadata {
    extract_from_source(&ImageSource::Path(path.to_path_buf()), capture_method)
}

pub fn extract_from_source(source: &ImageSource, capture_method: CaptureMethod) -> PhotoMetadata {
    let file_name = source.file_name();
    match source.read() {
        Ok(data) => extract(&data, &file_name, capture_method),
        Err(e) => {
            tracing::warn!("Could not load image {}: {}", file_name, e);
            PhotoMetadata::empty(file_name, capture_method)
        }
    }
}
