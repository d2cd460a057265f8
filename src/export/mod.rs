use anyhow::Result;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::listing::ListingDraft;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }
}

/// One photo's verification, flattened with its listing.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub listing_id: Option<i64>,
    pub listing_title: String,
    pub review_status: String,
    pub listing_status: Option<String>,
    pub position: usize,
    pub file_name: String,
    pub capture_method: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub taken_at: Option<String>,
    pub device: Option<String>,
    pub status: String,
    pub location_match: bool,
    pub distance_km: f64,
    pub photo_age_days: i64,
    pub requires_reverification: bool,
    pub details: String,
}

pub fn report_rows(drafts: &[ListingDraft]) -> Vec<ReportRow> {
    let mut rows = Vec::new();

    for draft in drafts {
        for (position, photo) in draft.photos.iter().enumerate() {
            let meta = &photo.metadata;
            let result = &photo.verification;
            rows.push(ReportRow {
                listing_id: draft.id,
                listing_title: draft.title.clone(),
                review_status: draft.review_status.as_str().to_string(),
                listing_status: draft
                    .verification
                    .verification_status
                    .map(|s| s.as_str().to_string()),
                position,
                file_name: meta.file_name.clone(),
                capture_method: meta.capture_method.as_str().to_string(),
                latitude: meta.gps_coordinates.map(|c| c.latitude),
                longitude: meta.gps_coordinates.map(|c| c.longitude),
                taken_at: meta.timestamp.map(|t| t.to_rfc3339()),
                device: meta.device_info.clone(),
                status: result.status.as_str().to_string(),
                location_match: result.location_match,
                distance_km: result.distance_from_listing,
                photo_age_days: result.photo_age,
                requires_reverification: result.requires_reverification,
                details: result.verification_details.clone(),
            });
        }
    }

    rows
}

/// Write a verification report for `drafts`. Returns the number of photo rows.
pub fn export_report(drafts: &[ListingDraft], output_path: &Path, format: ExportFormat) -> Result<usize> {
    let rows = report_rows(drafts);
    let count = rows.len();

    match format {
        ExportFormat::Json => export_json(&rows, output_path)?,
        ExportFormat::Csv => export_csv(&rows, output_path)?,
    }

    tracing::info!("Exported {} photo rows to {}", count, output_path.display());
    Ok(count)
}

fn export_json(rows: &[ReportRow], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(rows)?;
    let mut file = File::create(output_path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

fn export_csv(rows: &[ReportRow], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    // Write headers
    wtr.write_record([
        "listing_id",
        "listing_title",
        "review_status",
        "listing_status",
        "position",
        "file_name",
        "capture_method",
        "latitude",
        "longitude",
        "taken_at",
        "device",
        "status",
        "location_match",
        "distance_km",
        "photo_age_days",
        "requires_reverification",
        "details",
    ])?;

    // Write data
    for row in rows {
        wtr.write_record([
            row.listing_id.map(|v| v.to_string()).unwrap_or_default(),
            row.listing_title.clone(),
            row.review_status.clone(),
            row.listing_status.clone().unwrap_or_default(),
            row.position.to_string(),
            row.file_name.clone(),
            row.capture_method.clone(),
            row.latitude.map(|v| v.to_string()).unwrap_or_default(),
            row.longitude.map(|v| v.to_string()).unwrap_or_default(),
            row.taken_at.clone().unwrap_or_default(),
            row.device.clone().unwrap_or_default(),
            row.status.clone(),
            row.location_match.to_string(),
            format!("{:.3}", row.distance_km),
            row.photo_age_days.to_string(),
            row.requires_reverification.to_string(),
            row.details.clone(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
