//! SQLite store for listing drafts and their verified photos.

mod schema;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

pub use schema::{MIGRATIONS, SCHEMA};

use crate::geo::Coordinates;
use crate::listing::{DraftStore, ListingDraft, ListingVerification, ReviewStatus, VerifiedPhoto};
use crate::metadata::{CaptureMethod, PhotoMetadata};
use crate::verify::{VerificationResult, VerificationStatus};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(SCHEMA)?;
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        for migration in MIGRATIONS {
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Ids of listings whose review status is `status`.
    pub fn listing_ids_with_status(&self, status: ReviewStatus) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM listings WHERE review_status = ? ORDER BY id")?;
        let ids = stmt
            .query_map([status.as_str()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    fn load_photos(&self, listing_id: i64) -> Result<Vec<VerifiedPhoto>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT image, fingerprint, file_name, capture_method,
                   gps_latitude, gps_longitude, taken_at, device_info,
                   status, location_match, distance_km, photo_age_days,
                   requires_reverification, details
            FROM listing_photos
            WHERE listing_id = ?
            ORDER BY position
            "#,
        )?;
        let photos = stmt
            .query_map([listing_id], photo_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }
}

impl DraftStore for Database {
    fn save_draft(&self, draft: &mut ListingDraft) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;

        let latitude = draft.location.map(|c| c.latitude);
        let longitude = draft.location.map(|c| c.longitude);
        let verification_status = draft.verification.verification_status.map(|s| s.as_str());
        let last_verified_at = draft.verification.last_verified_at.map(|t| t.to_rfc3339());

        let id = match draft.id {
            Some(id) => {
                let updated = tx.execute(
                    r#"
                    UPDATE listings SET
                        title = ?, category = ?, review_status = ?,
                        latitude = ?, longitude = ?,
                        verification_status = ?, location_verified = ?,
                        distance_from_listing = ?, last_verified_at = ?,
                        updated_at = CURRENT_TIMESTAMP
                    WHERE id = ?
                    "#,
                    params![
                        draft.title,
                        draft.category,
                        draft.review_status.as_str(),
                        latitude,
                        longitude,
                        verification_status,
                        draft.verification.location_verified,
                        draft.verification.distance_from_listing,
                        last_verified_at,
                        id,
                    ],
                )?;
                if updated == 0 {
                    anyhow::bail!("Listing {} does not exist", id);
                }
                tx.execute("DELETE FROM listing_photos WHERE listing_id = ?", [id])?;
                id
            }
            None => {
                tx.execute(
                    r#"
                    INSERT INTO listings (
                        title, category, review_status,
                        latitude, longitude,
                        verification_status, location_verified,
                        distance_from_listing, last_verified_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                    params![
                        draft.title,
                        draft.category,
                        draft.review_status.as_str(),
                        latitude,
                        longitude,
                        verification_status,
                        draft.verification.location_verified,
                        draft.verification.distance_from_listing,
                        last_verified_at,
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };

        for (position, photo) in draft.photos.iter().enumerate() {
            let meta = &photo.metadata;
            let result = &photo.verification;
            tx.execute(
                r#"
                INSERT INTO listing_photos (
                    listing_id, position, image, fingerprint, file_name, capture_method,
                    gps_latitude, gps_longitude, taken_at, device_info,
                    status, location_match, distance_km, photo_age_days,
                    requires_reverification, details
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    id,
                    position as i64,
                    photo.image,
                    photo.fingerprint,
                    meta.file_name,
                    meta.capture_method.as_str(),
                    meta.gps_coordinates.map(|c| c.latitude),
                    meta.gps_coordinates.map(|c| c.longitude),
                    meta.timestamp.map(|t| t.to_rfc3339()),
                    meta.device_info,
                    result.status.as_str(),
                    result.location_match,
                    result.distance_from_listing,
                    result.photo_age,
                    result.requires_reverification,
                    result.verification_details,
                ],
            )?;
        }

        tx.commit()?;
        draft.id = Some(id);
        tracing::debug!("Saved listing {} with {} photos", id, draft.photos.len());
        Ok(id)
    }

    fn load_draft(&self, id: i64) -> Result<Option<ListingDraft>> {
        let draft = self
            .conn
            .query_row(
                r#"
                SELECT id, title, category, review_status,
                       latitude, longitude,
                       verification_status, location_verified,
                       distance_from_listing, last_verified_at
                FROM listings
                WHERE id = ?
                "#,
                [id],
                listing_from_row,
            )
            .optional()?;

        match draft {
            Some(mut draft) => {
                draft.photos = self.load_photos(id)?;
                Ok(Some(draft))
            }
            None => Ok(None),
        }
    }

    fn list_drafts(&self) -> Result<Vec<ListingDraft>> {
        let mut stmt = self.conn.prepare("SELECT id FROM listings ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut drafts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(draft) = self.load_draft(id)? {
                drafts.push(draft);
            }
        }
        Ok(drafts)
    }
}

fn listing_from_row(row: &Row) -> rusqlite::Result<ListingDraft> {
    let review_status: String = row.get(3)?;
    let review_status = ReviewStatus::parse(&review_status).ok_or_else(|| invalid(3, &review_status))?;

    let verification_status = match row.get::<_, Option<String>>(6)? {
        Some(s) => Some(VerificationStatus::parse(&s).ok_or_else(|| invalid(6, &s))?),
        None => None,
    };

    Ok(ListingDraft {
        id: Some(row.get(0)?),
        title: row.get(1)?,
        category: row.get(2)?,
        location: coordinates(row.get(4)?, row.get(5)?),
        photos: Vec::new(),
        review_status,
        verification: ListingVerification {
            verification_status,
            location_verified: row.get(7)?,
            distance_from_listing: row.get(8)?,
            last_verified_at: optional_time(row, 9)?,
        },
    })
}

fn photo_from_row(row: &Row) -> rusqlite::Result<VerifiedPhoto> {
    let capture_method: String = row.get(3)?;
    let capture_method = CaptureMethod::parse(&capture_method).ok_or_else(|| invalid(3, &capture_method))?;

    let status: String = row.get(8)?;
    let status = VerificationStatus::parse(&status).ok_or_else(|| invalid(8, &status))?;

    Ok(VerifiedPhoto {
        image: row.get(0)?,
        fingerprint: row.get(1)?,
        metadata: PhotoMetadata {
            gps_coordinates: coordinates(row.get(4)?, row.get(5)?),
            timestamp: optional_time(row, 6)?,
            device_info: row.get(7)?,
            capture_method,
            file_name: row.get(2)?,
        },
        verification: VerificationResult {
            status,
            location_match: row.get(9)?,
            distance_from_listing: row.get(10)?,
            photo_age: row.get(11)?,
            requires_reverification: row.get(12)?,
            verification_details: row.get(13)?,
        },
    })
}

fn coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Option<Coordinates> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    }
}

fn optional_time(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

fn invalid(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unexpected value {:?}", value).into(),
    )
}
