//! Listing drafts and their photo verification state.
//!
//! A listing carries an ordered list of verified photos (the first one is the
//! cover image). Its top-level verification fields come from the single most
//! trusted photo and are recomputed whenever the claimed location changes.

mod aggregate;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::badge::Badge;
use crate::geo::Coordinates;
use crate::metadata::PhotoMetadata;
use crate::verify::{Clock, VerificationResult, VerificationStatus, Verifier};

pub use aggregate::best_photo;

/// A displayable photo with its metadata and current verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedPhoto {
    /// Path, URL or base64 data URL of the image.
    pub image: String,
    /// SHA-256 of the image content, when known.
    pub fingerprint: Option<String>,
    pub metadata: PhotoMetadata,
    pub verification: VerificationResult,
}

impl VerifiedPhoto {
    pub fn new<C: Clock>(
        image: impl Into<String>,
        fingerprint: Option<String>,
        metadata: PhotoMetadata,
        reference: Option<&Coordinates>,
        verifier: &Verifier<C>,
    ) -> Self {
        let verification = verifier.verify(&metadata, reference);
        Self {
            image: image.into(),
            fingerprint,
            metadata,
            verification,
        }
    }

    /// Recompute verification against `reference`.
    pub fn reverify<C: Clock>(&mut self, reference: Option<&Coordinates>, verifier: &Verifier<C>) {
        self.verification = verifier.verify(&self.metadata, reference);
    }

    pub fn badge(&self) -> Badge {
        Badge::for_status(self.verification.status)
    }

    /// Identity used to detect changes to a listing's photo set.
    fn identity(&self) -> &str {
        self.fingerprint.as_deref().unwrap_or(&self.image)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReviewStatus::Pending),
            "approved" => Some(ReviewStatus::Approved),
            "rejected" => Some(ReviewStatus::Rejected),
            _ => None,
        }
    }
}

/// Listing-level verification fields, taken from the best photo.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingVerification {
    pub verification_status: Option<VerificationStatus>,
    pub location_verified: bool,
    pub distance_from_listing: Option<f64>,
    pub last_verified_at: Option<DateTime<Utc>>,
}

impl ListingVerification {
    fn from_photo(photo: &VerifiedPhoto, at: DateTime<Utc>) -> Self {
        Self {
            verification_status: Some(photo.verification.status),
            location_verified: photo.verification.location_match,
            distance_from_listing: Some(photo.verification.distance_from_listing),
            last_verified_at: Some(at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    pub id: Option<i64>,
    pub title: String,
    pub category: String,
    pub location: Option<Coordinates>,
    pub photos: Vec<VerifiedPhoto>,
    pub review_status: ReviewStatus,
    pub verification: ListingVerification,
}

/// Changes to apply to a listing. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ListingEdit {
    pub title: Option<String>,
    pub category: Option<String>,
    pub location: Option<Coordinates>,
    pub photos: Option<Vec<VerifiedPhoto>>,
}

/// What an edit changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditOutcome {
    pub photos_changed: bool,
    pub category_changed: bool,
    pub location_changed: bool,
    /// The listing was approved and has been sent back to review.
    pub returned_to_review: bool,
}

impl EditOutcome {
    pub fn affects_verification(&self) -> bool {
        self.photos_changed || self.category_changed || self.location_changed
    }
}

impl ListingDraft {
    pub fn new(title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            category: category.into(),
            location: None,
            photos: Vec::new(),
            review_status: ReviewStatus::Pending,
            verification: ListingVerification::default(),
        }
    }

    pub fn cover_photo(&self) -> Option<&VerifiedPhoto> {
        self.photos.first()
    }

    /// Attach a photo, verifying it against the current location.
    pub fn add_photo<C: Clock>(
        &mut self,
        image: impl Into<String>,
        fingerprint: Option<String>,
        metadata: PhotoMetadata,
        verifier: &Verifier<C>,
    ) -> &VerifiedPhoto {
        let photo = VerifiedPhoto::new(image, fingerprint, metadata, self.location.as_ref(), verifier);
        self.photos.push(photo);
        &self.photos[self.photos.len() - 1]
    }

    /// Set the claimed location and re-verify every photo against it. Moving an
    /// approved listing sends it back to review.
    pub fn set_location<C: Clock>(&mut self, location: Coordinates, verifier: &Verifier<C>) {
        let moved = self.location != Some(location);
        self.location = Some(location);
        self.refresh_verification(verifier);
        if moved {
            self.return_to_review();
        }
    }

    /// Append already-verified photos (e.g. from a batch) as an edit of the
    /// photo set.
    pub fn attach_photos<C: Clock>(
        &mut self,
        photos: impl IntoIterator<Item = VerifiedPhoto>,
        verifier: &Verifier<C>,
    ) -> EditOutcome {
        let mut all = self.photos.clone();
        all.extend(photos);
        self.apply_edit(
            ListingEdit {
                photos: Some(all),
                ..ListingEdit::default()
            },
            verifier,
        )
    }

    /// Recompute each photo against the current location and promote the
    /// best result to the listing fields.
    pub fn refresh_verification<C: Clock>(&mut self, verifier: &Verifier<C>) {
        let reference = self.location;
        for photo in &mut self.photos {
            photo.reverify(reference.as_ref(), verifier);
        }

        self.verification = match best_photo(&self.photos) {
            Some(best) => ListingVerification::from_photo(best, verifier.now()),
            None => ListingVerification::default(),
        };
    }

    /// Final verification pass before the draft goes to review.
    pub fn submit<C: Clock>(&mut self, verifier: &Verifier<C>) {
        self.refresh_verification(verifier);
        self.review_status = ReviewStatus::Pending;
        tracing::info!(
            listing = ?self.id,
            photos = self.photos.len(),
            status = ?self.verification.verification_status,
            "Listing submitted for review"
        );
    }

    pub fn approve(&mut self) {
        self.review_status = ReviewStatus::Approved;
    }

    pub fn reject(&mut self) {
        self.review_status = ReviewStatus::Rejected;
    }

    /// Apply an edit. Changing photos, category or location of an approved
    /// listing sends it back to review with its verification cleared.
    pub fn apply_edit<C: Clock>(&mut self, edit: ListingEdit, verifier: &Verifier<C>) -> EditOutcome {
        let mut outcome = EditOutcome::default();

        if let Some(title) = edit.title {
            self.title = title;
        }

        if let Some(category) = edit.category {
            outcome.category_changed = category != self.category;
            self.category = category;
        }

        if let Some(location) = edit.location {
            outcome.location_changed = self.location != Some(location);
            self.location = Some(location);
        }

        if let Some(photos) = edit.photos {
            outcome.photos_changed = photo_set(&photos) != photo_set(&self.photos);
            self.photos = photos;
        }

        if outcome.location_changed || outcome.photos_changed {
            self.refresh_verification(verifier);
        }

        if outcome.affects_verification() {
            outcome.returned_to_review = self.return_to_review();
        }

        outcome
    }

    /// Approved listings go back to pending with verification cleared.
    fn return_to_review(&mut self) -> bool {
        if self.review_status != ReviewStatus::Approved {
            return false;
        }
        self.review_status = ReviewStatus::Pending;
        self.verification = ListingVerification::default();
        tracing::info!(listing = ?self.id, "Approved listing edited, returned to review");
        true
    }

    pub fn badge(&self) -> Option<Badge> {
        self.verification.verification_status.map(Badge::for_status)
    }

    /// Badge to show for the listing. A pending listing with photos but no
    /// verification fields was sent back after an edit and awaits re-review.
    pub fn display_badge(&self) -> Option<Badge> {
        self.badge().or_else(|| {
            (self.review_status == ReviewStatus::Pending && !self.photos.is_empty())
                .then(Badge::pending_review)
        })
    }

    /// True when the listing's best photo has aged out.
    pub fn requires_reverification(&self) -> bool {
        best_photo(&self.photos)
            .map(|p| p.verification.requires_reverification)
            .unwrap_or(false)
    }
}

fn photo_set(photos: &[VerifiedPhoto]) -> Vec<&str> {
    let mut ids: Vec<&str> = photos.iter().map(VerifiedPhoto::identity).collect();
    ids.sort_unstable();
    ids
}

/// Storage for listing drafts.
pub trait DraftStore {
    /// Insert or update a draft, assigning its id on first save.
    fn save_draft(&self, draft: &mut ListingDraft) -> Result<i64>;

    fn load_draft(&self, id: i64) -> Result<Option<ListingDraft>>;

    fn list_drafts(&self) -> Result<Vec<ListingDraft>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerificationConfig;
    use crate::metadata::CaptureMethod;
    use crate::verify::FixedClock;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn verifier() -> Verifier<FixedClock> {
        Verifier::with_clock(VerificationConfig::default(), FixedClock(now()))
    }

    fn site() -> Coordinates {
        Coordinates::new(53.48, -2.24)
    }

    fn meta(method: CaptureMethod, gps: Option<Coordinates>, age_days: Option<i64>) -> PhotoMetadata {
        PhotoMetadata {
            gps_coordinates: gps,
            timestamp: age_days.map(|d| now() - Duration::days(d)),
            device_info: None,
            capture_method: method,
            file_name: "photo.jpg".to_string(),
        }
    }

    #[test]
    fn test_location_set_after_upload_upgrades_photo() {
        let v = verifier();
        let mut draft = ListingDraft::new("Baled PET", "plastics");

        draft.add_photo("a.jpg", None, meta(CaptureMethod::Camera, Some(site()), Some(0)), &v);
        assert_eq!(draft.photos[0].verification.status, VerificationStatus::SelfReported);
        assert!(!draft.photos[0].verification.distance_known());

        draft.set_location(site(), &v);
        assert_eq!(draft.photos[0].verification.status, VerificationStatus::VerifiedOnsite);
        assert_eq!(draft.verification.verification_status, Some(VerificationStatus::VerifiedOnsite));
        assert!(draft.verification.location_verified);
        assert_eq!(draft.verification.last_verified_at, Some(now()));
    }

    #[test]
    fn test_moving_location_downgrades_photo() {
        let v = verifier();
        let mut draft = ListingDraft::new("Scrap copper", "metals");
        draft.set_location(site(), &v);
        draft.add_photo("a.jpg", None, meta(CaptureMethod::Camera, Some(site()), Some(0)), &v);
        draft.refresh_verification(&v);
        assert_eq!(draft.verification.verification_status, Some(VerificationStatus::VerifiedOnsite));

        draft.set_location(Coordinates::new(51.5, -0.12), &v);
        assert_eq!(draft.verification.verification_status, Some(VerificationStatus::SelfReported));
        assert!(!draft.verification.location_verified);
    }

    #[test]
    fn test_best_photo_promoted_to_listing() {
        let v = verifier();
        let mut draft = ListingDraft::new("Cardboard", "paper");
        draft.location = Some(site());

        draft.add_photo("old.jpg", None, meta(CaptureMethod::Upload, None, None), &v);
        draft.add_photo("far.jpg", None, meta(CaptureMethod::Upload, Some(Coordinates::new(53.6, -2.24)), Some(2)), &v);
        draft.add_photo("live.jpg", None, meta(CaptureMethod::Camera, Some(site()), Some(0)), &v);
        draft.submit(&v);

        assert_eq!(draft.cover_photo().unwrap().image, "old.jpg");
        assert_eq!(draft.verification.verification_status, Some(VerificationStatus::VerifiedOnsite));
        assert!(draft.verification.distance_from_listing.unwrap() < 0.01);
        assert_eq!(draft.review_status, ReviewStatus::Pending);
    }

    #[test]
    fn test_no_photos_clears_listing_fields() {
        let v = verifier();
        let mut draft = ListingDraft::new("Glass cullet", "glass");
        draft.set_location(site(), &v);
        assert_eq!(draft.verification, ListingVerification::default());
        assert!(draft.badge().is_none());
    }

    #[test]
    fn test_edit_after_approval_returns_to_review() {
        let v = verifier();
        let mut draft = ListingDraft::new("HDPE regrind", "plastics");
        draft.set_location(site(), &v);
        draft.add_photo("a.jpg", None, meta(CaptureMethod::Camera, Some(site()), Some(0)), &v);
        draft.submit(&v);
        draft.approve();

        let outcome = draft.apply_edit(
            ListingEdit {
                location: Some(Coordinates::new(53.50, -2.24)),
                ..ListingEdit::default()
            },
            &v,
        );

        assert!(outcome.location_changed);
        assert!(outcome.returned_to_review);
        assert_eq!(draft.review_status, ReviewStatus::Pending);
        assert_eq!(draft.verification, ListingVerification::default());
        assert_eq!(draft.display_badge(), Some(Badge::pending_review()));

        // Resubmitting recomputes against the new location
        draft.submit(&v);
        assert_eq!(draft.verification.verification_status, Some(VerificationStatus::SelfReported));
        assert!((draft.verification.distance_from_listing.unwrap() - 2.22).abs() < 0.05);
    }

    #[test]
    fn test_set_location_on_approved_listing_returns_to_review() {
        let v = verifier();
        let mut draft = ListingDraft::new("Steel offcuts", "metals");
        draft.set_location(Coordinates::new(10.0, 10.0), &v);
        draft.approve();

        draft.set_location(Coordinates::new(10.0, 10.0), &v);
        assert_eq!(draft.review_status, ReviewStatus::Approved);

        draft.set_location(Coordinates::new(20.0, 20.0), &v);
        assert_eq!(draft.review_status, ReviewStatus::Pending);
        assert_eq!(draft.location, Some(Coordinates::new(20.0, 20.0)));
        assert_eq!(draft.verification, ListingVerification::default());
    }

    #[test]
    fn test_attached_photos_after_approval_return_to_review() {
        let v = verifier();
        let mut draft = ListingDraft::new("Copper pipe", "metals");
        draft.set_location(site(), &v);
        draft.approve();

        let extra = VerifiedPhoto::new("b.jpg", None, meta(CaptureMethod::Upload, None, None), Some(&site()), &v);
        let outcome = draft.attach_photos(vec![extra], &v);

        assert!(outcome.photos_changed);
        assert!(outcome.returned_to_review);
        assert_eq!(draft.photos.len(), 1);
        assert_eq!(draft.review_status, ReviewStatus::Pending);
        assert!(draft.verification.verification_status.is_none());
    }

    #[test]
    fn test_attached_photos_on_pending_listing_are_aggregated() {
        let v = verifier();
        let mut draft = ListingDraft::new("Copper pipe", "metals");
        draft.set_location(site(), &v);

        let live = VerifiedPhoto::new("a.jpg", None, meta(CaptureMethod::Camera, Some(site()), Some(0)), Some(&site()), &v);
        let outcome = draft.attach_photos(vec![live], &v);

        assert!(!outcome.returned_to_review);
        assert_eq!(draft.verification.verification_status, Some(VerificationStatus::VerifiedOnsite));
    }

    #[test]
    fn test_category_change_after_approval_returns_to_review() {
        let v = verifier();
        let mut draft = ListingDraft::new("Mixed metals", "metals");
        draft.approve();

        let outcome = draft.apply_edit(
            ListingEdit {
                category: Some("e-waste".to_string()),
                ..ListingEdit::default()
            },
            &v,
        );
        assert!(outcome.returned_to_review);
        assert_eq!(draft.review_status, ReviewStatus::Pending);
    }

    #[test]
    fn test_title_edit_keeps_approval() {
        let v = verifier();
        let mut draft = ListingDraft::new("Pallets", "wood");
        draft.set_location(site(), &v);
        draft.add_photo("a.jpg", None, meta(CaptureMethod::Camera, Some(site()), Some(0)), &v);
        draft.submit(&v);
        draft.approve();

        let outcome = draft.apply_edit(
            ListingEdit {
                title: Some("Euro pallets".to_string()),
                category: Some("wood".to_string()),
                location: Some(site()),
                ..ListingEdit::default()
            },
            &v,
        );

        assert!(!outcome.affects_verification());
        assert_eq!(draft.review_status, ReviewStatus::Approved);
        assert_eq!(draft.verification.verification_status, Some(VerificationStatus::VerifiedOnsite));
        assert_eq!(draft.title, "Euro pallets");
    }

    #[test]
    fn test_reordered_photos_are_not_a_change() {
        let v = verifier();
        let mut draft = ListingDraft::new("Tyres", "rubber");
        draft.set_location(site(), &v);
        draft.add_photo("a.jpg", Some("aaa".to_string()), meta(CaptureMethod::Camera, Some(site()), Some(0)), &v);
        draft.add_photo("b.jpg", Some("bbb".to_string()), meta(CaptureMethod::Upload, None, None), &v);
        draft.approve();

        let mut reordered = draft.photos.clone();
        reordered.reverse();
        let outcome = draft.apply_edit(
            ListingEdit {
                photos: Some(reordered),
                ..ListingEdit::default()
            },
            &v,
        );

        assert!(!outcome.photos_changed);
        assert_eq!(draft.review_status, ReviewStatus::Approved);
        assert_eq!(draft.cover_photo().unwrap().image, "b.jpg");
    }

    #[test]
    fn test_requires_reverification_when_best_photo_expired() {
        let v = verifier();
        let mut draft = ListingDraft::new("Aluminium cans", "metals");
        draft.set_location(site(), &v);
        draft.add_photo("a.jpg", None, meta(CaptureMethod::Camera, Some(site()), Some(60)), &v);
        draft.refresh_verification(&v);

        assert_eq!(draft.verification.verification_status, Some(VerificationStatus::Expired));
        assert!(draft.requires_reverification());
    }

    #[test]
    fn test_review_status_parse() {
        assert_eq!(ReviewStatus::parse("approved"), Some(ReviewStatus::Approved));
        assert_eq!(ReviewStatus::parse(ReviewStatus::Rejected.as_str()), Some(ReviewStatus::Rejected));
        assert_eq!(ReviewStatus::parse("draft"), None);
    }
}
