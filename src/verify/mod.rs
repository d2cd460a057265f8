//! Photo location verification.
//!
//! Compares a photo's position against the listing's claimed location and
//! assigns a trust tier. The verifier is a total function: every metadata
//! combination maps to a status, missing data is carried as sentinels.

mod classifier;
mod details;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::VerificationConfig;
use crate::geo::{distance_km, Coordinates};
use crate::metadata::{CaptureMethod, PhotoMetadata};

pub use classifier::classify;
pub use details::describe;

/// Distance reported when the photo carries no position.
pub const UNKNOWN_DISTANCE_KM: f64 = 999.0;

/// Age reported when an uploaded photo carries no capture time.
pub const UNKNOWN_AGE_DAYS: i64 = 999;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    VerifiedOnsite,
    SelfReported,
    Unverified,
    Expired,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::VerifiedOnsite => "VERIFIED_ONSITE",
            VerificationStatus::SelfReported => "SELF_REPORTED",
            VerificationStatus::Unverified => "UNVERIFIED",
            VerificationStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "VERIFIED_ONSITE" => Some(VerificationStatus::VerifiedOnsite),
            "SELF_REPORTED" => Some(VerificationStatus::SelfReported),
            "UNVERIFIED" => Some(VerificationStatus::Unverified),
            "EXPIRED" => Some(VerificationStatus::Expired),
            _ => None,
        }
    }

    fn trust_rank(&self) -> u8 {
        match self {
            VerificationStatus::VerifiedOnsite => 3,
            VerificationStatus::SelfReported => 2,
            VerificationStatus::Unverified => 1,
            VerificationStatus::Expired => 0,
        }
    }
}

/// Ordered by trust: `VerifiedOnsite > SelfReported > Unverified > Expired`.
impl Ord for VerificationStatus {
    fn cmp(&self, other: &Self) -> Ordering {
        self.trust_rank().cmp(&other.trust_rank())
    }
}

impl PartialOrd for VerificationStatus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Age of a photo in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoAge {
    Days(i64),
    /// Uploaded photo with no capture time.
    Unknown,
}

impl PhotoAge {
    /// Age in days, with `UNKNOWN_AGE_DAYS` standing in for an unknown age.
    pub fn days(&self) -> i64 {
        match self {
            PhotoAge::Days(d) => *d,
            PhotoAge::Unknown => UNKNOWN_AGE_DAYS,
        }
    }

    /// Strictly older than `limit` days. An unknown age is never older, so it
    /// cannot force a status on its own.
    pub fn is_older_than(&self, limit: i64) -> bool {
        matches!(self, PhotoAge::Days(d) if *d > limit)
    }
}

/// Compute the whole-day age of a photo at `now`.
///
/// Live camera captures without an embedded timestamp are taken as current.
pub fn photo_age(metadata: &PhotoMetadata, now: DateTime<Utc>) -> PhotoAge {
    match metadata.timestamp {
        Some(taken) => {
            let elapsed = now.signed_duration_since(taken).num_milliseconds();
            PhotoAge::Days(elapsed.div_euclid(MILLIS_PER_DAY))
        }
        None if metadata.capture_method == CaptureMethod::Camera => PhotoAge::Days(0),
        None => PhotoAge::Unknown,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub location_match: bool,
    /// Kilometers; `UNKNOWN_DISTANCE_KM` when unknown.
    pub distance_from_listing: f64,
    /// Days; `UNKNOWN_AGE_DAYS` when unknown.
    pub photo_age: i64,
    pub requires_reverification: bool,
    pub verification_details: String,
}

impl VerificationResult {
    /// Result used while the listing has no location to compare against.
    pub fn location_not_set() -> Self {
        Self {
            status: VerificationStatus::SelfReported,
            location_match: false,
            distance_from_listing: UNKNOWN_DISTANCE_KM,
            photo_age: 0,
            requires_reverification: false,
            verification_details: details::LOCATION_NOT_SET.to_string(),
        }
    }

    pub fn distance_known(&self) -> bool {
        self.distance_from_listing != UNKNOWN_DISTANCE_KM
    }
}

/// Runs extraction output through distance, age and classification.
#[derive(Debug, Clone)]
pub struct Verifier<C = SystemClock> {
    config: VerificationConfig,
    clock: C,
}

impl Verifier<SystemClock> {
    pub fn new(config: VerificationConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Verifier<C> {
    pub fn with_clock(config: VerificationConfig, clock: C) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Verify a photo against the listing's location at the clock's current time.
    pub fn verify(
        &self,
        metadata: &PhotoMetadata,
        reference: Option<&Coordinates>,
    ) -> VerificationResult {
        self.verify_at(metadata, reference, self.clock.now())
    }

    pub fn verify_at(
        &self,
        metadata: &PhotoMetadata,
        reference: Option<&Coordinates>,
        now: DateTime<Utc>,
    ) -> VerificationResult {
        let reference = match reference {
            Some(r) => r,
            None => return VerificationResult::location_not_set(),
        };

        let age = photo_age(metadata, now);

        let (distance, location_match) = match metadata.gps_coordinates {
            Some(ref gps) => {
                let d = distance_km(gps, reference);
                (d, d <= self.config.location_tolerance_km)
            }
            None => (UNKNOWN_DISTANCE_KM, false),
        };

        let status = classify(metadata, location_match, age, &self.config);
        let verification_details = describe(status, metadata, location_match, distance, age);

        tracing::debug!(
            file = %metadata.file_name,
            status = status.as_str(),
            distance_km = distance,
            age_days = age.days(),
            "Verified photo"
        );

        VerificationResult {
            status,
            location_match,
            distance_from_listing: distance,
            photo_age: age.days(),
            requires_reverification: age.days() > self.config.expiry_age_days,
            verification_details,
        }
    }
}
