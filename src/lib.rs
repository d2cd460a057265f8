//! Photo location verification for waste-trading marketplace listings.
//!
//! Photos attached to a listing are checked against the listing's claimed
//! location using their embedded GPS and capture time, and graded into
//! verified on-site, self-reported, unverified or expired.

pub mod badge;
pub mod config;
pub mod db;
pub mod export;
pub mod geo;
pub mod listing;
pub mod logging;
pub mod metadata;
pub mod scanner;
pub mod verify;

pub use badge::{Badge, BadgeColor};
pub use config::{Config, VerificationConfig};
pub use geo::{distance_km, Coordinates, GeoError};
pub use listing::{DraftStore, ListingDraft, ListingEdit, VerifiedPhoto};
pub use metadata::{extract, CaptureMethod, ImageSource, PhotoMetadata};
pub use verify::{
    Clock, FixedClock, SystemClock, VerificationResult, VerificationStatus, Verifier,
};
