use crate::config::VerificationConfig;
use crate::metadata::{CaptureMethod, PhotoMetadata};

use super::{PhotoAge, VerificationStatus};

/// Decide a photo's trust tier. Rules are checked in order, first match wins:
///
/// 1. older than the expiry age: `Expired`
/// 2. no GPS: `SelfReported` for camera captures, `Unverified` otherwise
/// 3. camera capture, location match, not older than the warning age: `VerifiedOnsite`
/// 4. anything else: `SelfReported`
pub fn classify(
    metadata: &PhotoMetadata,
    location_match: bool,
    age: PhotoAge,
    config: &VerificationConfig,
) -> VerificationStatus {
    if age.is_older_than(config.expiry_age_days) {
        return VerificationStatus::Expired;
    }

    if !metadata.has_gps() {
        return match metadata.capture_method {
            CaptureMethod::Camera => VerificationStatus::SelfReported,
            CaptureMethod::Upload => VerificationStatus::Unverified,
        };
    }

    if metadata.capture_method == CaptureMethod::Camera
        && location_match
        && !age.is_older_than(config.warning_age_days)
    {
        return VerificationStatus::VerifiedOnsite;
    }

    VerificationStatus::SelfReported
}
