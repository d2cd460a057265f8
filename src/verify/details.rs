use crate::metadata::{CaptureMethod, PhotoMetadata};

use super::{PhotoAge, VerificationStatus};

pub const LOCATION_NOT_SET: &str =
    "Self-reported: listing location not set yet, photo location cannot be compared";

/// Human-readable explanation of a verification outcome.
pub fn describe(
    status: VerificationStatus,
    metadata: &PhotoMetadata,
    location_match: bool,
    distance_km: f64,
    age: PhotoAge,
) -> String {
    match status {
        VerificationStatus::VerifiedOnsite => format!(
            "Verified on-site: taken {} ago, {:.1} km from listing location",
            days(age.days()),
            distance_km
        ),
        VerificationStatus::SelfReported => {
            if !metadata.has_gps() {
                "Self-reported: no location data in photo".to_string()
            } else if !location_match {
                format!(
                    "Self-reported: location mismatch by {:.1} km from listing location",
                    distance_km
                )
            } else if metadata.capture_method == CaptureMethod::Upload {
                format!(
                    "Self-reported: uploaded from device, {:.1} km from listing location",
                    distance_km
                )
            } else {
                format!(
                    "Self-reported: taken {} ago, retake on-site for verified status",
                    days(age.days())
                )
            }
        }
        VerificationStatus::Unverified => "Unverified: no metadata available".to_string(),
        VerificationStatus::Expired => format!(
            "Expired: photo is {} old, please re-verify with a new on-site photo",
            days(age.days())
        ),
    }
}

fn days(n: i64) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", n)
    }
}
