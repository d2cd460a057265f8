//! Display badges for verification states.

use serde::Serialize;

use crate::verify::VerificationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeColor {
    Green,
    Yellow,
    Red,
    Orange,
    Gray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub label: &'static str,
    pub color: BadgeColor,
    pub icon: &'static str,
    pub description: &'static str,
}

impl Badge {
    pub fn for_status(status: VerificationStatus) -> Self {
        match status {
            VerificationStatus::VerifiedOnsite => Badge {
                label: "Verified On-Site",
                color: BadgeColor::Green,
                icon: "✓",
                description: "Photo taken recently with the in-app camera at the listing location",
            },
            VerificationStatus::SelfReported => Badge {
                label: "Self-Reported",
                color: BadgeColor::Yellow,
                icon: "⚠",
                description: "Photo location is as reported by the seller",
            },
            VerificationStatus::Unverified => Badge {
                label: "Unverified",
                color: BadgeColor::Gray,
                icon: "?",
                description: "Photo has no location or time information",
            },
            VerificationStatus::Expired => Badge {
                label: "Expired",
                color: BadgeColor::Red,
                icon: "⏱",
                description: "Photo is too old and needs to be re-verified",
            },
        }
    }

    /// Badge for a listing sent back to review after a verification-relevant edit.
    pub fn pending_review() -> Self {
        Badge {
            label: "Pending Review",
            color: BadgeColor::Orange,
            icon: "↻",
            description: "Listing changed after approval and awaits re-review",
        }
    }
}

impl From<VerificationStatus> for Badge {
    fn from(status: VerificationStatus) -> Self {
        Badge::for_status(status)
    }
}
