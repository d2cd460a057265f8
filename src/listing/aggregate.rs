use super::VerifiedPhoto;

/// The most trusted photo, by `VerifiedOnsite > SelfReported > Unverified > Expired`.
/// Ties go to the earlier photo.
pub fn best_photo(photos: &[VerifiedPhoto]) -> Option<&VerifiedPhoto> {
    photos.iter().fold(None, |best: Option<&VerifiedPhoto>, photo| match best {
        Some(current) if current.verification.status >= photo.verification.status => Some(current),
        _ => Some(photo),
    })
}
