use sha2::{Digest, Sha256};

/// SHA-256 of image content, hex encoded. Identifies a photo across edits.
pub fn fingerprint(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
