use sha2::{Digest, Sha256};

/// Computes a digest of an inbound snapshot file using its raw content.
///
/// The digest is stored with the committed round row as a diagnostic
/// identity of the exact bytes the round was ingested from. It is not the
/// idempotency key: duplicate detection uses the content-derived
/// server/map/end-time key so that a re-submitted, lightly edited copy of a
/// committed round is still caught.
///
/// # Arguments
///
/// * `raw_content` - The raw bytes of the snapshot file.
///
/// # Returns
///
/// A hexadecimal string representation of the SHA-256 digest.
pub fn compute_snapshot_digest(raw_content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_content);
    let result = hasher.finalize();
    hex::encode(result)
}
