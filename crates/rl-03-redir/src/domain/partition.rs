//! # Ring Partitioning
//!
//! Level `l` splits the identifier ring into `2^l` equal buckets. The bucket
//! of an id is its top `l` bits.

use shared_types::OverlayIdentifier;

/// Bucket of `id` at `level`. Level 0 is a single bucket.
///
/// `level` must not exceed 63 so the index fits a `u64`; `RedirConfig`
/// enforces this.
#[must_use]
pub fn partition_index(level: u32, id: &OverlayIdentifier) -> u64 {
    if level == 0 {
        return 0;
    }
    (*id >> (OverlayIdentifier::BITS - level)).low_u64()
}
