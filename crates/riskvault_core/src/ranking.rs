//! Connectivity-based risk ranking.
//!
//! # Invariants
//! - Thresholds are strict: `> 10` is high, `> 5` is medium.
//! - `rank` is total and monotonic in `connections`.

use crate::model::risk::RankingTier;

/// Connections above this count rank `High`.
pub const HIGH_THRESHOLD: u32 = 10;
/// Connections above this count (and not above `HIGH_THRESHOLD`) rank `Medium`.
pub const MEDIUM_THRESHOLD: u32 = 5;

/// Maps a note's connectivity count to a severity tier.
pub fn rank(connections: u32) -> RankingTier {
    if connections > HIGH_THRESHOLD {
        RankingTier::High
    } else if connections > MEDIUM_THRESHOLD {
        RankingTier::Medium
    } else {
        RankingTier::Low
    }
}
