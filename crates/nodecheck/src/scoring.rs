//! Score weights and tier tables.
//!
//! Each node's score is the sum of the points its sub-checks award, clamped
//! to [`MAX_SCORE`]. The weights of each node add up to exactly 100 when
//! every sub-check lands in its top tier.

use serde::Serialize;

pub const MAX_SCORE: u8 = 100;

pub const CONSENSUS_HEALTH: u8 = 25;
pub const CONSENSUS_SYNCED: u8 = 30;
pub const CONSENSUS_SYNCING: u8 = 10;

pub const EXECUTION_CHAIN_ID: u8 = 20;
pub const EXECUTION_CHAIN_ID_MISMATCH: u8 = 5;
pub const EXECUTION_SYNCED: u8 = 25;
pub const EXECUTION_SYNCING_NEAR_HEAD: u8 = 15;
pub const EXECUTION_SYNCING_FAR_BEHIND: u8 = 5;
pub const EXECUTION_BLOCK_HEIGHT: u8 = 10;

/// Minimum connected peers per tier, highest first
pub const PEER_TIERS: [(u64, u8); 3] = [(20, 25), (10, 15), (3, 5)];

/// Exclusive upper latency bound (ms) per tier, fastest first
pub const LATENCY_TIERS_MS: [(f64, u8); 3] = [(300.0, 20), (800.0, 12), (2000.0, 5)];

/// Which tier a measurement landed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Zero,
    Minimal,
    Partial,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Award {
    pub points: u8,
    pub grade: Grade,
}

const GRADES: [Grade; 3] = [Grade::Full, Grade::Partial, Grade::Minimal];

pub fn peer_award(peers: u64) -> Award {
    PEER_TIERS
        .iter()
        .zip(GRADES)
        .find(|((minimum, _), _)| peers >= *minimum)
        .map(|(&(_, points), grade)| Award { points, grade })
        .unwrap_or(Award { points: 0, grade: Grade::Zero })
}

pub fn latency_award(latency_ms: f64) -> Award {
    LATENCY_TIERS_MS
        .iter()
        .zip(GRADES)
        .find(|((bound, _), _)| latency_ms < *bound)
        .map(|(&(_, points), grade)| Award { points, grade })
        .unwrap_or(Award { points: 0, grade: Grade::Zero })
}

/// Add `points` to `current`, never exceeding [`MAX_SCORE`]
pub fn accumulate(current: u8, points: u8) -> u8 {
    current.saturating_add(points).min(MAX_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_tier_weights_sum_to_max() {
        let consensus = CONSENSUS_HEALTH + CONSENSUS_SYNCED + PEER_TIERS[0].1 + LATENCY_TIERS_MS[0].1;
        let execution = EXECUTION_CHAIN_ID
            + EXECUTION_SYNCED
            + EXECUTION_BLOCK_HEIGHT
            + PEER_TIERS[0].1
            + LATENCY_TIERS_MS[0].1;

        assert_eq!(consensus, MAX_SCORE);
        assert_eq!(execution, MAX_SCORE);
    }

    #[test]
    fn test_peer_tiers() {
        assert_eq!(peer_award(50), Award { points: 25, grade: Grade::Full });
        assert_eq!(peer_award(20), Award { points: 25, grade: Grade::Full });
        assert_eq!(peer_award(19), Award { points: 15, grade: Grade::Partial });
        assert_eq!(peer_award(3), Award { points: 5, grade: Grade::Minimal });
        assert_eq!(peer_award(2), Award { points: 0, grade: Grade::Zero });
    }

    #[test]
    fn test_latency_tiers() {
        assert_eq!(latency_award(12.0).grade, Grade::Full);
        assert_eq!(latency_award(300.0).grade, Grade::Partial);
        assert_eq!(latency_award(1999.9).points, 5);
        assert_eq!(latency_award(2000.0), Award { points: 0, grade: Grade::Zero });
    }

    #[test]
    fn test_accumulate_clamps() {
        assert_eq!(accumulate(90, 25), MAX_SCORE);
        assert_eq!(accumulate(250, 10), MAX_SCORE);
        assert_eq!(accumulate(10, 0), 10);
    }

    #[test]
    fn test_awards_are_monotonic() {
        let mut previous = 0;
        for peers in 0..40 {
            let points = peer_award(peers).points;
            assert!(points >= previous);
            previous = points;
        }
    }
}
