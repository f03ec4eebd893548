//! Feature Layout - Centralized Flow Feature Definition
//!
//! **This file controls the feature schema the model artifacts were fitted on.**
//!
//! ## Rules:
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! Scaler and classifier artifacts are column-ordered. A reordered layout
//! silently feeds the wrong column to every coefficient, so the order here
//! must match the training job exactly.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Flow feature names (CICIDS2017 column names) in vector order
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Flow (0) ===
    "Flow Duration",          // 0: Flow duration in microseconds

    // === Packet counts (1-2) ===
    "Total Fwd Packets",      // 1: Packets in the forward direction
    "Total Backward Packets", // 2: Packets in the backward direction

    // === Rates (3-4) ===
    "Flow Bytes/s",           // 3: Bytes per second
    "Flow Packets/s",         // 4: Packets per second

    // === Packet lengths (5-6) ===
    "Fwd Packet Length Mean", // 5: Mean forward packet size
    "Bwd Packet Length Mean", // 6: Mean backward packet size

    // === Inter-arrival times (7-8) ===
    "Fwd IAT Mean",           // 7: Mean forward inter-arrival time
    "Bwd IAT Mean",           // 8: Mean backward inter-arrival time

    // === Flags (9) ===
    "SYN Flag Count",         // 9: Packets with SYN set
];

/// Total number of features
/// Must match FEATURE_LAYOUT.len()
pub const FEATURE_COUNT: usize = 10;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of the feature layout
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

/// Get layout hash
pub fn layout_hash() -> u32 {
    compute_layout_hash()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Layout information for status endpoints and logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Check a column list declared by an artifact against the layout.
///
/// Returns the first position where the names diverge, or where one list
/// ends before the other.
pub fn first_divergence(names: &[String]) -> Option<usize> {
    let common = names.len().min(FEATURE_COUNT);
    (0..common)
        .find(|&i| names[i] != FEATURE_LAYOUT[i])
        .or_else(|| (names.len() != FEATURE_COUNT).then_some(common))
}

// ============================================================================
// TESTS
// ============================================================================
