//! Core radio-bearer types shared across the ltesim crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Radio bearer class.
///
/// Signalling Radio Bearers (SRBs) carry RRC messages and are integrity
/// protected; Data Radio Bearers (DRBs) carry user-plane traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RbType {
    /// Signalling Radio Bearer
    Srb,
    /// Data Radio Bearer
    Drb,
}

impl RbType {
    /// Returns true for a signalling bearer.
    pub fn is_srb(self) -> bool {
        self == RbType::Srb
    }

    /// Returns true for a data bearer.
    pub fn is_drb(self) -> bool {
        self == RbType::Drb
    }
}

impl fmt::Display for RbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RbType::Srb => write!(f, "SRB"),
            RbType::Drb => write!(f, "DRB"),
        }
    }
}

/// RLC mode the bearer is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RlcMode {
    /// Acknowledged Mode
    Am,
    /// Unacknowledged Mode
    Um,
}

impl RlcMode {
    /// Returns true for Unacknowledged Mode.
    pub fn is_um(self) -> bool {
        self == RlcMode::Um
    }

    /// Returns true for Acknowledged Mode.
    pub fn is_am(self) -> bool {
        self == RlcMode::Am
    }
}

impl fmt::Display for RlcMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RlcMode::Am => write!(f, "AM"),
            RlcMode::Um => write!(f, "UM"),
        }
    }
}
