//! Security seam between the PDCP entity and the cryptographic algorithms.
//!
//! The entity never runs ciphering or integrity itself: it hands the
//! (data, COUNT, bearer, direction) tuple to a [`SecurityProvider`], which
//! owns the keys and the algorithm choice. Integrity produces the 4-byte
//! MAC-I appended to SRB PDUs; ciphering is applied in place.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Link direction of a protected PDU, as fed to the security algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// UE to network
    Uplink,
    /// Network to UE
    Downlink,
}

impl Direction {
    /// The 1-bit DIRECTION input of the 3GPP algorithms.
    pub fn as_bit(self) -> u8 {
        match self {
            Direction::Uplink => 0,
            Direction::Downlink => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Uplink => write!(f, "UL"),
            Direction::Downlink => write!(f, "DL"),
        }
    }
}

/// Which directions of the entity currently apply integrity or ciphering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityDirection {
    /// Security not applied
    #[default]
    None,
    /// Applied on transmit only
    Tx,
    /// Applied on receive only
    Rx,
    /// Applied in both directions
    TxRx,
}

impl SecurityDirection {
    /// True if the transmit direction is protected.
    pub fn has_tx(self) -> bool {
        matches!(self, SecurityDirection::Tx | SecurityDirection::TxRx)
    }

    /// True if the receive direction is protected.
    pub fn has_rx(self) -> bool {
        matches!(self, SecurityDirection::Rx | SecurityDirection::TxRx)
    }

    /// Adds the transmit direction to the current setting.
    pub fn with_tx(self) -> Self {
        if self.has_rx() {
            SecurityDirection::TxRx
        } else {
            SecurityDirection::Tx
        }
    }

    /// Adds the receive direction to the current setting.
    pub fn with_rx(self) -> Self {
        if self.has_tx() {
            SecurityDirection::TxRx
        } else {
            SecurityDirection::Rx
        }
    }
}

impl fmt::Display for SecurityDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityDirection::None => write!(f, "none"),
            SecurityDirection::Tx => write!(f, "tx"),
            SecurityDirection::Rx => write!(f, "rx"),
            SecurityDirection::TxRx => write!(f, "tx/rx"),
        }
    }
}

/// MAC-I length in bytes.
pub const MAC_LEN: usize = 4;

/// Integrity and ciphering operations over a (COUNT, bearer, direction)
/// tuple. Implementations hold the keys.
pub trait SecurityProvider {
    /// Computes the 4-byte MAC-I over `data`.
    fn integrity_generate(
        &self,
        data: &[u8],
        count: u32,
        bearer: u8,
        direction: Direction,
    ) -> [u8; MAC_LEN];

    /// Verifies a received MAC-I. The default recomputes and compares.
    fn integrity_verify(
        &self,
        data: &[u8],
        count: u32,
        bearer: u8,
        direction: Direction,
        mac: &[u8; MAC_LEN],
    ) -> bool {
        self.integrity_generate(data, count, bearer, direction) == *mac
    }

    /// Ciphers `data` in place.
    fn cipher_encrypt(&self, data: &mut [u8], count: u32, bearer: u8, direction: Direction);

    /// Deciphers `data` in place.
    fn cipher_decrypt(&self, data: &mut [u8], count: u32, bearer: u8, direction: Direction);
}

/// The EEA0/EIA0-style null provider: no ciphering, all-zero MAC.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSecurity;

impl SecurityProvider for NullSecurity {
    fn integrity_generate(&self, _: &[u8], _: u32, _: u8, _: Direction) -> [u8; MAC_LEN] {
        [0; MAC_LEN]
    }

    fn integrity_verify(&self, _: &[u8], _: u32, _: u8, _: Direction, _: &[u8; MAC_LEN]) -> bool {
        true
    }

    fn cipher_encrypt(&self, _: &mut [u8], _: u32, _: u8, _: Direction) {}

    fn cipher_decrypt(&self, _: &mut [u8], _: u32, _: u8, _: Direction) {}
}
