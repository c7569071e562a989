//! PDCP entity state variables and COUNT arithmetic.
//!
//! COUNT is the 32-bit packet counter fed to ciphering and integrity:
//! the hyper-frame number (HFN) in the upper bits, the PDCP SN in the
//! lower `sn_len` bits. The HFN advances every time the SN wraps.

use serde::{Deserialize, Serialize};

use crate::config::SnLen;

/// Composes a 32-bit COUNT from an HFN and an SN.
pub fn count(hfn: u32, sn: u32, sn_len: SnLen) -> u32 {
    (hfn << sn_len.bits()) | (sn & sn_len.mask())
}

/// Extracts the SN component of a COUNT.
pub fn sn_of(count: u32, sn_len: SnLen) -> u32 {
    count & sn_len.mask()
}

/// Extracts the HFN component of a COUNT.
pub fn hfn_of(count: u32, sn_len: SnLen) -> u32 {
    count >> sn_len.bits()
}

/// The five PDCP counters, serialized as-is for handover.
///
/// This record deliberately carries no security material, pending-activation
/// thresholds or queued SDUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdcpState {
    /// SN for the next transmitted PDU
    pub next_tx_sn: u32,
    /// TX hyper-frame number
    pub tx_hfn: u32,
    /// Lowest SN not yet received
    pub next_rx_sn: u32,
    /// RX hyper-frame number
    pub rx_hfn: u32,
    /// Last SN delivered to the upper layer
    pub last_submitted_rx_sn: u32,
}

impl PdcpState {
    /// Initial state for a freshly configured bearer.
    ///
    /// `last_submitted_rx_sn` starts at the maximum SN so that SN 0 is
    /// in-window for the first received PDU.
    pub fn initial(sn_len: SnLen) -> Self {
        Self {
            next_tx_sn: 0,
            tx_hfn: 0,
            next_rx_sn: 0,
            rx_hfn: 0,
            last_submitted_rx_sn: sn_len.max_sn(),
        }
    }
}
