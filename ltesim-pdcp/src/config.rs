//! PDCP bearer configuration.
//!
//! Configuration is immutable after entity construction. The legal
//! combinations of SN length, bearer class and RLC mode follow 3GPP
//! TS 36.323: 5-bit SNs are SRB-only, 7-bit SNs require a DRB on RLC-UM,
//! and 12/18-bit SNs are DRB-only.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ltesim_common::{Error, RbType, RlcMode};

use crate::security::Direction;

/// PDCP sequence number length in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SnLen {
    /// 5-bit SN (SRBs)
    Len5,
    /// 7-bit SN (DRBs on RLC-UM)
    Len7,
    /// 12-bit SN (DRBs)
    Len12,
    /// 18-bit SN (DRBs)
    Len18,
}

impl SnLen {
    /// SN width in bits.
    pub fn bits(self) -> u32 {
        match self {
            SnLen::Len5 => 5,
            SnLen::Len7 => 7,
            SnLen::Len12 => 12,
            SnLen::Len18 => 18,
        }
    }

    /// PDCP data-PDU header length in bytes.
    pub fn header_len(self) -> usize {
        match self {
            SnLen::Len5 | SnLen::Len7 => 1,
            SnLen::Len12 => 2,
            SnLen::Len18 => 3,
        }
    }

    /// Largest representable SN.
    pub fn max_sn(self) -> u32 {
        (1 << self.bits()) - 1
    }

    /// Bitmask covering the SN bits.
    pub fn mask(self) -> u32 {
        self.max_sn()
    }
}

impl TryFrom<u8> for SnLen {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            5 => Ok(SnLen::Len5),
            7 => Ok(SnLen::Len7),
            12 => Ok(SnLen::Len12),
            18 => Ok(SnLen::Len18),
            _ => Err(format!("invalid PDCP SN length: {value}")),
        }
    }
}

impl From<SnLen> for u8 {
    fn from(value: SnLen) -> Self {
        value.bits() as u8
    }
}

impl fmt::Display for SnLen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// PDCP discard timer (3GPP TS 36.331 `discardTimer`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscardTimer {
    /// 50 ms
    Ms50,
    /// 100 ms
    Ms100,
    /// 150 ms
    Ms150,
    /// 300 ms
    Ms300,
    /// 500 ms
    Ms500,
    /// 750 ms
    Ms750,
    /// 1500 ms
    Ms1500,
    /// No discard timer
    #[default]
    Infinity,
}

impl DiscardTimer {
    /// Returns the timer duration, or `None` for `Infinity`.
    pub fn duration(self) -> Option<Duration> {
        let ms = match self {
            DiscardTimer::Ms50 => 50,
            DiscardTimer::Ms100 => 100,
            DiscardTimer::Ms150 => 150,
            DiscardTimer::Ms300 => 300,
            DiscardTimer::Ms500 => 500,
            DiscardTimer::Ms750 => 750,
            DiscardTimer::Ms1500 => 1500,
            DiscardTimer::Infinity => return None,
        };
        Some(Duration::from_millis(ms))
    }
}

impl fmt::Display for DiscardTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.duration() {
            Some(d) => write!(f, "{}ms", d.as_millis()),
            None => write!(f, "infinity"),
        }
    }
}

/// Per-bearer PDCP configuration, immutable after entity construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdcpConfig {
    /// Bearer class (SRB or DRB)
    pub rb_type: RbType,
    /// RLC mode the bearer is mapped onto
    pub rlc_mode: RlcMode,
    /// Sequence number length
    pub sn_len: SnLen,
    /// Discard timer for stored SDUs
    #[serde(default)]
    pub discard_timer: DiscardTimer,
    /// Whether status reports are sent on reestablishment
    #[serde(default)]
    pub status_report_required: bool,
    /// Radio bearer identity (input to ciphering and integrity)
    pub bearer_id: u8,
    /// Logical channel this bearer is mapped onto
    pub lcid: u32,
    /// Security direction of transmitted PDUs
    #[serde(default = "default_tx_direction")]
    pub tx_direction: Direction,
    /// Security direction of received PDUs
    #[serde(default = "default_rx_direction")]
    pub rx_direction: Direction,
}

fn default_tx_direction() -> Direction {
    Direction::Uplink
}

fn default_rx_direction() -> Direction {
    Direction::Downlink
}

impl PdcpConfig {
    /// Parses a bearer configuration from YAML and validates it.
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        let cfg: PdcpConfig = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks the SN length against the bearer class and RLC mode.
    pub fn validate(&self) -> Result<(), Error> {
        match self.sn_len {
            SnLen::Len5 => {
                if self.rb_type.is_drb() {
                    return Err(Error::Config(
                        "5-bit SN is only valid on an SRB".to_string(),
                    ));
                }
            }
            SnLen::Len7 => {
                if self.rb_type.is_srb() || self.rlc_mode.is_am() {
                    return Err(Error::Config(
                        "7-bit SN is only valid on a DRB mapped to RLC-UM".to_string(),
                    ));
                }
            }
            SnLen::Len12 | SnLen::Len18 => {
                if self.rb_type.is_srb() {
                    return Err(Error::Config(format!(
                        "{}-bit SN is not valid on an SRB",
                        self.sn_len
                    )));
                }
            }
        }
        if self.rb_type.is_srb() && self.rlc_mode.is_um() {
            return Err(Error::Config("SRBs are mapped to RLC-AM".to_string()));
        }
        Ok(())
    }

    /// Duplicate-detection window: 0 for SRBs, 2048 for DRBs.
    pub fn reordering_window(&self) -> u32 {
        match self.rb_type {
            RbType::Srb => 0,
            RbType::Drb => 2048,
        }
    }

    /// Bearer name used in log lines, e.g. "SRB1" or "DRB2".
    pub fn rb_name(&self) -> String {
        format!("{}{}", self.rb_type, self.bearer_id)
    }
}
