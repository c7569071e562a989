//! LTE PDCP bearer entity (3GPP TS 36.323) for ltesim
//!
//! This crate implements the per-bearer PDCP state machine: SN assignment
//! and COUNT/HFN arithmetic, data-PDU framing with SRB integrity, the three
//! receive variants (SRB, DRB over RLC-UM, DRB over RLC-AM), the
//! retransmission queue with discard timers, status reports, and the
//! reestablishment/handover lifecycle. Ciphering and integrity algorithms
//! are supplied by the caller through [`security::SecurityProvider`]; the
//! RLC below and the upper layers are reached through the traits in
//! [`interfaces`].

pub mod config;
pub mod entity;
pub mod interfaces;
pub mod pdu;
pub mod security;
pub mod state;
pub mod timers;

pub use config::{DiscardTimer, PdcpConfig, SnLen};
pub use entity::PdcpEntity;
pub use interfaces::{RlcInterface, UpperLayer};
pub use security::{Direction, NullSecurity, SecurityDirection, SecurityProvider};
pub use state::PdcpState;
