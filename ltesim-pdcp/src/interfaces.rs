//! Collaborator interfaces of the PDCP entity.
//!
//! The entity borrows its collaborators per call and never owns them: the
//! RLC below it, and the upper layer (RRC for SRBs, the IP gateway for
//! DRBs) above it. Buffer handover is a move in both directions.

use ltesim_common::ByteBuffer;

/// The RLC layer below PDCP.
pub trait RlcInterface {
    /// Submits an outbound PDCP PDU for transmission.
    fn write_sdu(&mut self, lcid: u32, sdu: ByteBuffer);

    /// True if the RLC transmission queue for this channel is full.
    fn sdu_queue_is_full(&self, lcid: u32) -> bool;

    /// True if the channel is mapped to RLC-UM.
    fn rb_is_um(&self, lcid: u32) -> bool;

    /// Asks RLC to discard a not-yet-transmitted SDU by PDCP SN.
    fn discard_sdu(&mut self, lcid: u32, sn: u32);
}

/// The layer above PDCP: RRC for signalling bearers, the IP gateway for
/// data bearers.
pub trait UpperLayer {
    /// Delivers a deciphered SDU upward.
    fn write_pdu(&mut self, lcid: u32, pdu: ByteBuffer);
}
