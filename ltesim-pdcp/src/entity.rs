//! The per-bearer PDCP entity (3GPP TS 36.323 §5).
//!
//! One entity per radio bearer, sitting between RRC / the IP gateway above
//! and RLC below. The transmit path assigns SNs, derives COUNT, applies
//! integrity (SRBs) and ciphering, and keeps a copy of each DRB/AM SDU
//! until RLC confirms delivery. The receive path estimates COUNT from the
//! received SN, deciphers, verifies (SRBs), and forwards upward; the three
//! bearer flavors (SRB, DRB on RLC-UM, DRB on RLC-AM) differ in how they
//! track the hyper-frame number and detect duplicates.
//!
//! The entity is single-threaded cooperative: `write_sdu`, `write_pdu`,
//! delivery notifications and the timer tick all run on one scheduler, and
//! collaborators are borrowed per call rather than owned.

use std::collections::BTreeMap;
use std::mem;

use tracing::{debug, error, info, warn};

use ltesim_common::logging::{self, log_pdcp_message};
use ltesim_common::{ByteBuffer, Error};

use crate::config::PdcpConfig;
use crate::interfaces::{RlcInterface, UpperLayer};
use crate::pdu;
use crate::security::{SecurityDirection, SecurityProvider, MAC_LEN};
use crate::state::{count, sn_of, PdcpState};
use crate::timers::DiscardTimerManager;

/// A PDCP entity for one radio bearer.
pub struct PdcpEntity {
    cfg: PdcpConfig,
    active: bool,
    st: PdcpState,
    integrity_direction: SecurityDirection,
    encryption_direction: SecurityDirection,
    pending_security_tx_count: Option<u32>,
    pending_security_rx_sn: Option<u32>,
    /// SDU copies awaiting RLC-AM acknowledgement, keyed by TX COUNT.
    undelivered: BTreeMap<u32, ByteBuffer>,
    discard_timers: DiscardTimerManager,
}

impl PdcpEntity {
    /// Creates an entity for the given bearer configuration.
    ///
    /// Refuses construction if the SN length is not legal for the bearer
    /// class and RLC mode.
    pub fn new(cfg: PdcpConfig) -> Result<Self, Error> {
        cfg.validate()?;

        info!(
            bearer = %cfg.rb_name(),
            bearer_id = cfg.bearer_id,
            lcid = cfg.lcid,
            "Init PDCP entity"
        );
        info!(
            sn_len = %cfg.sn_len,
            hdr_len = cfg.sn_len.header_len(),
            reordering_window = cfg.reordering_window(),
            maximum_sn = cfg.sn_len.max_sn(),
            discard_timer = %cfg.discard_timer,
            status_report_required = cfg.status_report_required,
            "PDCP entity configuration"
        );

        let st = PdcpState::initial(cfg.sn_len);
        Ok(Self {
            cfg,
            active: true,
            st,
            integrity_direction: SecurityDirection::None,
            encryption_direction: SecurityDirection::None,
            pending_security_tx_count: None,
            pending_security_rx_sn: None,
            undelivered: BTreeMap::new(),
            discard_timers: DiscardTimerManager::new(),
        })
    }

    // ------------------------------------------------------------------
    // Queries and security management
    // ------------------------------------------------------------------

    /// True until `reset()` is called.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True for a signalling bearer.
    pub fn is_srb(&self) -> bool {
        self.cfg.rb_type.is_srb()
    }

    /// True for a data bearer.
    pub fn is_drb(&self) -> bool {
        self.cfg.rb_type.is_drb()
    }

    /// The bearer configuration.
    pub fn config(&self) -> &PdcpConfig {
        &self.cfg
    }

    /// Bearer name used in log lines.
    pub fn rb_name(&self) -> String {
        self.cfg.rb_name()
    }

    /// Current integrity protection directions.
    pub fn integrity_direction(&self) -> SecurityDirection {
        self.integrity_direction
    }

    /// Current ciphering directions.
    pub fn encryption_direction(&self) -> SecurityDirection {
        self.encryption_direction
    }

    /// Adds a direction to integrity protection.
    pub fn enable_integrity(&mut self, tx: bool, rx: bool) {
        if tx {
            self.integrity_direction = self.integrity_direction.with_tx();
        }
        if rx {
            self.integrity_direction = self.integrity_direction.with_rx();
        }
        debug!(bearer = %self.rb_name(), direction = %self.integrity_direction, "Enabled integrity");
    }

    /// Adds a direction to ciphering.
    pub fn enable_encryption(&mut self, tx: bool, rx: bool) {
        if tx {
            self.encryption_direction = self.encryption_direction.with_tx();
        }
        if rx {
            self.encryption_direction = self.encryption_direction.with_rx();
        }
        debug!(bearer = %self.rb_name(), direction = %self.encryption_direction, "Enabled encryption");
    }

    /// Defers security activation: TX activates at the given COUNT, RX at
    /// the first received PDU carrying the given SN.
    pub fn enable_security_timed(&mut self, tx_count: Option<u32>, rx_sn: Option<u32>) {
        self.pending_security_tx_count = tx_count;
        self.pending_security_rx_sn = rx_sn;
    }

    // ------------------------------------------------------------------
    // Transmit path (36.323 §5.1.1)
    // ------------------------------------------------------------------

    /// Transmits one SDU from the upper layer.
    ///
    /// `override_sn` replays a handover-provided SN instead of consuming
    /// `next_tx_sn`; the TX counters are left untouched in that case.
    pub fn write_sdu(
        &mut self,
        rlc: &mut dyn RlcInterface,
        security: &dyn SecurityProvider,
        mut sdu: ByteBuffer,
        override_sn: Option<u32>,
    ) {
        if !self.active {
            warn!(bearer = %self.rb_name(), "Dropping SDU on inactive entity");
            return;
        }

        if rlc.sdu_queue_is_full(self.cfg.lcid) {
            info!(bearer = %self.rb_name(), "Dropping SDU due to full RLC queue");
            return;
        }

        let used_sn = override_sn.unwrap_or(self.st.next_tx_sn);
        let tx_count = count(self.st.tx_hfn, used_sn, self.cfg.sn_len);

        // DRB on RLC-AM keeps a copy until the lower layers confirm
        // delivery; the copy feeds reestablishment and status reports.
        if self.is_drb() && self.cfg.rlc_mode.is_am() {
            self.store_sdu(tx_count, &sdu);
        }

        // Security activation is keyed to the first transmitted COUNT.
        if self.pending_security_tx_count == Some(tx_count) {
            self.enable_integrity(true, false);
            self.enable_encryption(true, false);
            self.pending_security_tx_count = None;
        }

        pdu::write_data_header(&mut sdu, self.cfg.sn_len, used_sn);

        if let Some(timeout) = self.cfg.discard_timer.duration() {
            self.discard_timers.arm(tx_count, timeout);
            debug!(
                bearer = %self.rb_name(),
                sn = used_sn,
                timeout_ms = timeout.as_millis() as u64,
                "Discard timer set"
            );
        }

        if self.is_srb() {
            let mac = if self.integrity_direction.has_tx() {
                security.integrity_generate(
                    sdu.as_slice(),
                    tx_count,
                    self.cfg.bearer_id,
                    self.cfg.tx_direction,
                )
            } else {
                [0u8; MAC_LEN]
            };
            pdu::append_mac(&mut sdu, &mac);
        }

        if self.encryption_direction.has_tx() {
            let hdr_len = self.cfg.sn_len.header_len();
            security.cipher_encrypt(
                &mut sdu.as_mut_slice()[hdr_len..],
                tx_count,
                self.cfg.bearer_id,
                self.cfg.tx_direction,
            );
        }

        info!(
            bearer = %self.rb_name(),
            sn = used_sn,
            len = sdu.len(),
            integrity = %self.integrity_direction,
            encryption = %self.encryption_direction,
            "TX PDU"
        );
        log_pdcp_message(logging::Direction::Tx, "data PDU", sdu.as_slice());

        rlc.write_sdu(self.cfg.lcid, sdu);

        // The counters advance only when the SN came from this entity.
        if override_sn.is_none() {
            self.st.next_tx_sn += 1;
            if self.st.next_tx_sn > self.cfg.sn_len.max_sn() {
                self.st.next_tx_sn = 0;
                self.st.tx_hfn += 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Receive path (36.323 §5.1.2)
    // ------------------------------------------------------------------

    /// Handles one PDU delivered by RLC.
    pub fn write_pdu(
        &mut self,
        upper: &mut dyn UpperLayer,
        security: &dyn SecurityProvider,
        pdu: ByteBuffer,
    ) {
        if !self.active {
            warn!(bearer = %self.rb_name(), "Dropping PDU on inactive entity");
            return;
        }

        if self.is_drb() && pdu::is_control_pdu(&pdu) {
            info!(bearer = %self.rb_name(), "Handling PDCP control PDU");
            self.handle_control_pdu(pdu);
            return;
        }

        if pdu.len() <= self.cfg.sn_len.header_len() {
            error!(
                bearer = %self.rb_name(),
                len = pdu.len(),
                "PDCP PDU smaller than required header size"
            );
            return;
        }

        // The SN is read exactly once, before the header is consumed.
        let sn = match pdu::read_data_sn(&pdu, self.cfg.sn_len) {
            Ok(sn) => sn,
            Err(e) => {
                error!(bearer = %self.rb_name(), error = %e, "Dropping malformed PDU");
                return;
            }
        };

        // RX security activation is keyed to a raw SN.
        if self.pending_security_rx_sn == Some(sn) {
            self.enable_integrity(false, true);
            self.enable_encryption(false, true);
            self.pending_security_rx_sn = None;
        }

        debug!(
            bearer = %self.rb_name(),
            sn = sn,
            len = pdu.len(),
            integrity = %self.integrity_direction,
            encryption = %self.encryption_direction,
            "RX PDU"
        );
        log_pdcp_message(logging::Direction::Rx, "data PDU", pdu.as_slice());

        if self.is_srb() {
            self.handle_srb_pdu(upper, security, pdu, sn);
        } else if self.cfg.rlc_mode.is_um() {
            self.handle_um_drb_pdu(upper, security, pdu, sn);
        } else {
            self.handle_am_drb_pdu(upper, security, pdu, sn);
        }
    }

    fn handle_control_pdu(&mut self, pdu: ByteBuffer) {
        match pdu::control_pdu_type(&pdu) {
            pdu::CONTROL_PDU_STATUS_REPORT => self.handle_status_report_pdu(pdu),
            other => {
                warn!(bearer = %self.rb_name(), pdu_type = other, "Unhandled control PDU");
            }
        }
    }

    /// SRB receive (36.323 §5.1.2.2): COUNT estimation, decipher, MAC-I
    /// verification, then state update. The counters advance only after a
    /// successful verification.
    fn handle_srb_pdu(
        &mut self,
        upper: &mut dyn UpperLayer,
        security: &dyn SecurityProvider,
        mut pdu: ByteBuffer,
        sn: u32,
    ) {
        debug!(next_rx_sn = self.st.next_rx_sn, sn = sn, "RX SRB PDU");

        // An SN below next_rx_sn means the SN wrapped since the last PDU.
        let rx_count = if sn < self.st.next_rx_sn {
            count(self.st.rx_hfn + 1, sn, self.cfg.sn_len)
        } else {
            count(self.st.rx_hfn, sn, self.cfg.sn_len)
        };

        if self.encryption_direction.has_rx() {
            let hdr_len = self.cfg.sn_len.header_len();
            security.cipher_decrypt(
                &mut pdu.as_mut_slice()[hdr_len..],
                rx_count,
                self.cfg.bearer_id,
                self.cfg.rx_direction,
            );
        }

        let mac = match pdu::extract_mac(&mut pdu) {
            Ok(mac) => mac,
            Err(e) => {
                error!(bearer = %self.rb_name(), error = %e, "Dropping PDU");
                return;
            }
        };

        // The header stays on for the integrity input.
        if self.integrity_direction.has_rx()
            && !security.integrity_verify(
                pdu.as_slice(),
                rx_count,
                self.cfg.bearer_id,
                self.cfg.rx_direction,
                &mac,
            )
        {
            error!(bearer = %self.rb_name(), sn = sn, "Integrity check failed, dropping PDU");
            return;
        }

        pdu::strip_data_header(&mut pdu, self.cfg.sn_len);

        if sn < self.st.next_rx_sn {
            self.st.rx_hfn += 1;
        }
        self.st.next_rx_sn = sn + 1;
        if self.st.next_rx_sn > self.cfg.sn_len.max_sn() {
            self.st.next_rx_sn = 0;
            self.st.rx_hfn += 1;
        }

        upper.write_pdu(self.cfg.lcid, pdu);
    }

    /// DRB on RLC-UM receive (36.323 §5.1.2.1.3): HFN tracking only, no
    /// integrity, no deduplication.
    fn handle_um_drb_pdu(
        &mut self,
        upper: &mut dyn UpperLayer,
        security: &dyn SecurityProvider,
        mut pdu: ByteBuffer,
        sn: u32,
    ) {
        pdu::strip_data_header(&mut pdu, self.cfg.sn_len);

        if sn < self.st.next_rx_sn {
            self.st.rx_hfn += 1;
        }
        let rx_count = count(self.st.rx_hfn, sn, self.cfg.sn_len);

        if self.encryption_direction.has_rx() {
            security.cipher_decrypt(
                pdu.as_mut_slice(),
                rx_count,
                self.cfg.bearer_id,
                self.cfg.rx_direction,
            );
        }

        self.st.next_rx_sn = sn + 1;
        if self.st.next_rx_sn > self.cfg.sn_len.max_sn() {
            self.st.next_rx_sn = 0;
            self.st.rx_hfn += 1;
        }

        upper.write_pdu(self.cfg.lcid, pdu);
    }

    /// DRB on RLC-AM receive without reordering (36.323 §5.1.2.1.2):
    /// window-based duplicate discard and HFN estimation. RLC-AM already
    /// delivers in order, so PDCP only deduplicates.
    fn handle_am_drb_pdu(
        &mut self,
        upper: &mut dyn UpperLayer,
        security: &dyn SecurityProvider,
        mut pdu: ByteBuffer,
        sn: u32,
    ) {
        pdu::strip_data_header(&mut pdu, self.cfg.sn_len);

        let window = i64::from(self.cfg.reordering_window());
        let sn_i = i64::from(sn);
        let last_submitted = i64::from(self.st.last_submitted_rx_sn);
        let next_rx = i64::from(self.st.next_rx_sn);

        let last_submit_diff_sn = last_submitted - sn_i;
        let sn_diff_last_submit = sn_i - last_submitted;
        let sn_diff_next_rx_sn = sn_i - next_rx;

        debug!(
            rx_hfn = self.st.rx_hfn,
            sn = sn,
            last_submitted_rx_sn = self.st.last_submitted_rx_sn,
            next_rx_sn = self.st.next_rx_sn,
            "RX AM DRB PDU"
        );

        let rx_count;
        if (sn_diff_last_submit >= 0 && sn_diff_last_submit > window)
            || (last_submit_diff_sn >= 0 && last_submit_diff_sn < window)
        {
            debug!(
                sn = sn,
                sn_diff_last_submit,
                last_submit_diff_sn,
                "Discarding duplicate or out-of-window PDU"
            );
            return;
        } else if next_rx - sn_i > window {
            self.st.rx_hfn += 1;
            rx_count = count(self.st.rx_hfn, sn, self.cfg.sn_len);
            self.st.next_rx_sn = sn + 1;
        } else if sn_diff_next_rx_sn >= window {
            rx_count = count(self.st.rx_hfn.wrapping_sub(1), sn, self.cfg.sn_len);
        } else if sn >= self.st.next_rx_sn {
            rx_count = count(self.st.rx_hfn, sn, self.cfg.sn_len);
            self.st.next_rx_sn = sn + 1;
            if self.st.next_rx_sn > self.cfg.sn_len.max_sn() {
                self.st.next_rx_sn = 0;
                self.st.rx_hfn += 1;
            }
        } else {
            rx_count = count(self.st.rx_hfn, sn, self.cfg.sn_len);
        }

        if self.encryption_direction.has_rx() {
            security.cipher_decrypt(
                pdu.as_mut_slice(),
                rx_count,
                self.cfg.bearer_id,
                self.cfg.rx_direction,
            );
        }

        self.st.last_submitted_rx_sn = sn;

        upper.write_pdu(self.cfg.lcid, pdu);
    }

    // ------------------------------------------------------------------
    // Status reports (36.323 §5.1.3)
    // ------------------------------------------------------------------

    /// Emits a status report toward the peer entity (DRB on RLC-AM only).
    pub fn send_status_report(&mut self, rlc: &mut dyn RlcInterface) {
        if self.is_srb() {
            error!(bearer = %self.rb_name(), "SRBs do not send PDCP status reports");
            return;
        }
        if rlc.rb_is_um(self.cfg.lcid) {
            error!(bearer = %self.rb_name(), "Cannot send PDCP status report over RLC-UM");
            return;
        }

        let fms = match self.undelivered.keys().next() {
            Some(&first) => sn_of(first, self.cfg.sn_len),
            None => self.st.next_tx_sn,
        };
        debug!(bearer = %self.rb_name(), fms = fms, "Sending status report");

        let keys: Vec<u32> = self.undelivered.keys().copied().collect();
        match pdu::encode_status_report(self.cfg.sn_len, fms, &keys) {
            Ok(report) => rlc.write_sdu(self.cfg.lcid, report),
            Err(e) => error!(bearer = %self.rb_name(), error = %e, "Cannot build status report"),
        }
    }

    /// Consumes a status report from the peer: everything below the FMS and
    /// every bitmap-acknowledged SN is dropped from the retransmission
    /// queue along with its discard timer.
    fn handle_status_report_pdu(&mut self, pdu: ByteBuffer) {
        let report = match pdu::decode_status_report(self.cfg.sn_len, pdu.as_slice()) {
            Ok(report) => report,
            Err(e) => {
                error!(bearer = %self.rb_name(), error = %e, "Dropping malformed status report");
                return;
            }
        };
        info!(bearer = %self.rb_name(), fms = report.fms, len = pdu.len(), "Handling status report");

        let below_fms: Vec<u32> = self
            .undelivered
            .keys()
            .copied()
            .filter(|&key| sn_of(key, self.cfg.sn_len) < report.fms)
            .collect();
        for key in below_fms {
            self.undelivered.remove(&key);
            self.discard_timers.cancel(key);
        }

        for acked_sn in report.acked {
            debug!(sn = acked_sn, "Status report ACKed SN");
            self.remove_undelivered_sn(acked_sn);
        }
    }

    // ------------------------------------------------------------------
    // Retransmission queue and discard timers
    // ------------------------------------------------------------------

    /// Stores a copy of an SDU in the retransmission queue.
    ///
    /// Returns false on a duplicate COUNT, which indicates a caller bug:
    /// the TX counters have already advanced past this COUNT.
    fn store_sdu(&mut self, tx_count: u32, sdu: &ByteBuffer) -> bool {
        debug!(
            tx_count = tx_count,
            queue_len = self.undelivered.len(),
            "Storing SDU in undelivered queue"
        );
        if self.undelivered.contains_key(&tx_count) {
            error!(tx_count = tx_count, "SDU already exists in undelivered queue");
            return false;
        }
        self.undelivered.insert(tx_count, sdu.clone());
        true
    }

    /// Removes the queue entry (and discard timer) whose SN component
    /// matches `sn`. Returns false if no entry matches.
    fn remove_undelivered_sn(&mut self, sn: u32) -> bool {
        let key = self
            .undelivered
            .keys()
            .copied()
            .find(|&key| sn_of(key, self.cfg.sn_len) == sn);
        match key {
            Some(key) => {
                self.undelivered.remove(&key);
                self.discard_timers.cancel(key);
                true
            }
            None => false,
        }
    }

    /// Handles RLC delivery notifications: confirmed SDUs leave the queue
    /// and their discard timers are cancelled. Unknown SNs are logged and
    /// skipped.
    pub fn notify_delivery(&mut self, sns: &[u32]) {
        debug!(count = sns.len(), "Received delivery notification from RLC");
        for &sn in sns {
            if !self.remove_undelivered_sn(sn) {
                warn!(sn = sn, "Could not find PDU for delivery notification");
            }
        }
    }

    /// Handles RLC transmission-failure notifications; the cleanup is the
    /// same as for delivery.
    pub fn notify_failure(&mut self, sns: &[u32]) {
        debug!(count = sns.len(), "Received failure notification from RLC");
        for &sn in sns {
            if !self.remove_undelivered_sn(sn) {
                warn!(sn = sn, "Could not find PDU for failure notification");
            }
        }
    }

    /// Runs expired discard timers: the stored SDU is dropped and RLC is
    /// told to discard its copy, which it does only if no fragment has
    /// been transmitted yet. Call this from the scheduler tick.
    pub fn run_pending_timers(&mut self, rlc: &mut dyn RlcInterface) {
        for tx_count in self.discard_timers.expired() {
            let sn = sn_of(tx_count, self.cfg.sn_len);
            debug!(sn = sn, "Discard timer expired");

            if self.undelivered.remove(&tx_count).is_some() {
                debug!(tx_count = tx_count, "Removed undelivered PDU");
            } else {
                debug!(tx_count = tx_count, "Could not find PDU to discard");
            }

            rlc.discard_sdu(self.cfg.lcid, sn);

            // The timer goes away last.
            self.discard_timers.cancel(tx_count);
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle (36.323 §5.2)
    // ------------------------------------------------------------------

    /// Reestablishment: SRBs and DRBs on RLC-UM reset their counters;
    /// DRBs on RLC-AM report status (if configured) and retransmit every
    /// unacknowledged SDU with its original SN, in SN order.
    pub fn reestablish(&mut self, rlc: &mut dyn RlcInterface, security: &dyn SecurityProvider) {
        if !self.active {
            debug!(bearer = %self.rb_name(), "Ignoring reestablish on inactive entity");
            return;
        }
        info!(bearer = %self.rb_name(), bearer_id = self.cfg.bearer_id, "Re-establish PDCP entity");

        if self.is_srb() || self.cfg.rlc_mode.is_um() {
            self.st.next_tx_sn = 0;
            self.st.tx_hfn = 0;
            self.st.rx_hfn = 0;
            self.st.next_rx_sn = 0;
        } else {
            if self.cfg.status_report_required {
                self.send_status_report(rlc);
            }
            let undelivered = mem::take(&mut self.undelivered);
            for &tx_count in undelivered.keys() {
                self.discard_timers.cancel(tx_count);
            }
            for (tx_count, sdu) in undelivered {
                let sn = sn_of(tx_count, self.cfg.sn_len);
                self.write_sdu(rlc, security, sdu, Some(sn));
            }
        }
    }

    /// Stops the entity. Idempotent; queued buffers unwind on drop.
    pub fn reset(&mut self) {
        if self.active {
            debug!(bearer = %self.rb_name(), "Reset PDCP entity");
        }
        self.active = false;
    }

    /// Snapshot of the five counters for handover.
    pub fn get_bearer_state(&self) -> PdcpState {
        self.st
    }

    /// Installs counters carried over from another entity.
    pub fn set_bearer_state(&mut self, state: PdcpState) {
        self.st = state;
    }

    /// Deep copy of the retransmission queue, keyed by TX COUNT.
    pub fn get_buffered_pdus(&self) -> BTreeMap<u32, ByteBuffer> {
        self.undelivered.clone()
    }
}
