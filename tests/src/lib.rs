//! Integration tests for the ltesim workspace.
//!
//! Scenario-level tests that drive PDCP entities end to end through mock
//! collaborators, including peer-to-peer loopback between two entities.


#[cfg(test)]
mod srb_loopback;
#[cfg(test)]
mod status_report;
