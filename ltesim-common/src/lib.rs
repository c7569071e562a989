//! Common types and utilities for ltesim
//!
//! This crate provides shared types, error handling, logging and buffer
//! utilities used across the ltesim crates.

pub mod byte_buffer;
pub mod error;
pub mod logging;
pub mod types;

pub use byte_buffer::ByteBuffer;
pub use error::Error;
pub use logging::{
    init_logging, init_logging_with_filter, log_pdcp_message, Direction, HexDump, LogLevel,
};
pub use types::{RbType, RlcMode};
