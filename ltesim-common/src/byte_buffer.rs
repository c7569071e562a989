//! `ByteBuffer` - the owned byte buffer exchanged between protocol layers.
//!
//! This module provides the `ByteBuffer` type, a wrapper around `Vec<u8>` that
//! carries PDUs and SDUs between the PDCP entity, the RLC below and the upper
//! layers. It supports in-place mutation (ciphering), header prepend/strip and
//! trailer handling, which plain protocol messages need but a read-only view
//! cannot provide.

use std::fmt;

/// An owned, mutable sequence of bytes.
///
/// Ownership of a `ByteBuffer` follows the PDU it carries: handing a buffer to
/// another layer is a move. Deep copies are explicit via `Clone`.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    /// Creates a new empty `ByteBuffer`.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Creates a `ByteBuffer` with the given capacity reserved.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Creates a `ByteBuffer` from a `Vec<u8>`.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Creates a `ByteBuffer` from a byte slice.
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    /// Creates a `ByteBuffer` from a hex string.
    ///
    /// Returns `None` if the string is not valid hex.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        hex::decode(s).ok().map(Self::from_vec)
    }

    /// Returns the number of bytes in the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the contents as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns the contents as a mutable byte slice (for in-place ciphering).
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Appends a single byte.
    pub fn append_octet(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Appends a byte slice.
    pub fn append_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Prepends a byte slice (header insertion).
    pub fn prepend_slice(&mut self, bytes: &[u8]) {
        self.data.splice(0..0, bytes.iter().copied());
    }

    /// Removes the first `n` bytes (header removal).
    ///
    /// Removes the whole buffer if `n` exceeds its length.
    pub fn strip_front(&mut self, n: usize) {
        let n = n.min(self.data.len());
        self.data.drain(..n);
    }

    /// Truncates the buffer to `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Consumes the buffer and returns the underlying `Vec<u8>`.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Returns the contents as a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.data)
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(data: &[u8]) -> Self {
        Self::from_slice(data)
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteBuffer[{}]({})", self.len(), self.to_hex())
    }
}

impl fmt::Display for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
