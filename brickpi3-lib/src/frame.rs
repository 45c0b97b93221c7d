//! Frame codec for the BrickPi3 SPI link.
//!
//! Every exchange is one full-duplex transfer of N bytes. The host clocks out
//! `[address, message_type, payload...]` and simultaneously receives
//! `[echo_address, echo_type, 0x00, 0xA5, payload...]`. A response whose
//! sentinel byte is not `0xA5` means the board had nothing ready for this
//! exchange. All multi-byte fields are big-endian.

use crate::constants::{RESPONSE_HEADER_SIZE, RESPONSE_SENTINEL, SENTINEL_OFFSET};
use crate::error::BrickPiError;
use crate::message::MessageType;
use bytes::{BufMut, Bytes, BytesMut};

/// An outbound frame under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    buf: BytesMut,
}

impl Frame {
    /// Start a frame with the `[address, message_type]` header.
    pub fn new(address: u8, message_type: MessageType) -> Self {
        let mut buf = BytesMut::with_capacity(crate::constants::LONGEST_SPI_TRANSFER);
        buf.put_u8(address);
        buf.put_u8(message_type.into());
        Self { buf }
    }

    /// A read request: header followed by zeros up to the exchange length.
    pub fn read_request(address: u8, message_type: MessageType, len: usize) -> Self {
        Self::new(address, message_type).padded_to(len)
    }

    pub fn with_u8(mut self, value: u8) -> Self {
        self.buf.put_u8(value);
        self
    }

    pub fn with_i8(mut self, value: i8) -> Self {
        self.buf.put_i8(value);
        self
    }

    pub fn with_u16(mut self, value: u16) -> Self {
        self.buf.put_u16(value);
        self
    }

    pub fn with_i16(mut self, value: i16) -> Self {
        self.buf.put_i16(value);
        self
    }

    pub fn with_u32(mut self, value: u32) -> Self {
        self.buf.put_u32(value);
        self
    }

    pub fn with_i32(mut self, value: i32) -> Self {
        self.buf.put_i32(value);
        self
    }

    pub fn with_slice(mut self, bytes: &[u8]) -> Self {
        self.buf.put_slice(bytes);
        self
    }

    /// Zero-fill up to `len` bytes. Never truncates.
    pub fn padded_to(mut self, len: usize) -> Self {
        if self.buf.len() < len {
            self.buf.resize(len, 0);
        }
        self
    }

    pub(crate) fn message_type(&self) -> u8 {
        self.buf[1]
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Build an outbound frame `[address, message_type, payload...]`.
pub fn encode(address: u8, message_type: MessageType, payload: &[u8]) -> Bytes {
    Frame::new(address, message_type).with_slice(payload).freeze()
}

/// Validate an inbound frame and return the payload following the 4-byte
/// response header.
pub fn decode(inbound: &[u8]) -> Result<&[u8], BrickPiError> {
    match inbound.get(SENTINEL_OFFSET) {
        Some(&RESPONSE_SENTINEL) => Ok(&inbound[RESPONSE_HEADER_SIZE..]),
        _ => Err(BrickPiError::ResponseNotReady),
    }
}
