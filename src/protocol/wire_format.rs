//! Wire format encoding and decoding.
//!
//! Every request and response on the data plane starts with an 11-byte header:
//! ```text
//! ┌────────────┬───────┬──────────┬──────────┐
//! │ Procedure  │ Flags │ Req ID   │ Length   │
//! │ 2 bytes    │ 1 byte│ 4 bytes  │ 4 bytes  │
//! │ uint16 BE  │       │ uint32 BE│ uint32 BE│
//! └────────────┴───────┴──────────┴──────────┘
//! ```
//!
//! All multi-byte integers are Big Endian.

use crate::error::{ChronologError, Result};

/// Header size in bytes (fixed, exactly 11).
pub const HEADER_SIZE: usize = 11;

/// Default maximum payload size (1 GB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 1_073_741_824;

/// Reserved procedure ID (never assigned).
pub const RESERVED_PROCEDURE_ID: u16 = 0;

/// Reserved procedure ID kept free for control signals.
pub const CONTROL_PROCEDURE_ID: u16 = 0xFFFF;

/// Flag constants for the protocol.
pub mod flags {
    /// Direction: to client (1) or to server (0).
    pub const DIRECTION_TO_CLIENT: u8 = 0b0000_0001;
    /// Message type: response (1) or request (0).
    pub const IS_RESPONSE: u8 = 0b0000_0010;
    /// Error flag: server-side fault (1) or ok (0).
    pub const IS_ERROR: u8 = 0b0000_0100;

    /// Reserved bits mask (bits 3-7).
    pub const RESERVED_MASK: u8 = 0b1111_1000;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u8, flag: u8) -> bool {
        flags & flag != 0
    }

    /// Request flags: to_server = 0x00
    pub const REQUEST: u8 = 0;
    /// Response flags: to_client + is_response = 0x03
    pub const RESPONSE: u8 = DIRECTION_TO_CLIENT | IS_RESPONSE;
    /// Error response flags: to_client + is_response + is_error = 0x07
    pub const ERROR_RESPONSE: u8 = DIRECTION_TO_CLIENT | IS_RESPONSE | IS_ERROR;
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Procedure identifier assigned by the server schema.
    pub procedure_id: u16,
    /// Flags byte (see `flags` module).
    pub flags: u8,
    /// Request identifier used to correlate a response with its call.
    pub request_id: u32,
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(procedure_id: u16, flags: u8, request_id: u32, payload_length: u32) -> Self {
        Self {
            procedure_id,
            flags,
            request_id,
            payload_length,
        }
    }

    /// Create a request header.
    pub fn request(procedure_id: u16, request_id: u32, payload_length: u32) -> Self {
        Self::new(procedure_id, flags::REQUEST, request_id, payload_length)
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use chronolog_client::protocol::{Header, flags};
    ///
    /// let header = Header::new(1, flags::RESPONSE, 42, 100);
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 11);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (11 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..2].copy_from_slice(&self.procedure_id.to_be_bytes());
        buf[2] = self.flags;
        buf[3..7].copy_from_slice(&self.request_id.to_be_bytes());
        buf[7..11].copy_from_slice(&self.payload_length.to_be_bytes());
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    ///
    /// # Example
    ///
    /// ```
    /// use chronolog_client::protocol::Header;
    ///
    /// let bytes = [0, 1, 0x03, 0, 0, 0, 42, 0, 0, 0, 100];
    /// let header = Header::decode(&bytes).unwrap();
    /// assert_eq!(header.procedure_id, 1);
    /// assert_eq!(header.request_id, 42);
    /// assert_eq!(header.payload_length, 100);
    /// ```
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            procedure_id: u16::from_be_bytes([buf[0], buf[1]]),
            flags: buf[2],
            request_id: u32::from_be_bytes([buf[3], buf[4], buf[5], buf[6]]),
            payload_length: u32::from_be_bytes([buf[7], buf[8], buf[9], buf[10]]),
        })
    }

    /// Validate an inbound header.
    ///
    /// Checks:
    /// - Payload length doesn't exceed max
    /// - Reserved flag bits are 0
    pub fn validate(&self, max_payload_size: u32) -> Result<()> {
        if self.payload_length > max_payload_size {
            return Err(ChronologError::Transport(format!(
                "payload size {} exceeds maximum {}",
                self.payload_length, max_payload_size
            )));
        }

        if self.flags & flags::RESERVED_MASK != 0 {
            return Err(ChronologError::Transport(format!(
                "reserved flag bits set: {:#04x}",
                self.flags
            )));
        }

        Ok(())
    }

    /// Check if this is a response.
    #[inline]
    pub fn is_response(&self) -> bool {
        flags::has_flag(self.flags, flags::IS_RESPONSE)
    }

    /// Check if this is an error response.
    #[inline]
    pub fn is_error(&self) -> bool {
        flags::has_flag(self.flags, flags::IS_ERROR)
    }

    /// Check if direction is to client.
    #[inline]
    pub fn is_to_client(&self) -> bool {
        flags::has_flag(self.flags, flags::DIRECTION_TO_CLIENT)
    }
}

/// True if `id` may be assigned to a procedure.
#[inline]
pub fn is_assignable_procedure_id(id: u16) -> bool {
    id != RESERVED_PROCEDURE_ID && id != CONTROL_PROCEDURE_ID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_big_endian_byte_order() {
        let header = Header::new(0x0102, 0x03, 0x04050607, 0x08090A0B);
        let bytes = header.encode();

        assert_eq!(&bytes[0..2], &[0x01, 0x02]);
        assert_eq!(bytes[2], 0x03);
        assert_eq!(&bytes[3..7], &[0x04, 0x05, 0x06, 0x07]);
        assert_eq!(&bytes[7..11], &[0x08, 0x09, 0x0A, 0x0B]);

        assert_eq!(Header::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn test_decode_too_short_buffer() {
        let buf = [0u8; 10];
        assert!(Header::decode(&buf).is_none());
    }

    #[test]
    fn test_request_header() {
        let header = Header::request(3, 9, 12);
        assert_eq!(header.flags, flags::REQUEST);
        assert!(!header.is_response());
        assert!(!header.is_to_client());
    }

    #[test]
    fn test_validate_payload_too_large() {
        let header = Header::new(1, flags::RESPONSE, 1, 1_000_000);
        let result = header.validate(100);
        assert!(matches!(result, Err(ChronologError::Transport(ref m)) if m.contains("exceeds maximum")));
    }

    #[test]
    fn test_validate_reserved_bits_must_be_zero() {
        let header = Header::new(1, 0b1000_0011, 1, 0);
        let result = header.validate(DEFAULT_MAX_PAYLOAD_SIZE);
        assert!(result.unwrap_err().to_string().contains("reserved flag bits"));
    }

    #[test]
    fn test_flag_combinations() {
        assert_eq!(flags::REQUEST, 0x00);
        assert_eq!(flags::RESPONSE, 0x03);
        assert_eq!(flags::ERROR_RESPONSE, 0x07);

        let error = Header::new(1, flags::ERROR_RESPONSE, 1, 0);
        assert!(error.is_response());
        assert!(error.is_error());
        assert!(error.validate(DEFAULT_MAX_PAYLOAD_SIZE).is_ok());
    }

    #[test]
    fn test_assignable_ids() {
        assert!(!is_assignable_procedure_id(RESERVED_PROCEDURE_ID));
        assert!(!is_assignable_procedure_id(CONTROL_PROCEDURE_ID));
        assert!(is_assignable_procedure_id(1));
        assert!(is_assignable_procedure_id(0xFFFE));
    }
}
