// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Packet framing for device messages
//!
//! ## Encoding
//!
//! Messages are split into fixed size 64-byte packets, zero padded.
//!
//! ```text
//! First packet:
//! +-----+-----+-----+-----------+---------------------+----------------
//! | '?' | '#' | '#' | KIND (be) |   PAYLOAD_LEN (be)  | PAYLOAD...
//! +-----+-----+-----+-----------+---------------------+----------------
//!    0     1     2     3..5              5..9             9..64
//!
//! Continuation packets:
//! +-----+----------------------------------------------------------------
//! | '?' | PAYLOAD...
//! +-----+----------------------------------------------------------------
//!    0     1..64
//! ```

use byteorder::{BigEndian, ByteOrder};
use log::trace;

use crate::Message;

/// Fixed packet length for HID reports and emulator datagrams
pub const PACKET_LEN: usize = 64;

/// Upper bound on accepted payload lengths
pub const MAX_PAYLOAD_LEN: usize = 1024 * 1024;

const REPORT_MAGIC: u8 = b'?';
const HEADER_MAGIC: u8 = b'#';
const HEADER_LEN: usize = 9;

/// Wire packet
pub type Packet = [u8; PACKET_LEN];

/// Framing errors
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum WireError {
    /// Packet did not start with the report magic
    #[error("invalid packet magic: {0:#04x}")]
    InvalidMagic(u8),

    /// First packet of a message did not contain a valid header
    #[error("invalid message header")]
    InvalidHeader,

    /// Announced payload exceeds [MAX_PAYLOAD_LEN]
    #[error("payload length {0} exceeds maximum")]
    Oversize(usize),
}

/// Split a message into wire packets
pub fn encode_packets(m: &Message) -> Vec<Packet> {
    let payload = m.payload();
    let mut packets = Vec::with_capacity(1 + payload.len() / (PACKET_LEN - 1));

    let mut p = [0u8; PACKET_LEN];
    p[0] = REPORT_MAGIC;
    p[1] = HEADER_MAGIC;
    p[2] = HEADER_MAGIC;
    BigEndian::write_u16(&mut p[3..5], m.raw_kind());
    BigEndian::write_u32(&mut p[5..9], payload.len() as u32);

    let n = payload.len().min(PACKET_LEN - HEADER_LEN);
    p[HEADER_LEN..][..n].copy_from_slice(&payload[..n]);
    packets.push(p);

    for chunk in payload[n..].chunks(PACKET_LEN - 1) {
        let mut p = [0u8; PACKET_LEN];
        p[0] = REPORT_MAGIC;
        p[1..][..chunk.len()].copy_from_slice(chunk);
        packets.push(p);
    }

    trace!(
        "encoded {} ({} bytes) into {} packets",
        m.kind_name(),
        payload.len(),
        packets.len()
    );

    packets
}

/// Streaming message decoder, fed one packet at a time
#[derive(Debug, Default)]
pub struct Decoder {
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    kind: u16,
    len: usize,
    buff: Vec<u8>,
}

impl Decoder {
    /// Create a new (empty) decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a packet, returning a message once all packets have been received
    pub fn push(&mut self, p: &Packet) -> Result<Option<Message>, WireError> {
        if p[0] != REPORT_MAGIC {
            self.pending = None;
            return Err(WireError::InvalidMagic(p[0]));
        }

        let (mut pending, data) = match self.pending.take() {
            Some(pending) => (pending, &p[1..]),
            None => {
                if p[1] != HEADER_MAGIC || p[2] != HEADER_MAGIC {
                    return Err(WireError::InvalidHeader);
                }

                let kind = BigEndian::read_u16(&p[3..5]);
                let len = BigEndian::read_u32(&p[5..9]) as usize;
                if len > MAX_PAYLOAD_LEN {
                    return Err(WireError::Oversize(len));
                }

                let pending = Pending {
                    kind,
                    len,
                    buff: Vec::with_capacity(len),
                };

                (pending, &p[HEADER_LEN..])
            }
        };

        let n = (pending.len - pending.buff.len()).min(data.len());
        pending.buff.extend_from_slice(&data[..n]);

        if pending.buff.len() < pending.len {
            self.pending = Some(pending);
            return Ok(None);
        }

        Ok(Some(Message::from_raw(pending.kind, pending.buff)))
    }

    /// Discard any partially received message
    pub fn reset(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod test {
    use rand::RngCore;

    use super::*;
    use crate::{messages, MessageKind};

    fn decode_all(packets: &[Packet]) -> Message {
        let mut d = Decoder::new();
        let (last, rest) = packets.split_last().unwrap();

        for p in rest {
            assert_eq!(d.push(p), Ok(None), "message completed early");
        }

        d.push(last).unwrap().expect("message incomplete")
    }

    #[test]
    fn empty_payload_fits_one_packet() {
        let m = Message::new(MessageKind::ButtonAck, &messages::ButtonAck {});
        let packets = encode_packets(&m);

        assert_eq!(packets.len(), 1);
        assert_eq!(&packets[0][..9], &[b'?', b'#', b'#', 0, 27, 0, 0, 0, 0]);
        assert_eq!(decode_all(&packets), m);
    }

    #[test]
    fn large_payload_spans_packets() {
        let mut payload = vec![0u8; 1000];
        rand::thread_rng().fill_bytes(&mut payload);
        let m = Message::from_raw(MessageKind::ResponseTransactionSign as u16, payload);

        let packets = encode_packets(&m);

        // 55 bytes in the first packet, 63 in each continuation
        assert_eq!(packets.len(), 1 + (1000 - 55 + 62) / 63);
        assert!(packets.iter().all(|p| p[0] == b'?'));
        assert_eq!(decode_all(&packets), m);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut d = Decoder::new();
        let mut p = [0u8; PACKET_LEN];
        p[0] = 0x01;

        assert_eq!(d.push(&p), Err(WireError::InvalidMagic(0x01)));
    }

    #[test]
    fn rejects_missing_header() {
        let mut d = Decoder::new();
        let mut p = [0u8; PACKET_LEN];
        p[0] = b'?';

        assert_eq!(d.push(&p), Err(WireError::InvalidHeader));
    }

    #[test]
    fn rejects_oversize_payload() {
        let mut d = Decoder::new();
        let mut p = [0u8; PACKET_LEN];
        p[..3].copy_from_slice(b"?##");
        BigEndian::write_u32(&mut p[5..9], u32::MAX);

        assert_eq!(d.push(&p), Err(WireError::Oversize(u32::MAX as usize)));
    }
}
