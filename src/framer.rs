//! Incremental ESP3 frame parsing and serialization.
//!
//! The parser consumes a caller-owned, growing byte buffer and yields one
//! validated [`Packet`] per call until the buffer holds no complete frame.
//! It is a state machine over the wire layout:
//!
//! ```text
//! 0x55 | len_data:u16 BE | len_opt:u8 | type:u8 | crc8(header) | data | optional | crc8(body)
//! ```
//!
//! +-----------+   +-------------+   +-----------+   +------+
//! | SeekSync  |-->| ReadHeader  |-->| ReadBody  |-->| Emit |
//! +-----------+   +-------------+   +-----------+   +------+
//!       ^            | bad CRC: drop     | bad CRC: drop
//!       |            v marker only       v whole candidate
//!       +------------+-------------------+
//!
//! ## Contract with the transport
//!
//! Callers append received bytes to their buffer and invoke [`parse_next`]
//! in a loop until it reports [`ParseResult::Incomplete`]; consumed bytes are
//! drained from the front of the buffer, unconsumed bytes stay for the next
//! call. The parser always makes forward progress on malformed input: a sync
//! candidate with a bad header CRC costs exactly one byte, a frame with a
//! bad body CRC is discarded whole. Neither is an error to the caller: a
//! corrupted frame must never abort the byte stream it arrived on.
//!
//! Serialization is the exact inverse and is the only place a packet meets
//! the one-byte section length limit of the header.

use tracing::{trace, warn};

use crate::crc8::crc8;
use crate::packet::Packet;
use crate::{Esp3Error, Result};

/// Frame sync marker.
pub const SYNC_BYTE: u8 = 0x55;

/// Bytes between the sync marker and the data section.
const HEADER_LEN: usize = 5;

/// Outcome of one [`parse_next`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    /// A complete, checksum-valid frame was consumed from the buffer.
    Packet(Packet),
    /// The buffer holds no complete frame yet; retry once more bytes arrive.
    Incomplete,
    /// A candidate frame failed its body checksum and was discarded; the
    /// buffer may still hold further frames, so callers should parse again.
    CrcMismatch,
}

/// Extract the next frame from `buffer`, draining every consumed byte.
///
/// Re-entrant: call repeatedly against the same buffer to drain all frames
/// currently available.
pub fn parse_next(buffer: &mut Vec<u8>) -> ParseResult {
    loop {
        // Seek the sync marker; everything before it is resync noise.
        match buffer.iter().position(|&b| b == SYNC_BYTE) {
            Some(0) => {}
            Some(noise) => {
                trace!(noise, "discarding bytes before sync marker");
                buffer.drain(..noise);
            }
            None => {
                // No marker anywhere: the whole buffer is noise.
                if !buffer.is_empty() {
                    trace!(noise = buffer.len(), "discarding sync-less buffer");
                    buffer.clear();
                }
                return ParseResult::Incomplete;
            }
        }

        if buffer.len() < 1 + HEADER_LEN {
            return ParseResult::Incomplete;
        }

        let header = &buffer[1..1 + HEADER_LEN];
        let header_crc = header[4];
        let computed = crc8(&header[..4]);
        if computed != header_crc {
            // Spurious marker. Drop it alone: a real frame may start inside
            // what looked like this frame's header.
            trace!(expected = header_crc, computed, "header CRC mismatch, resyncing");
            buffer.drain(..1);
            continue;
        }

        let data_len = usize::from(u16::from_be_bytes([header[0], header[1]]));
        let opt_len = usize::from(header[2]);
        let type_byte = header[3];

        let frame_len = 1 + HEADER_LEN + data_len + opt_len + 1;
        if buffer.len() < frame_len {
            return ParseResult::Incomplete;
        }

        let body = &buffer[1 + HEADER_LEN..frame_len - 1];
        let body_crc = buffer[frame_len - 1];
        let computed = crc8(body);
        if computed != body_crc {
            warn!(
                expected = body_crc,
                computed,
                data_len,
                opt_len,
                "body CRC mismatch, dropping candidate frame"
            );
            buffer.drain(..frame_len);
            return ParseResult::CrcMismatch;
        }

        let data = body[..data_len].to_vec();
        let optional = body[data_len..].to_vec();
        buffer.drain(..frame_len);

        trace!(packet_type = type_byte, data_len, opt_len, "frame parsed");
        return ParseResult::Packet(Packet::from_wire(type_byte, data, optional));
    }
}

/// Serialize a packet to wire bytes.
///
/// The inverse of [`parse_next`]: sync marker, header, header CRC, data,
/// optional, body CRC. Section lengths must fit the header's one-byte
/// bound; oversized sections are a construction error.
pub fn serialize(packet: &Packet) -> Result<Vec<u8>> {
    let data = packet.data();
    let optional = packet.optional();

    if data.len() > crate::packet::MAX_SECTION_LEN {
        return Err(Esp3Error::SectionTooLong { section: "data", len: data.len() });
    }
    if optional.len() > crate::packet::MAX_SECTION_LEN {
        return Err(Esp3Error::SectionTooLong { section: "optional", len: optional.len() });
    }

    let mut frame = Vec::with_capacity(1 + HEADER_LEN + data.len() + optional.len() + 1);
    frame.push(SYNC_BYTE);

    let data_len = data.len() as u16;
    frame.extend_from_slice(&data_len.to_be_bytes());
    frame.push(optional.len() as u8);
    frame.push(packet.packet_type().to_byte());
    frame.push(crc8(&frame[1..5]));

    frame.extend_from_slice(data);
    frame.extend_from_slice(optional);
    frame.push(crc8(&frame[1 + HEADER_LEN..]));

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketType;
    use proptest::prelude::*;

    /// The MSC telegram from the protocol's reference capture.
    const MSC_FRAME: [u8; 29] = [
        0x55, 0x00, 0x0f, 0x07, 0x01, 0x2b, 0xd1, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd, 0xdd,
        0xdd, 0x00, 0x80, 0x35, 0xc4, 0x00, 0x03, 0xff, 0xff, 0xff, 0xff, 0x4d, 0x00, 0xc0,
    ];

    #[test]
    fn parses_reference_msc_telegram() {
        let mut buffer = MSC_FRAME.to_vec();
        let result = parse_next(&mut buffer);

        let ParseResult::Packet(packet) = result else {
            panic!("expected a packet, got {result:?}");
        };
        assert_eq!(packet.packet_type(), PacketType::RadioErp1);
        assert_eq!(packet.data().len(), 15);
        assert_eq!(packet.optional().len(), 7);
        assert_eq!(packet.status(), Some(0x00));
        assert_eq!(packet.repeater_count(), Some(0));
        assert!(buffer.is_empty());
    }

    #[test]
    fn incomplete_until_full_frame_arrives() {
        let mut buffer = Vec::new();
        for (i, &byte) in MSC_FRAME.iter().enumerate() {
            buffer.push(byte);
            if i < MSC_FRAME.len() - 1 {
                assert_eq!(parse_next(&mut buffer), ParseResult::Incomplete, "byte {i}");
            }
        }
        assert!(matches!(parse_next(&mut buffer), ParseResult::Packet(_)));
    }

    #[test]
    fn noise_prefix_is_discarded() {
        let mut buffer = vec![0x01, 0xd1, 0xff, 0x3a];
        buffer.extend_from_slice(&MSC_FRAME);

        let ParseResult::Packet(packet) = parse_next(&mut buffer) else {
            panic!("expected a packet after noise");
        };
        assert_eq!(packet.data().len(), 15);
        assert!(buffer.is_empty());
    }

    #[test]
    fn sync_less_buffer_is_cleared() {
        let mut buffer = vec![0x00, 0x01, 0x02, 0xaa];
        assert_eq!(parse_next(&mut buffer), ParseResult::Incomplete);
        assert!(buffer.is_empty());
    }

    #[test]
    fn spurious_sync_does_not_forfeit_following_frame() {
        // A lone 0x55 whose following bytes do not form a valid header,
        // immediately followed by a real frame.
        let mut buffer = vec![SYNC_BYTE];
        buffer.extend_from_slice(&MSC_FRAME);

        let ParseResult::Packet(packet) = parse_next(&mut buffer) else {
            panic!("expected the real frame to survive a spurious sync");
        };
        assert_eq!(packet.data().len(), 15);
    }

    #[test]
    fn body_corruption_drops_candidate_and_resyncs() {
        let mut corrupted = MSC_FRAME.to_vec();
        corrupted[10] ^= 0x01;
        let mut buffer = corrupted;
        buffer.extend_from_slice(&MSC_FRAME);

        assert_eq!(parse_next(&mut buffer), ParseResult::CrcMismatch);
        // The good frame behind it is still parseable.
        assert!(matches!(parse_next(&mut buffer), ParseResult::Packet(_)));
        assert!(buffer.is_empty());
    }

    #[test]
    fn serialize_reference_frame_is_bit_exact() {
        let packet = Packet::from_wire(
            0x01,
            MSC_FRAME[6..21].to_vec(),
            MSC_FRAME[21..28].to_vec(),
        );
        assert_eq!(serialize(&packet).unwrap(), MSC_FRAME.to_vec());
    }

    #[test]
    fn serialize_rejects_oversized_data() {
        let packet = Packet::from_wire(0x01, vec![0; 300], vec![]);
        let err = serialize(&packet).unwrap_err();
        assert!(matches!(err, Esp3Error::SectionTooLong { section: "data", .. }));
    }

    #[test]
    fn drains_multiple_frames_from_one_buffer() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&MSC_FRAME);
        buffer.extend_from_slice(&MSC_FRAME);

        assert!(matches!(parse_next(&mut buffer), ParseResult::Packet(_)));
        assert!(matches!(parse_next(&mut buffer), ParseResult::Packet(_)));
        assert_eq!(parse_next(&mut buffer), ParseResult::Incomplete);
    }

    // Property test strategies
    prop_compose! {
        fn arb_packet()(
            type_byte in any::<u8>(),
            data in proptest::collection::vec(any::<u8>(), 0..=64),
            optional in proptest::collection::vec(any::<u8>(), 0..=16),
        ) -> Packet {
            Packet::from_wire(type_byte, data, optional)
        }
    }

    proptest! {
        #[test]
        fn prop_roundtrip_preserves_packet(packet in arb_packet()) {
            let mut buffer = serialize(&packet).unwrap();
            let result = parse_next(&mut buffer);
            prop_assert_eq!(result, ParseResult::Packet(packet));
            prop_assert!(buffer.is_empty());
        }

        #[test]
        fn prop_two_chunk_delivery_loses_nothing(
            packet in arb_packet(),
            split in 1..27usize,
        ) {
            let frame = serialize(&packet).unwrap();
            let split = split.min(frame.len() - 1);

            let mut buffer = frame[..split].to_vec();
            prop_assert_eq!(parse_next(&mut buffer), ParseResult::Incomplete);

            buffer.extend_from_slice(&frame[split..]);
            prop_assert_eq!(parse_next(&mut buffer), ParseResult::Packet(packet));
            prop_assert!(buffer.is_empty());
        }

        #[test]
        fn prop_single_bit_flip_never_parses_as_original(
            packet in arb_packet(),
            flip_byte in 0..16usize,
            flip_bit in 0..8u8,
        ) {
            let frame = serialize(&packet).unwrap();
            let flip_byte = flip_byte % frame.len();

            let mut corrupted = frame.clone();
            corrupted[flip_byte] ^= 1 << flip_bit;

            let mut buffer = corrupted;
            match parse_next(&mut buffer) {
                // A flip may still yield some frame (e.g. inside the length
                // field with colliding CRCs) but never the original bytes
                // decoded silently wrong.
                ParseResult::Packet(parsed) => prop_assert_ne!(parsed, packet),
                ParseResult::Incomplete | ParseResult::CrcMismatch => {}
            }
        }

        #[test]
        fn prop_noise_prefix_yields_same_packet(
            packet in arb_packet(),
            noise in proptest::collection::vec(any::<u8>().prop_filter("no sync", |&b| b != SYNC_BYTE), 0..32),
        ) {
            let frame = serialize(&packet).unwrap();

            let mut buffer = noise;
            buffer.extend_from_slice(&frame);

            // The noise holds no sync marker, so the real frame must come out
            // unchanged on the first successful parse.
            loop {
                match parse_next(&mut buffer) {
                    ParseResult::Packet(parsed) => {
                        prop_assert_eq!(parsed, packet);
                        break;
                    }
                    ParseResult::CrcMismatch => {}
                    ParseResult::Incomplete => prop_assert!(false, "frame lost to noise"),
                }
            }
        }

        #[test]
        fn prop_parser_always_makes_progress(
            junk in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let mut buffer = junk;
            // Drain until incomplete; each iteration must shrink the buffer
            // or finish, so this loop is bounded by the buffer length.
            for _ in 0..=256 {
                let before = buffer.len();
                match parse_next(&mut buffer) {
                    ParseResult::Incomplete => return Ok(()),
                    _ => prop_assert!(buffer.len() < before),
                }
            }
            prop_assert!(false, "parser failed to terminate");
        }
    }
}
