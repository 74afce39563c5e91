// SPDX-FileCopyrightText: 2026 The vrt-bridge Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The VRT packet codec: pure functions that translate between a raw
32-bit-word buffer (network byte order) and a [`PacketRecord`]. No
I/O, no allocation beyond the caller's buffer.
*/

use crate::class_id::ClassIdentifier;
use crate::error::VrtError;
use crate::header::{PacketHeader, Tsf, Tsi};
use crate::trailer::Trailer;

/// A parsed VRT packet. The `payload` field is a non-owning view into
/// the buffer `parse` was called with — it is never copied into an
/// owning container, preserving the zero-copy property of the codec.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PacketRecord<'a> {
    header: PacketHeader,
    stream_id: Option<u32>,
    class_id: Option<ClassIdentifier>,
    timestamp_int: Option<u32>,
    timestamp_frac: Option<u64>,
    payload: &'a [u32],
    trailer: Option<Trailer>,
}

impl<'a> PacketRecord<'a> {
    /// Gets the packet header.
    pub fn header(&self) -> PacketHeader {
        self.header
    }

    /// Gets a mutable reference to the packet header.
    pub fn header_mut(&mut self) -> &mut PacketHeader {
        &mut self.header
    }

    /// Gets the Stream ID, if present.
    pub fn stream_id(&self) -> Option<u32> {
        self.stream_id
    }

    /// Sets the Stream ID.
    pub fn set_stream_id(&mut self, stream_id: Option<u32>) {
        self.stream_id = stream_id;
    }

    /// Returns true if a Stream ID is present.
    pub fn has_stream_id(&self) -> bool {
        self.stream_id.is_some()
    }

    /// Gets the Class ID, if present.
    pub fn class_id(&self) -> Option<ClassIdentifier> {
        self.class_id
    }

    /// Sets the Class ID.
    pub fn set_class_id(&mut self, class_id: Option<ClassIdentifier>) {
        self.class_id = class_id;
        self.header.set_has_class_id(class_id.is_some());
    }

    /// Gets the integer timestamp, if present.
    pub fn timestamp_int(&self) -> Option<u32> {
        self.timestamp_int
    }

    /// Sets the integer timestamp.
    pub fn set_timestamp_int(&mut self, value: Option<u32>) {
        self.timestamp_int = value;
    }

    /// Gets the fractional timestamp, if present.
    pub fn timestamp_frac(&self) -> Option<u64> {
        self.timestamp_frac
    }

    /// Sets the fractional timestamp.
    pub fn set_timestamp_frac(&mut self, value: Option<u64>) {
        self.timestamp_frac = value;
    }

    /// Gets the payload words, still in network byte order. Use
    /// [`get_payload_word`]/[`get_payload_double`] to decode them.
    pub fn payload(&self) -> &'a [u32] {
        self.payload
    }

    /// Sets the payload (replacing the borrowed view). Words must
    /// already be in network byte order.
    pub fn set_payload(&mut self, payload: &'a [u32]) {
        self.payload = payload;
    }

    /// Gets the number of 32-bit words in the payload.
    pub fn payload_words(&self) -> usize {
        self.payload.len()
    }

    /// Gets the trailer, if present.
    pub fn trailer(&self) -> Option<Trailer> {
        self.trailer
    }

    /// Sets the trailer.
    pub fn set_trailer(&mut self, trailer: Option<Trailer>) {
        self.trailer = trailer;
        self.header.set_has_trailer(trailer.is_some());
    }

    /// Builds an empty packet record from a header, with no optional
    /// fields and an empty payload. Useful for constructing packets to
    /// hand to [`generate`].
    pub fn new(header: PacketHeader) -> PacketRecord<'static> {
        PacketRecord {
            header,
            stream_id: None,
            class_id: None,
            timestamp_int: None,
            timestamp_frac: None,
            payload: &[],
            trailer: None,
        }
    }
}

/// Reads the word at `buf[idx]`, converting it from network byte
/// order, or `None` if `idx` is out of range.
fn word_at(buf: &[u32], idx: usize) -> Option<u32> {
    buf.get(idx).copied().map(u32::from_be)
}

fn invalid(msg: impl Into<String>) -> VrtError {
    VrtError::InvalidArgument(msg.into())
}

/// Parses a buffer of 32-bit words (network byte order) into a
/// [`PacketRecord`] borrowing from `buf`.
///
/// `words` is the number of words the caller considers populated in
/// `buf` (e.g. `received_bytes / 4`); `buf` itself may be longer, but
/// must be at least `words` long.
pub fn parse(buf: &[u32], words: usize) -> Result<PacketRecord<'_>, VrtError> {
    if words == 0 {
        return Err(invalid("zero-length buffer"));
    }
    if buf.len() < words {
        return Err(invalid("buffer shorter than declared word count"));
    }

    let header_word = word_at(buf, 0).ok_or_else(|| invalid("missing header word"))?;
    let header = PacketHeader::from_u32(header_word);
    let packet_size_words = header.packet_size_words() as usize;
    if packet_size_words > words {
        return Err(invalid("packet_size_words exceeds buffer"));
    }

    let mut idx = 1usize;

    let mut stream_id = None;
    if header.has_stream_id() {
        if idx >= packet_size_words {
            return Err(invalid("truncated before stream id"));
        }
        stream_id = Some(word_at(buf, idx).ok_or_else(|| invalid("stream id out of bounds"))?);
        idx += 1;
    }

    let mut class_id = None;
    if header.has_class_id() {
        if idx + 1 >= packet_size_words {
            return Err(invalid("truncated before class id"));
        }
        let w0 = word_at(buf, idx).ok_or_else(|| invalid("class id out of bounds"))? as u64;
        let w1 = word_at(buf, idx + 1).ok_or_else(|| invalid("class id out of bounds"))? as u64;
        class_id = Some(ClassIdentifier::from_u64((w0 << 32) | w1));
        idx += 2;
    }

    let mut timestamp_int = None;
    if header.tsi() != Tsi::None {
        if idx >= packet_size_words {
            return Err(invalid("truncated before integer timestamp"));
        }
        timestamp_int = Some(word_at(buf, idx).ok_or_else(|| invalid("timestamp int out of bounds"))?);
        idx += 1;
    }

    let mut timestamp_frac = None;
    if header.tsf() != Tsf::None {
        if idx + 1 >= packet_size_words {
            return Err(invalid("truncated before fractional timestamp"));
        }
        let w0 = word_at(buf, idx).ok_or_else(|| invalid("timestamp frac out of bounds"))? as u64;
        let w1 = word_at(buf, idx + 1).ok_or_else(|| invalid("timestamp frac out of bounds"))? as u64;
        timestamp_frac = Some((w0 << 32) | w1);
        idx += 2;
    }

    if packet_size_words < idx {
        return Err(invalid("packet_size_words smaller than the fields the header declares"));
    }

    let (payload, trailer) = if header.has_trailer() {
        if packet_size_words < idx + 1 {
            return Err(invalid("no room for trailer"));
        }
        let trailer_word =
            word_at(buf, packet_size_words - 1).ok_or_else(|| invalid("trailer out of bounds"))?;
        (&buf[idx..packet_size_words - 1], Some(Trailer::from_u32(trailer_word)))
    } else {
        (&buf[idx..packet_size_words], None)
    };

    Ok(PacketRecord {
        header,
        stream_id,
        class_id,
        timestamp_int,
        timestamp_frac,
        payload,
        trailer,
    })
}

/// Generates a buffer of 32-bit words (network byte order) from a
/// [`PacketRecord`]. Writes words in the same order `parse` consumes
/// them. `packet_size_words` in the header is recomputed from the
/// actual words written. Returns the number of words written.
///
/// The caller's payload words are assumed already big-endian and are
/// copied verbatim.
pub fn generate(pkt: &PacketRecord, buf: &mut [u32]) -> Result<usize, VrtError> {
    if buf.is_empty() {
        return Err(VrtError::NoBuffer);
    }
    let mut idx = 1usize;

    if pkt.header.has_stream_id() {
        if idx >= buf.len() {
            return Err(VrtError::NoBuffer);
        }
        buf[idx] = pkt.stream_id.unwrap_or(0).to_be();
        idx += 1;
    }

    if pkt.header.has_class_id() {
        if idx + 1 >= buf.len() {
            return Err(VrtError::NoBuffer);
        }
        let cid = pkt.class_id.unwrap_or_default().as_u64();
        buf[idx] = ((cid >> 32) as u32).to_be();
        buf[idx + 1] = (cid as u32).to_be();
        idx += 2;
    }

    if pkt.header.tsi() != Tsi::None {
        if idx >= buf.len() {
            return Err(VrtError::NoBuffer);
        }
        buf[idx] = pkt.timestamp_int.unwrap_or(0).to_be();
        idx += 1;
    }

    if pkt.header.tsf() != Tsf::None {
        if idx + 1 >= buf.len() {
            return Err(VrtError::NoBuffer);
        }
        let ts = pkt.timestamp_frac.unwrap_or(0);
        buf[idx] = ((ts >> 32) as u32).to_be();
        buf[idx + 1] = (ts as u32).to_be();
        idx += 2;
    }

    let payload_words = pkt.payload.len();
    if payload_words > 0 {
        let trailer_room = if pkt.header.has_trailer() { 1 } else { 0 };
        if idx + payload_words + trailer_room > buf.len() {
            return Err(VrtError::NoBuffer);
        }
        buf[idx..idx + payload_words].copy_from_slice(pkt.payload);
        idx += payload_words;
    }

    if pkt.header.has_trailer() {
        if idx >= buf.len() {
            return Err(VrtError::NoBuffer);
        }
        buf[idx] = pkt.trailer.unwrap_or_default().as_u32().to_be();
        idx += 1;
    }

    let mut final_header = pkt.header;
    final_header.set_packet_size_words(idx as u16);
    buf[0] = final_header.as_u32().to_be();

    Ok(idx)
}

/// Extracts a host-order 32-bit word from the packet payload at
/// `offset`. Returns `0` if `offset` is out of range.
pub fn get_payload_word(pkt: &PacketRecord, offset: usize) -> u32 {
    pkt.payload.get(offset).copied().map(u32::from_be).unwrap_or(0)
}

/// Extracts an IEEE-754 double from two consecutive payload words
/// (high word first) at `offset`. Returns `0.0` if out of range.
pub fn get_payload_double(pkt: &PacketRecord, offset: usize) -> f64 {
    if offset + 1 >= pkt.payload.len() {
        return 0.0;
    }
    let hi = u32::from_be(pkt.payload[offset]) as u64;
    let lo = u32::from_be(pkt.payload[offset + 1]) as u64;
    f64::from_bits((hi << 32) | lo)
}

/// Inserts a host-order 32-bit word into a raw payload buffer,
/// converting to network byte order. Silently no-ops if `offset` is
/// out of range.
pub fn set_payload_word(payload: &mut [u32], offset: usize, val: u32) {
    if let Some(slot) = payload.get_mut(offset) {
        *slot = val.to_be();
    }
}

/// Inserts an IEEE-754 double into two consecutive words of a raw
/// payload buffer (high word first), converting to network byte
/// order. Silently no-ops if `offset` is out of range.
pub fn set_payload_double(payload: &mut [u32], offset: usize, val: f64) {
    if offset + 1 >= payload.len() {
        return;
    }
    let bits = val.to_bits();
    payload[offset] = ((bits >> 32) as u32).to_be();
    payload[offset + 1] = (bits as u32).to_be();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::PacketType;

    fn context_header(size_words: u16, has_class_id: bool) -> PacketHeader {
        let mut h = PacketHeader::default();
        h.set_packet_type(PacketType::IfContext);
        h.set_has_class_id(has_class_id);
        h.set_packet_size_words(size_words);
        h
    }

    /// Scenario 1 from the spec: a 10-word IF_Context packet with a
    /// class ID and a 6-word CIF0 payload.
    #[test]
    fn scenario_1_parses_if_context_with_class_id() {
        let mut buf = [0u32; 10];
        buf[0] = context_header(10, true).as_u32().to_be();
        buf[1] = 0x12345678u32.to_be();
        buf[2] = 0x0012A200u32.to_be();
        buf[3] = 0x00000001u32.to_be();
        buf[4] = ((1u32 << 21) | (1u32 << 30)).to_be();
        // words 5..9 left as zero, still part of the payload.

        let pkt = parse(&buf, 10).expect("parse");
        assert!(pkt.has_stream_id());
        assert_eq!(pkt.stream_id(), Some(0x12345678));
        assert!(pkt.class_id().is_some());
        assert_eq!(pkt.class_id().unwrap().as_u64(), 0x0012A20000000001);
        assert_eq!(pkt.payload_words(), 6);
        assert_eq!(pkt.timestamp_int(), None);
        assert_eq!(pkt.timestamp_frac(), None);
        assert!(pkt.trailer().is_none());
    }

    /// Scenario 2 from the spec: generate then re-parse an
    /// IF_Data_With_SID packet with TSI/TSF/trailer.
    #[test]
    fn scenario_2_generate_then_reparse_if_data_with_sid() {
        let mut h = PacketHeader::default();
        h.set_packet_type(PacketType::IfDataWithSid);
        h.set_has_trailer(true);
        h.set_tsi(Tsi::Utc);
        h.set_tsf(Tsf::RealTime);

        let payload = [0xDEADBEEFu32.to_be(), 0xCAFEBABEu32.to_be()];
        let mut trailer = Trailer::default();
        trailer.set_context_packet_count_enable(true);

        let mut pkt = PacketRecord::new(h);
        pkt.set_stream_id(Some(0x87654321));
        pkt.set_timestamp_int(Some(1_000_000));
        pkt.set_timestamp_frac(Some(2_000_000));
        pkt.set_payload(&payload);
        pkt.set_trailer(Some(trailer));

        let mut out = [0u32; 10];
        let words = generate(&pkt, &mut out).expect("generate");
        assert_eq!(words, 8);

        let pkt2 = parse(&out, words).expect("reparse");
        assert_eq!(pkt2.stream_id(), Some(0x87654321));
        assert_eq!(pkt2.timestamp_int(), Some(1_000_000));
        assert_eq!(pkt2.timestamp_frac(), Some(2_000_000));
        assert_eq!(pkt2.payload_words(), 2);
        assert_eq!(get_payload_word(&pkt2, 0), 0xDEADBEEF);
        assert_eq!(get_payload_word(&pkt2, 1), 0xCAFEBABE);
        assert!(pkt2.trailer().unwrap().context_packet_count_enable());
    }

    /// Scenario 6 from the spec: a truncated buffer whose header
    /// claims a size larger than what's actually present.
    #[test]
    fn scenario_6_malformed_packet_size_is_rejected() {
        let mut buf = [0u32; 4];
        let mut h = PacketHeader::default();
        h.set_packet_type(PacketType::IfContext);
        h.set_packet_size_words(12);
        buf[0] = h.as_u32().to_be();

        assert!(matches!(parse(&buf, 4), Err(VrtError::InvalidArgument(_))));
    }

    #[test]
    fn parse_rejects_zero_words() {
        let buf = [0u32; 1];
        assert!(matches!(parse(&buf, 0), Err(VrtError::InvalidArgument(_))));
    }

    #[test]
    fn generate_into_undersized_buffer_returns_no_buffer() {
        let mut h = PacketHeader::default();
        h.set_packet_type(PacketType::IfDataWithSid);
        let mut pkt = PacketRecord::new(h);
        pkt.set_stream_id(Some(1));
        let payload = [1u32, 2, 3, 4];
        pkt.set_payload(&payload);

        // Needs 1 (header) + 1 (sid) + 4 (payload) = 6 words; give it 5.
        let mut out = [0u32; 5];
        assert!(matches!(generate(&pkt, &mut out), Err(VrtError::NoBuffer)));
    }

    #[test]
    fn generate_into_empty_buffer_returns_no_buffer() {
        let h = PacketHeader::default();
        let pkt = PacketRecord::new(h);
        assert!(matches!(generate(&pkt, &mut []), Err(VrtError::NoBuffer)));
    }

    #[test]
    fn round_trip_preserves_reserved_header_bits() {
        let mut buf = [0u32; 3];
        // Build a raw header with reserved bits set directly, plus a
        // Stream ID, for a SignalData-with-SID packet.
        let mut h = PacketHeader::default();
        h.set_packet_type(PacketType::IfDataWithSid);
        h.set_packet_size_words(2);
        let raw = h.as_u32() | (0b11 << 24);
        buf[0] = raw.to_be();
        buf[1] = 0xAAAAAAAAu32.to_be();

        let pkt = parse(&buf, 2).expect("parse");
        let mut out = [0u32; 3];
        let words = generate(&pkt, &mut out).expect("generate");
        let pkt2 = parse(&out[..words], words).expect("reparse");
        assert_eq!(pkt2.header().as_u32() & (0b11 << 24), 0b11 << 24);
        assert_eq!(pkt, pkt2);
    }

    #[test]
    fn get_payload_word_out_of_range_is_zero() {
        let mut buf = [0u32; 2];
        let mut h = PacketHeader::default();
        h.set_packet_type(PacketType::IfDataNoSid);
        h.set_packet_size_words(2);
        buf[0] = h.as_u32().to_be();

        let pkt = parse(&buf, 2).expect("parse");
        assert_eq!(get_payload_word(&pkt, 100), 0);
    }

    #[test]
    fn get_payload_double_decodes_high_word_first() {
        let mut payload = [0u32; 2];
        set_payload_double(&mut payload, 0, 56_000_000.0);
        let mut h = PacketHeader::default();
        h.set_packet_type(PacketType::IfDataNoSid);
        let mut pkt = PacketRecord::new(h);
        pkt.set_payload(&payload);
        assert_eq!(get_payload_double(&pkt, 0), 56_000_000.0);
    }
}
