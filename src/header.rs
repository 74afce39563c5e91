// SPDX-FileCopyrightText: 2026 The vrt-bridge Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The VRT packet header (32 bits) and the small enumerations it carries.

Bit layout, most-significant bit first:

```text
[packet_type:4][has_class_id:1][has_trailer:1][reserved:2][tsi:2][tsf:2][packet_count:4][packet_size_words:16]
```

Encoded as a plain `u32` with shift/mask accessors rather than a
compiler bit-field struct, so the layout does not depend on host
endianness or the C ABI.
*/

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
/// The type of VRT packet. Determines which optional fields (stream
/// ID, in particular) are present.
pub enum PacketType {
    /// IF Data, no Stream ID.
    IfDataNoSid,
    /// IF Data, with Stream ID.
    IfDataWithSid,
    /// Extension Data, no Stream ID.
    ExtDataNoSid,
    /// Extension Data, with Stream ID.
    ExtDataWithSid,
    /// IF Context.
    IfContext,
    /// Extension Context.
    ExtContext,
    /// Command.
    Command,
    /// Extension Command.
    ExtCommand,
}

impl PacketType {
    /// Returns true if this packet type carries a Stream ID field.
    pub fn has_stream_id(&self) -> bool {
        !matches!(self, PacketType::IfDataNoSid | PacketType::ExtDataNoSid)
    }
}

impl TryFrom<u8> for PacketType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(PacketType::IfDataNoSid),
            0x1 => Ok(PacketType::IfDataWithSid),
            0x2 => Ok(PacketType::ExtDataNoSid),
            0x3 => Ok(PacketType::ExtDataWithSid),
            0x4 => Ok(PacketType::IfContext),
            0x5 => Ok(PacketType::ExtContext),
            0x6 => Ok(PacketType::Command),
            0x7 => Ok(PacketType::ExtCommand),
            _ => Err(()),
        }
    }
}

impl From<PacketType> for u8 {
    fn from(value: PacketType) -> u8 {
        match value {
            PacketType::IfDataNoSid => 0x0,
            PacketType::IfDataWithSid => 0x1,
            PacketType::ExtDataNoSid => 0x2,
            PacketType::ExtDataWithSid => 0x3,
            PacketType::IfContext => 0x4,
            PacketType::ExtContext => 0x5,
            PacketType::Command => 0x6,
            PacketType::ExtCommand => 0x7,
        }
    }
}

/// TimeStamp-Integer (TSI) format selector.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Tsi {
    /// No integer timestamp.
    None,
    /// UTC time.
    Utc,
    /// GPS time.
    Gps,
    /// Other time base.
    Other,
}

impl TryFrom<u8> for Tsi {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Tsi::None),
            1 => Ok(Tsi::Utc),
            2 => Ok(Tsi::Gps),
            3 => Ok(Tsi::Other),
            _ => Err(()),
        }
    }
}

impl From<Tsi> for u8 {
    fn from(value: Tsi) -> u8 {
        match value {
            Tsi::None => 0,
            Tsi::Utc => 1,
            Tsi::Gps => 2,
            Tsi::Other => 3,
        }
    }
}

/// TimeStamp-Fractional (TSF) format selector.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Tsf {
    /// No fractional timestamp.
    None,
    /// Sample-count based.
    SampleCount,
    /// Real time, in picoseconds.
    RealTime,
    /// Free-running count.
    FreeRunning,
}

impl TryFrom<u8> for Tsf {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Tsf::None),
            1 => Ok(Tsf::SampleCount),
            2 => Ok(Tsf::RealTime),
            3 => Ok(Tsf::FreeRunning),
            _ => Err(()),
        }
    }
}

impl From<Tsf> for u8 {
    fn from(value: Tsf) -> u8 {
        match value {
            Tsf::None => 0,
            Tsf::SampleCount => 1,
            Tsf::RealTime => 2,
            Tsf::FreeRunning => 3,
        }
    }
}

const PACKET_TYPE_SHIFT: u32 = 28;
const HAS_CLASS_ID_SHIFT: u32 = 27;
const HAS_TRAILER_SHIFT: u32 = 26;
const TSI_SHIFT: u32 = 22;
const TSF_SHIFT: u32 = 20;
const PACKET_COUNT_SHIFT: u32 = 16;

/// The VRT packet header: a single 32-bit word holding the packet
/// type, optional-field indicators, timestamp format selectors, the
/// modulo-16 packet count, and the total packet size in 32-bit words.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct PacketHeader(u32);

impl PacketHeader {
    /// Builds a header from its raw host-order 32-bit value.
    pub fn from_u32(word: u32) -> PacketHeader {
        PacketHeader(word)
    }

    /// Returns the raw host-order 32-bit value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Gets the packet type.
    pub fn packet_type(&self) -> PacketType {
        (((self.0 >> PACKET_TYPE_SHIFT) & 0xF) as u8)
            .try_into()
            .expect("4-bit field covers all 8 PacketType variants twice over")
    }

    /// Sets the packet type.
    pub fn set_packet_type(&mut self, packet_type: PacketType) {
        self.0 &= !(0xF << PACKET_TYPE_SHIFT);
        self.0 |= (u8::from(packet_type) as u32) << PACKET_TYPE_SHIFT;
    }

    /// Returns true if a Class ID is included in the packet.
    pub fn has_class_id(&self) -> bool {
        self.0 & (1 << HAS_CLASS_ID_SHIFT) != 0
    }

    /// Sets the Class ID included flag.
    pub fn set_has_class_id(&mut self, included: bool) {
        self.0 = (self.0 & !(1 << HAS_CLASS_ID_SHIFT)) | ((included as u32) << HAS_CLASS_ID_SHIFT);
    }

    /// Returns true if a trailer is included in the packet.
    pub fn has_trailer(&self) -> bool {
        self.0 & (1 << HAS_TRAILER_SHIFT) != 0
    }

    /// Sets the trailer included flag.
    pub fn set_has_trailer(&mut self, included: bool) {
        self.0 = (self.0 & !(1 << HAS_TRAILER_SHIFT)) | ((included as u32) << HAS_TRAILER_SHIFT);
    }

    /// Gets the TimeStamp-Integer format.
    pub fn tsi(&self) -> Tsi {
        (((self.0 >> TSI_SHIFT) & 0b11) as u8)
            .try_into()
            .expect("2-bit field covers all 4 Tsi variants")
    }

    /// Sets the TimeStamp-Integer format.
    pub fn set_tsi(&mut self, tsi: Tsi) {
        self.0 = (self.0 & !(0b11 << TSI_SHIFT)) | ((u8::from(tsi) as u32) << TSI_SHIFT);
    }

    /// Gets the TimeStamp-Fractional format.
    pub fn tsf(&self) -> Tsf {
        (((self.0 >> TSF_SHIFT) & 0b11) as u8)
            .try_into()
            .expect("2-bit field covers all 4 Tsf variants")
    }

    /// Sets the TimeStamp-Fractional format.
    pub fn set_tsf(&mut self, tsf: Tsf) {
        self.0 = (self.0 & !(0b11 << TSF_SHIFT)) | ((u8::from(tsf) as u32) << TSF_SHIFT);
    }

    /// Gets the modulo-16 packet counter.
    pub fn packet_count(&self) -> u8 {
        ((self.0 >> PACKET_COUNT_SHIFT) & 0xF) as u8
    }

    /// Sets the modulo-16 packet counter.
    pub fn set_packet_count(&mut self, count: u8) {
        self.0 = (self.0 & !(0xF << PACKET_COUNT_SHIFT))
            | (((count & 0xF) as u32) << PACKET_COUNT_SHIFT);
    }

    /// Increments the packet counter by one, wrapping at 16.
    pub fn inc_packet_count(&mut self) {
        self.set_packet_count((self.packet_count() + 1) % 16);
    }

    /// Gets the total packet size, in 32-bit words (including the
    /// header itself).
    pub fn packet_size_words(&self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Sets the total packet size, in 32-bit words.
    pub fn set_packet_size_words(&mut self, words: u16) {
        self.0 = (self.0 & !0xFFFF) | (words as u32);
    }

    /// Returns true if this packet type carries a Stream ID.
    pub fn has_stream_id(&self) -> bool {
        self.packet_type().has_stream_id()
    }
}
