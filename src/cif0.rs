// SPDX-FileCopyrightText: 2026 The vrt-bridge Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
Decodes the Context Indicator Field 0 (CIF0) bitmap and the context
fields it selects, from a parsed [`PacketRecord`]'s payload.

Fields are read in descending bit order (31 down to 15), each
consuming the number of 32-bit words its type requires, exactly
mirroring the wire order the indicator bits describe. Unlike the
reference implementation this decoder bounds-checks every read against
the packet's actual payload length and fails closed with
[`VrtError::InvalidArgument`] on truncation rather than reading past
the end of the buffer.

Only CIF0 is supported (CIF1/2/3/7 are out of scope); fields not
covered by CIF0 are simply absent from [`CifFields`].
*/

use crate::error::VrtError;
use crate::packet::{get_payload_double, get_payload_word, PacketRecord};

const BIT_CHANGE_INDICATOR: u32 = 31;
const BIT_REFERENCE_POINT_ID: u32 = 30;
const BIT_BANDWIDTH: u32 = 29;
const BIT_IF_REFERENCE_FREQUENCY: u32 = 28;
const BIT_RF_REFERENCE_FREQUENCY: u32 = 27;
const BIT_RF_REFERENCE_FREQUENCY_OFFSET: u32 = 26;
const BIT_IF_BAND_OFFSET: u32 = 25;
const BIT_REFERENCE_LEVEL: u32 = 24;
const BIT_GAIN: u32 = 23;
const BIT_OVER_RANGE_COUNT: u32 = 22;
const BIT_SAMPLE_RATE: u32 = 21;
const BIT_TIMESTAMP_ADJUSTMENT: u32 = 20;
const BIT_TIMESTAMP_CALIBRATION_TIME: u32 = 19;
const BIT_TEMPERATURE: u32 = 18;
const BIT_DEVICE_IDENTIFIER: u32 = 17;
const BIT_STATE_EVENT_INDICATORS: u32 = 16;
const BIT_DATA_PAYLOAD_FORMAT: u32 = 15;

/// A device identifier: a 24-bit OUI plus a 16-bit device code.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct DeviceIdentifier {
    pub oui: u32,
    pub device_code: u16,
}

/// Decoded CIF0 context fields. Every field beyond `raw_cif0` is
/// `None` unless its corresponding bit was set in the bitmap.
#[derive(Clone, Debug, Default)]
pub struct CifFields {
    /// The raw CIF0 bitmap word itself.
    pub raw_cif0: u32,
    /// Bit 31: a context field changed since the last context packet
    /// on this stream. Carries no payload word of its own.
    pub change_indicator: bool,
    pub reference_point_id: Option<u32>,
    pub bandwidth_hz: Option<f64>,
    pub if_reference_frequency_hz: Option<f64>,
    pub rf_reference_frequency_hz: Option<f64>,
    pub rf_reference_frequency_offset_hz: Option<f64>,
    pub if_band_offset_hz: Option<f64>,
    pub reference_level_dbm: Option<f32>,
    pub gain_stage1_db: Option<f32>,
    pub gain_stage2_db: Option<f32>,
    pub over_range_count: Option<u32>,
    pub sample_rate_hz: Option<f64>,
    pub timestamp_adjustment: Option<u64>,
    pub timestamp_calibration_time: Option<u32>,
    pub timestamp_calibration_time_ext: Option<u64>,
    pub temperature_c: Option<f32>,
    pub device_identifier: Option<DeviceIdentifier>,
    pub state_event_indicators: Option<u32>,
    pub data_payload_format: Option<u64>,
}

/// Decodes a 32-bit two's-complement fixed point value in Q16.16
/// format (used by temperature): the upper 16 bits are a signed
/// integer part, the lower 16 an unsigned fractional numerator over
/// 65536. Dividing the full signed word by 65536 yields the same
/// result for every value, negative included, since two's complement
/// already encodes it that way.
fn decode_q16_16(pkt: &PacketRecord, idx: usize) -> f32 {
    let raw = get_payload_word(pkt, idx) as i32;
    raw as f32 / 65_536.0 // 2^16
}

fn invalid(msg: impl Into<String>) -> VrtError {
    VrtError::InvalidArgument(msg.into())
}

/// Decodes the CIF0 bitmap and its selected fields from `pkt`'s
/// payload. The first payload word is the CIF0 bitmap itself; fields
/// follow in descending bit order starting at the second payload
/// word.
pub fn parse_cif(pkt: &PacketRecord) -> Result<CifFields, VrtError> {
    if pkt.payload_words() == 0 {
        return Err(invalid("empty payload, no CIF0 word present"));
    }

    let raw_cif0 = get_payload_word(pkt, 0);
    let mut idx = 1usize;
    let mut fields = CifFields {
        raw_cif0,
        ..Default::default()
    };

    let bit_set = |bit: u32| raw_cif0 & (1 << bit) != 0;

    macro_rules! require_words {
        ($n:expr, $name:expr) => {
            if idx + $n > pkt.payload_words() {
                return Err(invalid(format!(
                    "CIF0 payload truncated decoding {}: need {} more word(s), {} remain",
                    $name,
                    $n,
                    pkt.payload_words().saturating_sub(idx)
                )));
            }
        };
    }

    fields.change_indicator = bit_set(BIT_CHANGE_INDICATOR);

    if bit_set(BIT_REFERENCE_POINT_ID) {
        require_words!(1, "reference point id");
        fields.reference_point_id = Some(get_payload_word(pkt, idx));
        idx += 1;
    }
    if bit_set(BIT_BANDWIDTH) {
        require_words!(2, "bandwidth");
        fields.bandwidth_hz = Some(get_payload_double(pkt, idx));
        idx += 2;
    }
    if bit_set(BIT_IF_REFERENCE_FREQUENCY) {
        require_words!(2, "IF reference frequency");
        fields.if_reference_frequency_hz = Some(get_payload_double(pkt, idx));
        idx += 2;
    }
    if bit_set(BIT_RF_REFERENCE_FREQUENCY) {
        require_words!(2, "RF reference frequency");
        fields.rf_reference_frequency_hz = Some(get_payload_double(pkt, idx));
        idx += 2;
    }
    if bit_set(BIT_RF_REFERENCE_FREQUENCY_OFFSET) {
        require_words!(2, "RF reference frequency offset");
        fields.rf_reference_frequency_offset_hz = Some(get_payload_double(pkt, idx));
        idx += 2;
    }
    if bit_set(BIT_IF_BAND_OFFSET) {
        require_words!(2, "IF band offset");
        fields.if_band_offset_hz = Some(get_payload_double(pkt, idx));
        idx += 2;
    }
    if bit_set(BIT_REFERENCE_LEVEL) {
        require_words!(1, "reference level");
        fields.reference_level_dbm = Some(f32::from_bits(get_payload_word(pkt, idx)));
        idx += 1;
    }
    if bit_set(BIT_GAIN) {
        require_words!(1, "gain");
        let raw = get_payload_word(pkt, idx);
        // Deliberately unscaled: stage values are reported as raw
        // signed 16-bit counts, not Q7.9 decibels.
        fields.gain_stage1_db = Some(((raw >> 16) as i16) as f32);
        fields.gain_stage2_db = Some((raw as i16) as f32);
        idx += 1;
    }
    if bit_set(BIT_OVER_RANGE_COUNT) {
        require_words!(1, "over-range count");
        fields.over_range_count = Some(get_payload_word(pkt, idx));
        idx += 1;
    }
    if bit_set(BIT_SAMPLE_RATE) {
        require_words!(2, "sample rate");
        fields.sample_rate_hz = Some(get_payload_double(pkt, idx));
        idx += 2;
    }
    if bit_set(BIT_TIMESTAMP_ADJUSTMENT) {
        require_words!(2, "timestamp adjustment");
        let hi = get_payload_word(pkt, idx) as u64;
        let lo = get_payload_word(pkt, idx + 1) as u64;
        fields.timestamp_adjustment = Some((hi << 32) | lo);
        idx += 2;
    }
    if bit_set(BIT_TIMESTAMP_CALIBRATION_TIME) {
        require_words!(3, "timestamp calibration time");
        fields.timestamp_calibration_time = Some(get_payload_word(pkt, idx));
        let hi = get_payload_word(pkt, idx + 1) as u64;
        let lo = get_payload_word(pkt, idx + 2) as u64;
        fields.timestamp_calibration_time_ext = Some((hi << 32) | lo);
        idx += 3;
    }
    if bit_set(BIT_TEMPERATURE) {
        require_words!(1, "temperature");
        fields.temperature_c = Some(decode_q16_16(pkt, idx));
        idx += 1;
    }
    if bit_set(BIT_DEVICE_IDENTIFIER) {
        require_words!(2, "device identifier");
        let oui = get_payload_word(pkt, idx) & 0xFF_FFFF;
        let device_code = (get_payload_word(pkt, idx + 1) >> 16) as u16;
        fields.device_identifier = Some(DeviceIdentifier { oui, device_code });
        idx += 2;
    }
    if bit_set(BIT_STATE_EVENT_INDICATORS) {
        require_words!(1, "state/event indicators");
        fields.state_event_indicators = Some(get_payload_word(pkt, idx));
        idx += 1;
    }
    if bit_set(BIT_DATA_PAYLOAD_FORMAT) {
        require_words!(2, "data payload format");
        let hi = get_payload_word(pkt, idx) as u64;
        let lo = get_payload_word(pkt, idx + 1) as u64;
        fields.data_payload_format = Some((hi << 32) | lo);
        idx += 2;
    }

    Ok(fields)
}
