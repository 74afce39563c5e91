// SPDX-FileCopyrightText: 2026 The vrt-bridge Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The mapping registry: an unordered collection of `(stream_id,
cif0_bit) -> (device, channel, attribute)` entries that the
translation listener consults when a context packet arrives.

There is no per-entry delete and no internal lock — the registry is
populated before the listener starts and torn down after it stops;
while the listener is running it holds exclusive read access to the
registry, matching the single-thread ownership window the listener
itself maintains.
*/

use log::{debug, warn};

use crate::error::VrtError;

/// What kind of host attribute a mapping targets.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum AttrKind {
    /// An attribute on a device channel.
    Channel,
    /// An attribute on a device itself.
    Device,
    /// A device debug attribute.
    Debug,
}

impl AttrKind {
    fn parse(s: &str) -> Option<AttrKind> {
        match s.trim() {
            "channel" | "CHANNEL" => Some(AttrKind::Channel),
            "device" | "DEVICE" => Some(AttrKind::Device),
            "debug" | "DEBUG" => Some(AttrKind::Debug),
            _ => None,
        }
    }
}

/// A single mapping entry: a `(stream_id, cif0_bit)` key plus the
/// host attribute it should drive.
#[derive(Clone, Debug)]
pub struct MappingEntry {
    pub stream_id: u32,
    pub cif0_bit: u32,
    pub device_name: String,
    pub attr_kind: AttrKind,
    pub channel_name: String,
    pub is_output: bool,
    pub attr_name: String,
}

/// An unordered collection of mapping entries. Iteration order is
/// newest-first, matching the reference implementation's
/// prepend-on-add singly linked list.
#[derive(Default)]
pub struct Registry {
    entries: Vec<MappingEntry>,
}

impl Registry {
    /// Builds an empty registry.
    pub fn init() -> Registry {
        Registry::default()
    }

    /// Adds a single mapping entry. Names longer than 63 bytes are
    /// truncated, matching the reference implementation's
    /// fixed-size (64-byte, NUL-terminated) name buffers.
    pub fn add_mapping(
        &mut self,
        stream_id: u32,
        cif0_bit: u32,
        device_name: &str,
        attr_kind: AttrKind,
        channel_name: &str,
        is_output: bool,
        attr_name: &str,
    ) {
        self.entries.push(MappingEntry {
            stream_id,
            cif0_bit,
            device_name: truncate_name(device_name),
            attr_kind,
            channel_name: truncate_name(channel_name),
            is_output,
            attr_name: truncate_name(attr_name),
        });
    }

    /// Parses and loads mapping lines in the form:
    ///
    /// ```text
    /// stream_id,cif0_bit,device,attr_kind,channel,is_output,attr_name
    /// ```
    ///
    /// `stream_id` is always hex, with or without a `0x` prefix.
    /// `attr_kind` defaults to `channel` if unrecognized; `is_output`
    /// is `true` only for the literal values `true` or `1`, and
    /// `false` for anything else. Blank lines and lines starting with
    /// `#` are skipped. Lines with the wrong field count, a bad
    /// `stream_id`, or a bad `cif0_bit` are logged and skipped rather
    /// than aborting the whole load. Returns the number of mappings
    /// successfully added.
    pub fn load_mappings(&mut self, text: &str) -> Result<usize, VrtError> {
        let mut added = 0usize;
        for (lineno, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != 7 {
                warn!(
                    "mapping file line {}: expected 7 fields, found {}, skipping",
                    lineno + 1,
                    fields.len()
                );
                continue;
            }

            let stream_id = match parse_stream_id(fields[0]) {
                Some(v) => v,
                None => {
                    warn!("mapping file line {}: bad stream id {:?}, skipping", lineno + 1, fields[0]);
                    continue;
                }
            };
            let cif0_bit = match fields[1].parse::<u32>() {
                Ok(v) => v,
                Err(_) => {
                    warn!("mapping file line {}: bad cif0 bit {:?}, skipping", lineno + 1, fields[1]);
                    continue;
                }
            };
            let attr_kind = AttrKind::parse(fields[3]).unwrap_or_else(|| {
                warn!(
                    "mapping file line {}: unknown attribute kind {:?}, defaulting to channel",
                    lineno + 1,
                    fields[3]
                );
                AttrKind::Channel
            });
            let is_output = matches!(fields[5], "true" | "1");

            self.add_mapping(stream_id, cif0_bit, fields[2], attr_kind, fields[4], is_output, fields[6]);
            added += 1;
        }
        debug!("loaded {added} mapping entries");
        Ok(added)
    }

    /// Opens `path` and feeds its contents to [`Registry::load_mappings`].
    /// A file-open failure is reported as [`VrtError::NetworkFailure`]
    /// rather than skipped, since there are no lines to salvage.
    pub fn load_mappings_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<usize, VrtError> {
        let text = std::fs::read_to_string(path)?;
        self.load_mappings(&text)
    }

    /// Drops every mapping entry. Called once the listener that owned
    /// this registry has stopped.
    pub fn cleanup(&mut self) {
        self.entries.clear();
    }

    /// Returns the mappings whose stream ID matches `stream_id` and
    /// whose `cif0_bit` is set in `cif0`, newest-first.
    pub fn matching<'a>(&'a self, stream_id: u32, cif0: u32) -> impl Iterator<Item = &'a MappingEntry> {
        self.entries
            .iter()
            .rev()
            .filter(move |e| e.stream_id == stream_id && (cif0 & (1 << e.cif0_bit)) != 0)
    }

    /// Iterates all entries, newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter().rev()
    }

    /// The number of mapping entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the registry holds no mappings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn truncate_name(s: &str) -> String {
    const MAX_LEN: usize = 63;
    if s.len() <= MAX_LEN {
        s.to_string()
    } else {
        let mut truncated = String::with_capacity(MAX_LEN);
        for ch in s.chars() {
            if truncated.len() + ch.len_utf8() > MAX_LEN {
                break;
            }
            truncated.push(ch);
        }
        truncated
    }
}

fn parse_stream_id(s: &str) -> Option<u32> {
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_match_round_trip() {
        let mut reg = Registry::init();
        reg.add_mapping(0x1234, 21, "adrv9002", AttrKind::Channel, "voltage0", true, "sampling_frequency");
        assert_eq!(reg.len(), 1);

        let hits: Vec<_> = reg.matching(0x1234, 1 << 21).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].attr_name, "sampling_frequency");

        assert_eq!(reg.matching(0x1234, 1 << 20).count(), 0);
        assert_eq!(reg.matching(0x5678, 1 << 21).count(), 0);
    }

    #[test]
    fn load_mappings_skips_comments_and_malformed_lines() {
        let text = "\
# a comment
0x1234,21,adrv9002,channel,voltage0,true,sampling_frequency

0x1234,bad,adrv9002,channel,voltage0,true,sampling_frequency
0x1234,25,adrv9002,channel,voltage0,true
0x1234,26,adrv9002,channel,voltage0,true,if_band_offset
";
        let mut reg = Registry::init();
        let added = reg.load_mappings(text).expect("load");
        assert_eq!(added, 2);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn stream_id_is_always_hex() {
        let mut reg = Registry::init();
        let added = reg.load_mappings("1234,21,adrv9002,channel,voltage0,true,sampling_frequency\n").expect("load");
        assert_eq!(added, 1);
        assert_eq!(reg.iter().next().unwrap().stream_id, 0x1234);
    }

    #[test]
    fn unknown_attr_kind_defaults_to_channel() {
        let mut reg = Registry::init();
        let added = reg.load_mappings("0x1,1,dev,bogus,ch,true,attr\n").expect("load");
        assert_eq!(added, 1);
        assert_eq!(reg.iter().next().unwrap().attr_kind, AttrKind::Channel);
    }

    #[test]
    fn is_output_defaults_false_for_unrecognized_value() {
        let mut reg = Registry::init();
        let added = reg.load_mappings("0x1,1,dev,channel,ch,nonsense,attr\n").expect("load");
        assert_eq!(added, 1);
        assert!(!reg.iter().next().unwrap().is_output);
    }

    #[test]
    fn load_mappings_file_reads_and_parses() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        std::io::Write::write_all(&mut file, b"0x1234,21,adrv9002,channel,voltage0,true,sampling_frequency\n")
            .unwrap();

        let mut reg = Registry::init();
        let added = reg.load_mappings_file(file.path()).expect("load");
        assert_eq!(added, 1);
    }

    #[test]
    fn load_mappings_file_reports_open_failure() {
        let mut reg = Registry::init();
        let err = reg.load_mappings_file("/nonexistent/path/to/mappings.csv").unwrap_err();
        assert!(matches!(err, VrtError::NetworkFailure(_)));
    }

    #[test]
    fn iteration_is_newest_first() {
        let mut reg = Registry::init();
        reg.add_mapping(1, 1, "a", AttrKind::Device, "", true, "first");
        reg.add_mapping(1, 1, "a", AttrKind::Device, "", true, "second");
        let names: Vec<_> = reg.iter().map(|e| e.attr_name.clone()).collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn long_names_are_truncated() {
        let mut reg = Registry::init();
        let long = "x".repeat(200);
        reg.add_mapping(1, 1, &long, AttrKind::Device, &long, true, &long);
        let entry = reg.iter().next().unwrap();
        assert!(entry.device_name.len() <= 63);
    }

    #[test]
    fn cleanup_empties_the_registry() {
        let mut reg = Registry::init();
        reg.add_mapping(1, 1, "a", AttrKind::Device, "", true, "x");
        reg.cleanup();
        assert!(reg.is_empty());
    }
}
