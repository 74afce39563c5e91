// SPDX-FileCopyrightText: 2026 The vrt-bridge Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The seam between this crate and the host device-abstraction library.
Device/channel/attribute lookup, enumeration, and attribute writes are
all owned by the host; this crate only calls through [`HostContext`].

This mirrors the `Cif0Manipulators`/`Cif1Manipulators`-style traits
the reference crate uses to separate "what a context field means" from
"how it is actually read or written" — here the seam sits one layer
further out, at the boundary with the device library itself.
*/

use crate::error::VrtError;
use crate::registry::AttrKind;

/// Operations this crate needs from a host device-abstraction
/// library. A production host implements this against the real
/// library; tests use [`MockHost`].
pub trait HostContext {
    /// Looks up a device by name.
    fn find_device(&self, name: &str) -> Result<DeviceHandle, VrtError>;

    /// Looks up a channel on `device` by name, preferring `is_output`
    /// but falling back to the opposite direction if not found (the
    /// reference implementation does the same, since not every device
    /// exposes both directions for a given channel name).
    fn find_channel(&self, device: DeviceHandle, name: &str, is_output: bool) -> Result<ChannelHandle, VrtError>;

    /// Looks up a channel attribute by name.
    fn find_channel_attr(&self, channel: ChannelHandle, name: &str) -> Result<AttrHandle, VrtError>;

    /// Looks up a device attribute by name.
    fn find_device_attr(&self, device: DeviceHandle, name: &str) -> Result<AttrHandle, VrtError>;

    /// Looks up a device debug attribute by name.
    fn find_debug_attr(&self, device: DeviceHandle, name: &str) -> Result<AttrHandle, VrtError>;

    /// Writes a floating point value to an attribute.
    fn write_attr_f64(&self, attr: AttrHandle, value: f64) -> Result<(), VrtError>;

    /// Registers a newly discovered device, returning its handle.
    fn add_device(&mut self, name: &str) -> Result<DeviceHandle, VrtError>;

    /// Registers a newly discovered channel on `device`.
    fn add_channel(
        &mut self,
        device: DeviceHandle,
        name: &str,
        is_output: bool,
        length_bits: u32,
        is_signed: bool,
    ) -> Result<ChannelHandle, VrtError>;
}

/// Opaque handle to a host device.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct DeviceHandle(pub u64);

/// Opaque handle to a host channel.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ChannelHandle(pub u64);

/// Opaque handle to a host attribute.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct AttrHandle(pub u64);

/// Looks up the attribute a mapping entry targets, trying the
/// requested direction first and falling back to the opposite
/// direction for channel attributes, matching the reference
/// implementation's lookup order.
pub fn resolve_attr(
    host: &impl HostContext,
    device: DeviceHandle,
    attr_kind: AttrKind,
    channel_name: &str,
    is_output: bool,
    attr_name: &str,
) -> Result<AttrHandle, VrtError> {
    match attr_kind {
        AttrKind::Device => host.find_device_attr(device, attr_name),
        AttrKind::Debug => host.find_debug_attr(device, attr_name),
        AttrKind::Channel => {
            let channel = host
                .find_channel(device, channel_name, is_output)
                .or_else(|_| host.find_channel(device, channel_name, !is_output))?;
            host.find_channel_attr(channel, attr_name)
        }
    }
}
