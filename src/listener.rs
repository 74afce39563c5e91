// SPDX-FileCopyrightText: 2026 The vrt-bridge Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The translation listener: a single dedicated OS thread that receives
VRT IF Context packets on a UDP socket and dispatches attribute writes
against the host device-abstraction library through the mapping
registry.

The reference implementation unblocks its listener thread's blocking
`recv` by closing the socket from the stopping thread — a pattern that
races the kernel's handling of the in-flight file descriptor and has
no safe equivalent over `std::net`. This listener instead polls a
short read timeout against a shared "keep running" flag, which is the
portable redesign the wire protocol itself does not preclude.
*/

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error, warn};

use crate::cif0::{self, CifFields};
use crate::error::VrtError;
use crate::header::PacketType;
use crate::host::{resolve_attr, HostContext};
use crate::packet;
use crate::registry::{AttrKind, Registry};

const POLL_TIMEOUT: Duration = Duration::from_millis(200);
const MAX_PACKET_WORDS: usize = 16384;

/// Bits the reference implementation knows how to translate into an
/// attribute write, and the field each one carries.
fn value_for_bit(bit: u32, cif: &CifFields) -> Option<f64> {
    match bit {
        29 => cif.bandwidth_hz,
        28 => cif.if_reference_frequency_hz,
        27 => cif.rf_reference_frequency_hz,
        26 => cif.rf_reference_frequency_offset_hz,
        25 => cif.if_band_offset_hz,
        21 => cif.sample_rate_hz,
        _ => None,
    }
}

/// Parses `buf` as a VRT packet and, if it is an IF Context packet
/// carrying a Stream ID, decodes CIF0 and dispatches every matching
/// mapping entry to an attribute write on `host`. Returns the number
/// of attributes successfully written.
///
/// Non-context packets, stream-ID-less packets, and packets with no
/// matching mappings are not errors: this returns `Ok(0)`.
pub fn process_command_packet<H: HostContext>(
    host: &mut H,
    registry: &Registry,
    buf: &[u32],
    words: usize,
) -> Result<usize, VrtError> {
    let pkt = packet::parse(buf, words)?;

    if pkt.header().packet_type() != PacketType::IfContext {
        return Ok(0);
    }

    let stream_id = match pkt.stream_id() {
        Some(id) => id,
        None => return Ok(0),
    };

    let cif = cif0::parse_cif(&pkt)?;
    let mut written = 0usize;

    for mapping in registry.matching(stream_id, cif.raw_cif0) {
        let value = match value_for_bit(mapping.cif0_bit, &cif) {
            Some(v) => v,
            None => {
                debug!(
                    "stream {:#x}: bit {} has no translatable value, skipping mapping for {}.{}",
                    stream_id, mapping.cif0_bit, mapping.device_name, mapping.attr_name
                );
                continue;
            }
        };

        let device = match host.find_device(&mapping.device_name) {
            Ok(d) => d,
            Err(e) => {
                warn!("stream {:#x}: device {} not found: {}", stream_id, mapping.device_name, e);
                continue;
            }
        };

        let attr = match resolve_attr(
            host,
            device,
            mapping.attr_kind,
            &mapping.channel_name,
            mapping.is_output,
            &mapping.attr_name,
        ) {
            Ok(a) => a,
            Err(e) => {
                warn!(
                    "stream {:#x}: attribute {}.{} not found: {}",
                    stream_id, mapping.device_name, mapping.attr_name, e
                );
                continue;
            }
        };

        match host.write_attr_f64(attr, value) {
            Ok(()) => {
                written += 1;
                debug!(
                    "stream {:#x}: wrote {} = {} ({:?})",
                    stream_id, mapping.attr_name, value, mapping.attr_kind
                );
            }
            Err(e) => {
                warn!("stream {:#x}: write to {} failed: {}", stream_id, mapping.attr_name, e);
            }
        }
    }

    Ok(written)
}

/// Converts a received byte buffer into 32-bit words, network byte
/// order preserved (the words are not byte-swapped here; `packet::parse`
/// does that on access).
fn bytes_to_words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Owns the translation listener's background thread. Dropping a
/// `Listener` without calling [`Listener::stop`] leaves the thread
/// running detached; callers should always call `stop` during
/// shutdown.
pub struct Listener {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl Listener {
    /// Binds a UDP socket at `bind_addr` and starts the listener
    /// thread, which polls for datagrams and dispatches them through
    /// `registry` against `host` until [`Listener::stop`] is called.
    pub fn start<H>(bind_addr: SocketAddr, registry: Arc<Registry>, host: Arc<Mutex<H>>) -> Result<Listener, VrtError>
    where
        H: HostContext + Send + 'static,
    {
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_read_timeout(Some(POLL_TIMEOUT))?;
        let local_addr = socket.local_addr()?;
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = std::thread::spawn(move || {
            let mut raw = vec![0u8; MAX_PACKET_WORDS * 4];
            while thread_running.load(Ordering::Acquire) {
                match socket.recv(&mut raw) {
                    Ok(n) => {
                        let words = n / 4;
                        if words == 0 {
                            continue;
                        }
                        let buf = bytes_to_words(&raw[..words * 4]);
                        let mut guard = match host.lock() {
                            Ok(g) => g,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        if let Err(e) = process_command_packet(&mut *guard, &registry, &buf, words) {
                            warn!("failed to process command packet: {e}");
                        }
                    }
                    Err(e)
                        if e.kind() == std::io::ErrorKind::WouldBlock
                            || e.kind() == std::io::ErrorKind::TimedOut =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("listener socket recv failed: {e}");
                        continue;
                    }
                }
            }
            debug!("translation listener thread exiting");
        });

        Ok(Listener { running, handle: Some(handle), local_addr })
    }

    /// The address the listener is actually bound to (useful when
    /// `bind_addr`'s port was `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signals the listener thread to stop and waits for it to exit.
    /// The thread notices within one [`POLL_TIMEOUT`] interval.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop();
    }
}
