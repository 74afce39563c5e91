// SPDX-FileCopyrightText: 2026 The vrt-bridge Authors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
The VRT backend: passive discovery of radios advertising themselves
over VRT IF Context broadcasts, synthesizing a host device per unique
Stream ID seen.

This is not the translation listener (see [`crate::listener`]) — it
runs for a bounded window at backend-creation time and populates the
host's device list, the same way the reference implementation's
`vrt_create_context` scans for advertising radios before handing
control back to the caller.
*/

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::error::VrtError;
use crate::header::PacketType;
use crate::host::HostContext;
use crate::packet;

/// Default port the backend listens on when the caller does not
/// specify one, matching the reference implementation's `"1234"`.
pub const DEFAULT_PORT: u16 = 1234;

/// How long the discovery loop listens for advertisements before
/// giving up and returning whatever it found.
const DISCOVERY_WINDOW: Duration = Duration::from_secs(2);

const MAX_PACKET_WORDS: usize = 16384;

/// Backend crate version, matching the reference implementation's
/// `vrt_get_version`.
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub git_tag: &'static str,
}

/// Returns this backend's version.
pub fn get_version() -> Version {
    Version { major: 0, minor: 1, git_tag: "v0.1" }
}

/// Parses a `host[:port]` backend URI, defaulting to
/// [`DEFAULT_PORT`] when no port is given.
pub fn parse_backend_uri(uri: &str) -> Result<SocketAddr, VrtError> {
    let candidate = if uri.contains(':') { uri.to_string() } else { format!("{uri}:{DEFAULT_PORT}") };
    use std::net::ToSocketAddrs;
    candidate
        .to_socket_addrs()
        .map_err(|e| VrtError::InvalidArgument(format!("bad backend uri {uri:?}: {e}")))?
        .next()
        .ok_or_else(|| VrtError::InvalidArgument(format!("bad backend uri {uri:?}: no addresses resolved")))
}

/// Runs the passive discovery loop against `local_addr` for up to
/// [`DISCOVERY_WINDOW`], registering a device named
/// `vrt_device_%08x` (keyed by Stream ID) with two 16-bit signed
/// channels, `voltage0_i` and `voltage0_q`, for every distinct
/// advertising Stream ID observed.
///
/// Returns the number of devices newly registered.
pub fn discover(local_addr: SocketAddr, host: &mut impl HostContext) -> Result<usize, VrtError> {
    let socket = UdpSocket::bind(local_addr)?;
    socket.set_read_timeout(Some(Duration::from_millis(200)))?;

    let deadline = Instant::now() + DISCOVERY_WINDOW;
    let mut raw = vec![0u8; MAX_PACKET_WORDS * 4];
    let mut discovered = 0usize;

    while Instant::now() < deadline {
        let n = match socket.recv(&mut raw) {
            Ok(n) => n,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => return Err(VrtError::NetworkFailure(e)),
        };
        let words = n / 4;
        if words == 0 {
            continue;
        }
        let buf: Vec<u32> = raw[..words * 4]
            .chunks_exact(4)
            .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        let pkt = match packet::parse(&buf, words) {
            Ok(p) => p,
            Err(_) => continue,
        };

        if pkt.header().packet_type() != PacketType::IfContext {
            continue;
        }
        let Some(stream_id) = pkt.stream_id() else { continue };

        let name = format!("vrt_device_{stream_id:08x}");
        if host.find_device(&name).is_ok() {
            continue;
        }

        let device = host.add_device(&name)?;
        host.add_channel(device, "voltage0_i", false, 16, true)?;
        host.add_channel(device, "voltage0_q", false, 16, true)?;
        info!("discovered {name} on stream {stream_id:#010x}");
        discovered += 1;
    }

    debug!("discovery window elapsed, {discovered} device(s) registered");
    Ok(discovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::PacketHeader;
    use crate::host::mock::MockHost;
    use crate::packet::PacketRecord;
    use std::net::{Ipv4Addr, UdpSocket};

    #[test]
    fn get_version_reports_zero_one() {
        let v = get_version();
        assert_eq!(v.major, 0);
        assert_eq!(v.minor, 1);
        assert_eq!(v.git_tag, "v0.1");
    }

    #[test]
    fn parse_backend_uri_defaults_port() {
        let addr = parse_backend_uri("127.0.0.1").expect("parse");
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn parse_backend_uri_honors_explicit_port() {
        let addr = parse_backend_uri("127.0.0.1:9999").expect("parse");
        assert_eq!(addr.port(), 9999);
    }

    #[test]
    fn discover_registers_device_from_context_broadcast() {
        let local = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
        let listen_socket = UdpSocket::bind(local).expect("bind to learn port");
        let listen_addr = listen_socket.local_addr().unwrap();
        drop(listen_socket);

        let mut h = PacketHeader::default();
        h.set_packet_type(PacketType::IfContext);
        let mut pkt = PacketRecord::new(h);
        pkt.set_stream_id(Some(0xABCD_1234));
        let payload = [0u32];
        pkt.set_payload(&payload);
        let mut buf = vec![0u32; 4];
        let words = packet::generate(&pkt, &mut buf).unwrap();
        let bytes: Vec<u8> = buf[..words].iter().flat_map(|w| w.to_ne_bytes()).collect();

        let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind sender");
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            sender.send_to(&bytes, listen_addr).expect("send");
        });

        let mut host = MockHost::new();
        let count = discover(listen_addr, &mut host).expect("discover");
        handle.join().unwrap();

        assert_eq!(count, 1);
        assert!(host.find_device("vrt_device_abcd1234").is_ok());
    }
}
