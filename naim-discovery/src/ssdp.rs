//! SSDP (Simple Service Discovery Protocol) messages and search client
//!
//! Covers the two message shapes this crate consumes: unicast `HTTP/1.1 200 OK`
//! replies to an `M-SEARCH`, and multicast `NOTIFY` presence announcements.

use std::net::UdpSocket;
use std::time::Duration;
use crate::error::{DiscoveryError, Result};

pub(crate) const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";
pub(crate) const SSDP_PORT: u16 = 1900;

/// SSDP search response containing device information
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SsdpResponse {
    pub location: String,
    pub urn: String,
    pub usn: String,
    pub server: Option<String>,
}

/// Kind of presence change announced by a `NOTIFY` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceChange {
    /// `ssdp:alive`: the device is (still) on the network
    Alive,
    /// `ssdp:byebye`: the device is going away
    ByeBye,
    /// `ssdp:update`: the device is about to change its boot id
    Update,
}

impl PresenceChange {
    fn from_nts(nts: &str) -> Option<Self> {
        match nts.trim().to_ascii_lowercase().as_str() {
            "ssdp:alive" => Some(Self::Alive),
            "ssdp:byebye" => Some(Self::ByeBye),
            "ssdp:update" => Some(Self::Update),
            _ => None,
        }
    }
}

/// A parsed SSDP `NOTIFY` announcement.
#[derive(Debug, Clone, PartialEq)]
pub struct SsdpNotification {
    pub change: PresenceChange,
    pub usn: String,
    pub nt: String,
    /// Absent on `ssdp:byebye`
    pub location: Option<String>,
    /// `BOOTID.UPNP.ORG`
    pub boot_id: Option<u32>,
    /// `NEXTBOOTID.UPNP.ORG`, only meaningful on `ssdp:update`
    pub next_boot_id: Option<u32>,
    pub server: Option<String>,
}

impl SsdpNotification {
    /// Parse a raw `NOTIFY * HTTP/1.1` datagram.
    ///
    /// Returns `None` for anything that is not a notification with `NTS`,
    /// `NT` and `USN` headers.
    pub fn parse(message: &str) -> Option<Self> {
        let mut lines = message.lines();
        let request_line = lines.next()?.trim();
        if !request_line.to_ascii_uppercase().starts_with("NOTIFY ") {
            return None;
        }

        let mut change = None;
        let mut usn = None;
        let mut nt = None;
        let mut location = None;
        let mut boot_id = None;
        let mut next_boot_id = None;
        let mut server = None;

        for line in lines {
            let line = line.trim();

            if let Some(value) = extract_header_value(line, "NTS:") {
                change = PresenceChange::from_nts(&value);
            } else if let Some(value) = extract_header_value(line, "NT:") {
                nt = Some(value);
            } else if let Some(value) = extract_header_value(line, "USN:") {
                usn = Some(value);
            } else if let Some(value) = extract_header_value(line, "LOCATION:") {
                location = Some(value);
            } else if let Some(value) = extract_header_value(line, "BOOTID.UPNP.ORG:") {
                boot_id = value.parse().ok();
            } else if let Some(value) = extract_header_value(line, "NEXTBOOTID.UPNP.ORG:") {
                next_boot_id = value.parse().ok();
            } else if let Some(value) = extract_header_value(line, "SERVER:") {
                server = Some(value);
            }
        }

        Some(Self {
            change: change?,
            usn: usn?,
            nt: nt?,
            location,
            boot_id,
            next_boot_id,
            server,
        })
    }

    /// The UDN part of the USN (everything before `::`).
    pub fn udn(&self) -> &str {
        udn_from_usn(&self.usn)
    }
}

/// Strip the `::<type>` suffix from a USN.
pub(crate) fn udn_from_usn(usn: &str) -> &str {
    usn.split("::").next().unwrap_or(usn)
}

/// Blocking SSDP client used for one-shot searches
pub(crate) struct SsdpClient {
    socket: UdpSocket,
}

impl SsdpClient {
    /// Create a new SSDP client with the specified timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to bind UDP socket: {}", e)))?;

        socket.set_read_timeout(Some(timeout))
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to set read timeout: {}", e)))?;

        socket.set_multicast_loop_v4(true)
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to set multicast loop: {}", e)))?;

        Ok(Self { socket })
    }

    /// Send an M-SEARCH request and return an iterator of responses
    pub fn search(&self, search_target: &str) -> Result<SsdpResponseIterator<'_>> {
        let request = format!(
            "M-SEARCH * HTTP/1.1\r\n\
             HOST: {addr}:{port}\r\n\
             MAN: \"ssdp:discover\"\r\n\
             MX: 2\r\n\
             ST: {st}\r\n\
             USER-AGENT: naim-muso-rs/0.3 UPnP/1.1\r\n\
             \r\n",
            addr = SSDP_MULTICAST_ADDR,
            port = SSDP_PORT,
            st = search_target
        );

        self.socket.send_to(request.as_bytes(), (SSDP_MULTICAST_ADDR, SSDP_PORT))
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to send M-SEARCH: {}", e)))?;

        tracing::debug!("M-SEARCH sent for {}", search_target);
        Ok(SsdpResponseIterator::new(&self.socket))
    }
}

/// Iterator for SSDP responses
pub(crate) struct SsdpResponseIterator<'a> {
    socket: &'a UdpSocket,
    buffer: [u8; 2048],
    finished: bool,
}

impl<'a> SsdpResponseIterator<'a> {
    fn new(socket: &'a UdpSocket) -> Self {
        Self {
            socket,
            buffer: [0; 2048],
            finished: false,
        }
    }
}

impl<'a> Iterator for SsdpResponseIterator<'a> {
    type Item = Result<SsdpResponse>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.socket.recv_from(&mut self.buffer) {
                Ok((size, _)) => {
                    let parsed = std::str::from_utf8(&self.buffer[..size])
                        .ok()
                        .and_then(parse_ssdp_response);
                    if let Some(response) = parsed {
                        return Some(Ok(response));
                    }
                    // not a search reply, keep reading
                }
                Err(e) => {
                    if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut {
                        self.finished = true;
                    } else {
                        return Some(Err(e.into()));
                    }
                }
            }
        }
        None
    }
}

/// Parse an SSDP search response from HTTP text
pub(crate) fn parse_ssdp_response(response: &str) -> Option<SsdpResponse> {
    let mut location = None;
    let mut urn = None;
    let mut usn = None;
    let mut server = None;

    for line in response.lines() {
        let line = line.trim();

        if let Some(value) = extract_header_value(line, "LOCATION:") {
            location = Some(value);
        } else if let Some(value) = extract_header_value(line, "ST:") {
            urn = Some(value);
        } else if let Some(value) = extract_header_value(line, "USN:") {
            usn = Some(value);
        } else if let Some(value) = extract_header_value(line, "SERVER:") {
            server = Some(value);
        }
    }

    match (location, urn, usn) {
        (Some(location), Some(urn), Some(usn)) => Some(SsdpResponse {
            location,
            urn,
            usn,
            server,
        }),
        _ => None,
    }
}

/// Extract header value from a line like "HEADER: value"
fn extract_header_value(line: &str, header: &str) -> Option<String> {
    if line.len() > header.len()
        && line.is_char_boundary(header.len())
        && line[..header.len()].eq_ignore_ascii_case(header)
    {
        Some(line[header.len()..].trim().to_string())
    } else {
        None
    }
}
