//! SSDP presence listener.
//!
//! Listens on the SSDP multicast group for `NOTIFY` announcements and routes
//! each one to the receiver registered for the announcing device's UDN.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use parking_lot::RwLock;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::error::{DiscoveryError, Result};
use crate::ssdp::{SsdpNotification, SSDP_MULTICAST_ADDR, SSDP_PORT};

type Registrations = Arc<RwLock<HashMap<String, mpsc::UnboundedSender<SsdpNotification>>>>;

/// Routes SSDP notifications to per-device receivers.
///
/// ```rust,ignore
/// let listener = PresenceListener::bind()?;
/// let mut rx = listener.register("uuid:5f9ec1b3-ed59-79bb-4530-0002c0ffee01");
/// tokio::spawn({
///     let listener = listener.clone();
///     async move { listener.run().await }
/// });
/// while let Some(notification) = rx.recv().await {
///     println!("{:?}", notification.change);
/// }
/// ```
#[derive(Clone)]
pub struct PresenceListener {
    socket: Option<Arc<UdpSocket>>,
    registrations: Registrations,
}

impl PresenceListener {
    /// Bind 0.0.0.0:1900 with address reuse and join the SSDP group.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind() -> Result<Self> {
        let net_err = |what: &str, e: std::io::Error| {
            DiscoveryError::NetworkError(format!("{}: {}", what, e))
        };

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| net_err("Failed to create UDP socket", e))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| net_err("Failed to set SO_REUSEADDR", e))?;

        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, SSDP_PORT));
        socket
            .bind(&bind_addr.into())
            .map_err(|e| net_err("Failed to bind SSDP port", e))?;

        let group: Ipv4Addr = SSDP_MULTICAST_ADDR
            .parse()
            .map_err(|e| DiscoveryError::ParseError(format!("Bad multicast address: {}", e)))?;
        socket
            .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
            .map_err(|e| net_err("Failed to join SSDP multicast group", e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| net_err("Failed to set non-blocking", e))?;

        let socket = UdpSocket::from_std(socket.into())
            .map_err(|e| net_err("Failed to register socket with runtime", e))?;

        tracing::info!("SSDP presence listener bound on {}", bind_addr);

        Ok(Self {
            socket: Some(Arc::new(socket)),
            registrations: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// A listener without a socket; only [`dispatch`](Self::dispatch) delivers.
    pub fn detached() -> Self {
        Self {
            socket: None,
            registrations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register interest in notifications for `udn`.
    ///
    /// A second registration for the same UDN replaces the first.
    pub fn register(&self, udn: &str) -> mpsc::UnboundedReceiver<SsdpNotification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.registrations.write().insert(udn.to_string(), tx);
        tracing::debug!("Registered presence callback for {}", udn);
        rx
    }

    /// Stop routing notifications for `udn`.
    pub fn unregister(&self, udn: &str) -> bool {
        self.registrations.write().remove(udn).is_some()
    }

    /// Route one raw datagram. Returns `true` if a registered receiver got it.
    pub fn dispatch(&self, datagram: &str) -> bool {
        let Some(notification) = SsdpNotification::parse(datagram) else {
            return false;
        };

        let mut registrations = self.registrations.write();

        let udn = notification.udn().to_string();
        let Some(tx) = registrations.get(&udn) else {
            tracing::trace!("Ignoring notification for unregistered {}", udn);
            return false;
        };

        if tx.send(notification).is_err() {
            // receiver dropped
            registrations.remove(&udn);
            return false;
        }
        true
    }

    /// Receive and dispatch datagrams until the socket fails.
    pub async fn run(&self) -> Result<()> {
        let Some(socket) = self.socket.as_ref() else {
            return Ok(());
        };

        let mut buffer = [0u8; 4096];
        loop {
            let (size, from) = socket.recv_from(&mut buffer).await?;

            match std::str::from_utf8(&buffer[..size]) {
                Ok(text) => {
                    if self.dispatch(text) {
                        tracing::trace!("Dispatched SSDP notification from {}", from);
                    }
                }
                Err(_) => tracing::trace!("Dropping non UTF-8 datagram from {}", from),
            }
        }
    }
}
