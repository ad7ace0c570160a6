use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use crate::config::{NetworkConfig, NetworkMode};
use crate::mapper::UniverseLayout;
use crate::protocols::Protocol;

use super::{DatagramSource, Received, SourceError};

/// sACN multicast group for a universe: 239.255.{hi}.{lo}.
pub fn sacn_multicast_group(universe: u16) -> Ipv4Addr {
    let [hi, lo] = universe.to_be_bytes();
    Ipv4Addr::new(239, 255, hi, lo)
}

/// Live UDP listener with a read timeout.
pub struct UdpSource {
    socket: UdpSocket,
}

impl UdpSource {
    pub fn bind(network: &NetworkConfig, layout: &UniverseLayout) -> Result<Self, SourceError> {
        let addr = network.bind_addr();
        let socket = UdpSocket::bind(addr).map_err(|source| SourceError::Bind { addr, source })?;
        socket.set_read_timeout(Some(network.poll_timeout()))?;

        if network.protocol == Protocol::Sacn && network.multicast {
            let interface = match network.mode {
                NetworkMode::Dhcp => Ipv4Addr::UNSPECIFIED,
                NetworkMode::Static(ip) => ip,
            };
            for universe in layout.universes() {
                let group = sacn_multicast_group(universe);
                socket
                    .join_multicast_v4(&group, &interface)
                    .map_err(|source| SourceError::Multicast { group, source })?;
                tracing::debug!(%group, universe, "joined sACN multicast group");
            }
        }

        tracing::info!(
            addr = %socket.local_addr()?,
            protocol = network.protocol.as_str(),
            "listening"
        );
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SourceError> {
        Ok(self.socket.local_addr()?)
    }
}

impl DatagramSource for UdpSource {
    fn recv(&mut self, buf: &mut [u8]) -> Result<Received, SourceError> {
        match self.socket.recv_from(buf) {
            Ok((len, peer)) => {
                tracing::trace!(%peer, len, "datagram");
                Ok(Received::Datagram { len, at: None })
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(Received::Idle)
            }
            // ICMP port-unreachable echoes surface here on some platforms.
            Err(err) if err.kind() == ErrorKind::ConnectionReset => {
                tracing::warn!(error = %err, "ignoring connection reset on UDP socket");
                Ok(Received::Idle)
            }
            Err(err) => Err(err.into()),
        }
    }
}
