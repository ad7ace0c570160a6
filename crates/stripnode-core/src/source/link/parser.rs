use std::net::{IpAddr, SocketAddr};

use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use pcap_parser::Linktype;

use super::error::UdpError;
use super::reader::UdpReader;

/// UDP datagram carried by a captured frame.
pub struct UdpPacket<'a> {
    pub source: SocketAddr,
    pub destination_port: u16,
    pub payload: &'a [u8],
}

/// Unwrap a captured link-layer frame down to its UDP datagram.
///
/// Returns `Ok(None)` for non-UDP traffic and unsupported link types.
pub fn parse_udp_packet(
    linktype: Linktype,
    data: &[u8],
) -> Result<Option<UdpPacket<'_>>, UdpError> {
    let sliced = match linktype {
        Linktype::ETHERNET => {
            SlicedPacket::from_ethernet(data).map_err(|e| UdpError::Slice(e.to_string()))?
        }
        Linktype::RAW => SlicedPacket::from_ip(data).map_err(|e| UdpError::Slice(e.to_string()))?,
        _ => return Ok(None),
    };

    let net = sliced.net.ok_or(UdpError::MissingNetworkLayer)?;
    let Some(TransportSlice::Udp(udp)) = sliced.transport else {
        return Ok(None);
    };

    let source_ip = match net {
        NetSlice::Ipv4(ref ipv4) => IpAddr::V4(ipv4.header().source_addr()),
        NetSlice::Ipv6(ref ipv6) => IpAddr::V6(ipv6.header().source_addr()),
    };

    let ip_payload = net.ip_payload_ref().ok_or(UdpError::MissingIpPayload)?;
    let payload = UdpReader::new(ip_payload.payload).udp_payload()?;

    Ok(Some(UdpPacket {
        source: SocketAddr::new(source_ip, udp.source_port()),
        destination_port: udp.destination_port(),
        payload,
    }))
}
