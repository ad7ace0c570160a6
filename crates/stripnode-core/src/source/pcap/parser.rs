use std::fs::File;
use std::path::Path;
use std::time::Duration;

use pcap_parser::{
    Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapNGReader, traits::PcapReaderIterator,
};
use serde::Serialize;

use crate::source::link::parse_udp_packet;
use crate::source::{DatagramSource, Received, SourceError};

use super::error::PcapSourceError;
use super::layout;
use super::reader::{
    is_pcapng_magic, legacy_ts_to_seconds, linktype_for_interface, pcapng_ts_to_seconds,
    read_magic_and_rewind, ts_to_rfc3339,
};

/// What a replay covered, for the run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureWindow {
    pub first_ts: Option<String>,
    pub last_ts: Option<String>,
    pub duration_s: Option<f64>,
    pub packets_total: u64,
    pub datagrams: u64,
}

/// Replays the UDP datagrams of a capture file addressed to one port.
pub struct PcapReplaySource {
    inner: PcapReader,
    port: u16,
    origin: Option<f64>,
    first_ts: Option<f64>,
    last_ts: Option<f64>,
    packets_total: u64,
    datagrams: u64,
}

enum PcapReader {
    Legacy {
        reader: LegacyPcapReader<File>,
        linktype: Option<Linktype>,
    },
    Ng {
        reader: PcapNGReader<File>,
        linktypes: Vec<Linktype>,
    },
}

/// A captured packet; `len` is set when it was a datagram for our port and
/// has been copied into the caller's buffer.
struct CapturedPacket {
    ts: f64,
    len: Option<usize>,
}

impl PcapReplaySource {
    pub fn open(path: &Path, port: u16) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(SourceError::from)?;
        let inner = create_reader(file).map_err(SourceError::from)?;
        Ok(Self {
            inner,
            port,
            origin: None,
            first_ts: None,
            last_ts: None,
            packets_total: 0,
            datagrams: 0,
        })
    }

    pub fn capture_window(&self) -> CaptureWindow {
        let duration_s = match (self.first_ts, self.last_ts) {
            (Some(first), Some(last)) => Some((last - first).max(0.0)),
            _ => None,
        };
        CaptureWindow {
            first_ts: self.first_ts.and_then(ts_to_rfc3339),
            last_ts: self.last_ts.and_then(ts_to_rfc3339),
            duration_s,
            packets_total: self.packets_total,
            datagrams: self.datagrams,
        }
    }

    fn observe_ts(&mut self, ts: f64) {
        self.packets_total += 1;
        if self.first_ts.is_none_or(|first| ts < first) {
            self.first_ts = Some(ts);
        }
        if self.last_ts.is_none_or(|last| ts > last) {
            self.last_ts = Some(ts);
        }
    }
}

impl DatagramSource for PcapReplaySource {
    fn recv(&mut self, buf: &mut [u8]) -> Result<Received, SourceError> {
        loop {
            let Some(packet) = next_packet(&mut self.inner, self.port, buf)? else {
                return Ok(Received::Closed);
            };
            self.observe_ts(packet.ts);
            let Some(len) = packet.len else {
                continue;
            };
            self.datagrams += 1;
            let origin = *self.origin.get_or_insert(packet.ts);
            // Capture stamps are microsecond resolution; out-of-order ones
            // collapse onto the origin.
            let micros = ((packet.ts - origin).max(0.0) * 1e6).round() as u64;
            return Ok(Received::Datagram {
                len,
                at: Some(Duration::from_micros(micros)),
            });
        }
    }
}

fn create_reader(file: File) -> Result<PcapReader, PcapSourceError> {
    let mut file = file;
    let magic = read_magic_and_rewind(&mut file)?;

    if is_pcapng_magic(&magic) {
        let reader = PcapNGReader::new(layout::PCAP_READER_BUFFER_SIZE, file).map_err(|e| {
            PcapSourceError::Pcap {
                context: "pcapng reader init",
                message: e.to_string(),
            }
        })?;
        Ok(PcapReader::Ng {
            reader,
            linktypes: Vec::new(),
        })
    } else {
        let reader = LegacyPcapReader::new(layout::PCAP_READER_BUFFER_SIZE, file).map_err(|e| {
            PcapSourceError::Pcap {
                context: "pcap reader init",
                message: e.to_string(),
            }
        })?;
        Ok(PcapReader::Legacy {
            reader,
            linktype: None,
        })
    }
}

/// Copy the UDP payload of `data` into `buf` when it targets `port`.
fn copy_datagram(linktype: Linktype, data: &[u8], port: u16, buf: &mut [u8]) -> Option<usize> {
    let udp = match parse_udp_packet(linktype, data) {
        Ok(Some(udp)) => udp,
        Ok(None) => return None,
        Err(err) => {
            tracing::trace!(error = %err, "skipping undecodable frame");
            return None;
        }
    };
    if udp.destination_port != port {
        return None;
    }
    let len = udp.payload.len().min(buf.len());
    buf[..len].copy_from_slice(&udp.payload[..len]);
    tracing::trace!(source = %udp.source, len, "captured datagram");
    Some(len)
}

fn next_packet(
    reader: &mut PcapReader,
    port: u16,
    buf: &mut [u8],
) -> Result<Option<CapturedPacket>, PcapSourceError> {
    loop {
        match reader {
            PcapReader::Legacy { reader, linktype } => match reader.next() {
                Ok((offset, block)) => {
                    let packet = match block {
                        PcapBlockOwned::LegacyHeader(header) => {
                            *linktype = Some(header.network);
                            None
                        }
                        PcapBlockOwned::Legacy(packet) => {
                            let lt = linktype.unwrap_or(Linktype::ETHERNET);
                            Some(CapturedPacket {
                                ts: legacy_ts_to_seconds(packet.ts_sec, packet.ts_usec),
                                len: copy_datagram(lt, packet.data, port, buf),
                            })
                        }
                        _ => None,
                    };
                    reader.consume(offset);
                    if packet.is_some() {
                        return Ok(packet);
                    }
                }
                Err(pcap_parser::PcapError::Eof) => return Ok(None),
                Err(pcap_parser::PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| PcapSourceError::Pcap {
                        context: "pcap reader refill",
                        message: e.to_string(),
                    })?;
                }
                Err(e) => {
                    return Err(PcapSourceError::Pcap {
                        context: "pcap reader next",
                        message: e.to_string(),
                    });
                }
            },
            PcapReader::Ng { reader, linktypes } => match reader.next() {
                Ok((offset, block)) => {
                    let packet = match block {
                        PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                            linktypes.push(intf.linktype);
                            None
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => {
                            let lt = linktype_for_interface(linktypes, packet.if_id);
                            Some(CapturedPacket {
                                ts: pcapng_ts_to_seconds(packet.ts_high, packet.ts_low),
                                len: copy_datagram(lt, packet.data, port, buf),
                            })
                        }
                        _ => None,
                    };
                    reader.consume(offset);
                    if packet.is_some() {
                        return Ok(packet);
                    }
                }
                Err(pcap_parser::PcapError::Eof) => return Ok(None),
                Err(pcap_parser::PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| PcapSourceError::Pcap {
                        context: "pcapng reader refill",
                        message: e.to_string(),
                    })?;
                }
                Err(e) => {
                    return Err(PcapSourceError::Pcap {
                        context: "pcapng reader next",
                        message: e.to_string(),
                    });
                }
            },
        }
    }
}
