#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use etherparse::PacketBuilder;
use stripnode_core::protocols::{artnet, sacn};

pub fn artdmx(universe: u16, sequence: u8, data: &[u8]) -> Vec<u8> {
    artdmx_declared(universe, sequence, data.len() as u16, data)
}

/// ArtDMX with an arbitrary declared length, for lying packets.
pub fn artdmx_declared(universe: u16, sequence: u8, declared: u16, data: &[u8]) -> Vec<u8> {
    let mut packet = vec![0u8; artnet::layout::DMX_DATA_OFFSET];
    packet[..8].copy_from_slice(artnet::layout::ARTNET_ID);
    packet[artnet::layout::OP_CODE_RANGE]
        .copy_from_slice(&artnet::layout::ARTDMX_OPCODE.to_le_bytes());
    packet[11] = 14;
    packet[artnet::layout::SEQUENCE_OFFSET] = sequence;
    packet[artnet::layout::UNIVERSE_RANGE].copy_from_slice(&universe.to_le_bytes());
    packet[artnet::layout::LENGTH_RANGE].copy_from_slice(&declared.to_be_bytes());
    packet.extend_from_slice(data);
    packet
}

pub fn sacn_dmx(universe: u16, sequence: u8, data: &[u8]) -> Vec<u8> {
    use sacn::layout;

    let mut packet = vec![0u8; layout::MIN_LEN];
    packet[layout::PREAMBLE_SIZE_RANGE].copy_from_slice(&layout::PREAMBLE_SIZE.to_be_bytes());
    packet[layout::POSTAMBLE_SIZE_RANGE].copy_from_slice(&layout::POSTAMBLE_SIZE.to_be_bytes());
    packet[layout::ACN_PID_RANGE].copy_from_slice(layout::ACN_PID);
    packet[layout::ROOT_VECTOR_RANGE].copy_from_slice(&layout::ROOT_VECTOR_DATA.to_be_bytes());
    packet[layout::FRAMING_VECTOR_RANGE].copy_from_slice(&layout::FRAMING_VECTOR_DMX.to_be_bytes());
    packet[layout::SEQUENCE_OFFSET] = sequence;
    packet[layout::UNIVERSE_RANGE].copy_from_slice(&universe.to_be_bytes());
    packet[layout::DMP_VECTOR_OFFSET] = layout::DMP_VECTOR_SET_PROPERTY;
    let count = data.len() as u16 + 1;
    packet[layout::DMP_PROPERTY_VALUE_COUNT_RANGE].copy_from_slice(&count.to_be_bytes());
    packet.extend_from_slice(data);
    packet
}

/// `count` pixels of one color as DMX channel data.
pub fn solid(count: usize, rgb: [u8; 3]) -> Vec<u8> {
    rgb.iter().copied().cycle().take(count * 3).collect()
}

pub fn udp_frame(dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([2, 0, 0, 0, 0, 1], [2, 0, 0, 0, 0, 2])
        .ipv4([192, 168, 1, 10], [192, 168, 1, 50], 64)
        .udp(40000, dst_port);
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, payload).unwrap();
    frame
}

/// Minimal little-endian legacy pcap: Ethernet link type, microsecond stamps.
pub fn legacy_pcap(records: &[(u32, u32, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    for (ts_sec, ts_usec, frame) in records {
        out.extend_from_slice(&ts_sec.to_le_bytes());
        out.extend_from_slice(&ts_usec.to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(frame);
    }
    out
}

pub fn temp_path(name: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("stripnode_{unique}_{name}"));
    path
}

pub fn write_temp(name: &str, bytes: &[u8]) -> PathBuf {
    let path = temp_path(name);
    fs::write(&path, bytes).unwrap();
    path
}
