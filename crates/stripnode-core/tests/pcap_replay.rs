mod support;

use std::fs;
use std::sync::atomic::AtomicBool;

use stripnode_core::{
    ColorOrder, DatagramSource, FrameRecord, JsonLinesStrip, LogIndicator, Node, NodeConfig,
    PcapReplaySource, Received, SourceError, StatusConfig,
};
use support::{artdmx, legacy_pcap, sacn_dmx, solid, udp_frame, write_temp};

fn small_config(protocol: &str) -> NodeConfig {
    NodeConfig::from_json_str(&format!(
        r#"{{ "strip": {{ "pixel_count": 4, "pixels_per_universe": 2 }},
             "render": {{ "min_interval_ms": 20, "max_staleness_ms": 100 }},
             "network": {{ "protocol": "{protocol}" }} }}"#
    ))
    .unwrap()
}

#[test]
fn replay_yields_port_datagrams_with_capture_offsets() {
    let capture = legacy_pcap(&[
        (1_000, 0, udp_frame(6454, &artdmx(0, 1, &[1, 2, 3]))),
        (1_000, 2_000, udp_frame(9999, b"noise")),
        (1_000, 5_000, udp_frame(6454, &artdmx(1, 1, &[4, 5, 6]))),
    ]);
    let path = write_temp("offsets.pcap", &capture);

    let mut source = PcapReplaySource::open(&path, 6454).unwrap();
    let mut buf = [0u8; 1500];
    let mut offsets = Vec::new();
    loop {
        match source.recv(&mut buf).unwrap() {
            Received::Datagram { len, at } => {
                assert_eq!(&buf[..8], b"Art-Net\0");
                assert_eq!(len, 21);
                offsets.push(at.unwrap().as_millis());
            }
            Received::Idle => panic!("replay never idles"),
            Received::Closed => break,
        }
    }
    let window = source.capture_window();
    let _ = fs::remove_file(&path);

    assert_eq!(offsets, vec![0, 5]);
    assert_eq!(window.packets_total, 3);
    assert_eq!(window.datagrams, 2);
    assert_eq!(window.first_ts.as_deref(), Some("1970-01-01T00:16:40Z"));
}

#[test]
fn replay_through_node_writes_frames() {
    let capture = legacy_pcap(&[
        (50, 0, udp_frame(6454, &artdmx(0, 1, &solid(2, [1, 2, 3])))),
        (50, 5_000, udp_frame(6454, &artdmx(1, 1, &solid(2, [4, 5, 6])))),
        (50, 10_000, udp_frame(6454, &artdmx(0, 2, &solid(2, [7, 8, 9])))),
    ]);
    let path = write_temp("node.pcap", &capture);

    let mut output = Vec::new();
    let summary = {
        let source = PcapReplaySource::open(&path, 6454).unwrap();
        let driver = JsonLinesStrip::new(&mut output, ColorOrder::Rgb);
        let indicator = LogIndicator::new(StatusConfig::default());
        let mut node = Node::new(&small_config("artnet"), source, driver, indicator).unwrap();
        node.run(&AtomicBool::new(false)).unwrap();
        node.finish(false).unwrap()
    };
    let _ = fs::remove_file(&path);

    let records: Vec<FrameRecord> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    // Startup clear, complete frame at 5 ms, drained partial at 25 ms.
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].channels, vec![0; 12]);
    assert_eq!(records[1].channels, vec![1, 2, 3, 1, 2, 3, 4, 5, 6, 4, 5, 6]);
    assert_eq!(records[2].channels, vec![7, 8, 9, 7, 8, 9, 4, 5, 6, 4, 5, 6]);
    assert_eq!(summary.stats.flushes_complete, 1);
    assert_eq!(summary.stats.flushes_drain, 1);
    assert_eq!(summary.last_flush_ms, Some(25));
}

#[test]
fn sacn_replay_uses_sacn_port() {
    let capture = legacy_pcap(&[
        (7, 0, udp_frame(5568, &sacn_dmx(0, 0, &solid(2, [1, 1, 1])))),
        (7, 1_000, udp_frame(5568, &sacn_dmx(1, 0, &solid(2, [2, 2, 2])))),
    ]);
    let path = write_temp("sacn.pcap", &capture);

    let config = small_config("sacn");
    let source = PcapReplaySource::open(&path, config.network.port()).unwrap();
    let mut node = Node::new(
        &config,
        source,
        stripnode_core::NullStrip::new(),
        LogIndicator::new(StatusConfig::default()),
    )
    .unwrap();
    node.run(&AtomicBool::new(false)).unwrap();
    let summary = node.finish(true).unwrap();
    let _ = fs::remove_file(&path);

    assert_eq!(summary.stats.accepted, 2);
    assert_eq!(summary.stats.flushes_complete, 1);
}

#[test]
fn truncated_capture_is_rejected() {
    let path = write_temp("truncated.pcapng", &[0x0a, 0x0d, 0x0d]);
    let err = match PcapReplaySource::open(&path, 6454) {
        Ok(_) => panic!("expected truncated file to be rejected"),
        Err(err) => err,
    };
    let _ = fs::remove_file(&path);

    assert!(matches!(err, SourceError::Io(_)));
}

#[test]
fn missing_capture_is_an_io_error() {
    let path = support::temp_path("missing.pcap");
    assert!(matches!(
        PcapReplaySource::open(&path, 6454),
        Err(SourceError::Io(_))
    ));
}
