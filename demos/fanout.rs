//! Fan-out demo with a synthetic publisher
//!
//! Run with: cargo run --example fanout [PACKETS]
//!
//! Publishes a generated 30 fps stream (keyframe every second) under the id
//! `demo`, attaches two RTMP viewers that drain it at different speeds, and
//! polls the HLS playlist and segments the way an HTTP player would.
//!
//! Set `RUST_LOG=rtmp_relay=trace` to watch evictions and segment cuts.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio_util::sync::CancellationToken;

use rtmp_relay::{
    CodecData, Demuxer, HlsConfig, Muxer, Packet, RegistryConfig, Relay, SegmentMuxer, TrackInfo,
};

/// Generates `remaining` video packets at 30 fps in real time
struct SyntheticDemuxer {
    remaining: u32,
    frame: u32,
}

impl Demuxer for SyntheticDemuxer {
    async fn streams(&mut self) -> io::Result<CodecData> {
        Ok(CodecData::new(vec![TrackInfo::video(
            "h264",
            Bytes::from_static(&[0x01, 0x64, 0x00, 0x1f]),
        )]))
    }

    async fn read_packet(&mut self) -> io::Result<Option<Packet>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        tokio::time::sleep(Duration::from_millis(33)).await;

        let packet = Packet::video(
            self.frame * 33,
            Bytes::from(vec![0u8; 1200]),
            self.frame % 30 == 0,
        );
        self.frame += 1;
        self.remaining -= 1;
        Ok(Some(packet))
    }

    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Counts what it receives, sleeping `delay` per packet to simulate a slow link
struct CountingMuxer {
    name: &'static str,
    delay: Duration,
    packets: u64,
    bytes: usize,
}

impl Muxer for CountingMuxer {
    async fn write_header(&mut self, codec: &CodecData) -> io::Result<()> {
        println!("[{}] header with {} track(s)", self.name, codec.tracks.len());
        Ok(())
    }

    async fn write_packet(&mut self, packet: &Packet) -> io::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.packets += 1;
        self.bytes += packet.size();
        Ok(())
    }

    async fn write_trailer(&mut self) -> io::Result<()> {
        println!(
            "[{}] trailer after {} packets ({} bytes)",
            self.name, self.packets, self.bytes
        );
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Stand-in for a TS packager: concatenates payloads
#[derive(Default)]
struct RawSegmentMuxer {
    current: BytesMut,
}

impl SegmentMuxer for RawSegmentMuxer {
    fn write_header(&mut self, _codec: &CodecData) -> io::Result<()> {
        Ok(())
    }

    fn write_packet(&mut self, packet: &Packet) -> io::Result<()> {
        self.current.extend_from_slice(&packet.data);
        Ok(())
    }

    fn finish_segment(&mut self) -> io::Result<Bytes> {
        Ok(self.current.split().freeze())
    }
}

fn raw_segments(_stream_id: &str) -> Box<dyn SegmentMuxer> {
    Box::new(RawSegmentMuxer::default())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rtmp_relay=info".parse()?),
        )
        .init();

    let packets: u32 = std::env::args()
        .nth(1)
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(300);

    let config = RegistryConfig::default()
        .hls(HlsConfig::default().target_duration(Duration::from_secs(2)));
    let relay = Arc::new(Relay::with_config(config, raw_segments));
    let cleanup = relay.registry().spawn_cleanup_task();
    let shutdown = relay.shutdown_token().clone();

    let publisher = {
        let relay = Arc::clone(&relay);
        let cancel = shutdown.child_token();
        tokio::spawn(async move {
            let mut demuxer = SyntheticDemuxer {
                remaining: packets,
                frame: 0,
            };
            relay.publish("demo", &mut demuxer, &cancel).await
        })
    };

    while relay.stream_ids().await.is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    println!("live streams: {:?}", relay.stream_ids().await);

    let mut viewers = Vec::new();
    for (name, delay) in [("fast", Duration::ZERO), ("slow", Duration::from_millis(30))] {
        let relay = Arc::clone(&relay);
        let cancel = shutdown.child_token();
        viewers.push(tokio::spawn(async move {
            let mut muxer = CountingMuxer {
                name,
                delay,
                packets: 0,
                bytes: 0,
            };
            let result = relay.play_rtmp("demo", &mut muxer, &cancel).await;
            (name, result)
        }));
    }

    // Poll HLS like a player: playlist, then every listed segment once
    let mut fetched = std::collections::HashSet::new();
    loop {
        let cancel = shutdown.child_token();
        let response = match relay.play_hls("/live/demo.m3u8", &cancel).await {
            Ok(response) => response,
            Err(e) => {
                println!("[hls] playlist unavailable: {e}");
                break;
            }
        };
        let playlist = String::from_utf8_lossy(&response.body).into_owned();

        for name in playlist.lines().filter(|line| line.ends_with(".ts")) {
            if fetched.insert(name.to_string()) {
                let segment = relay.play_hls(&format!("/live/{name}"), &cancel).await?;
                println!("[hls] {} ({} bytes)", name, segment.body.len());
            }
        }

        if playlist.contains("#EXT-X-ENDLIST") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    println!("publish result: {:?}", publisher.await?);
    for viewer in viewers {
        let (name, result) = viewer.await?;
        println!("[{name}] result: {result:?}");
    }

    relay.shutdown();
    cleanup.abort();
    Ok(())
}
