use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, info};

use crate::analyzer::{identify_protocol, HEADER_SIZE};
use crate::models::domain::PacketRecord;

/// One produced packet: the structured record plus the raw frame bytes.
pub struct PacketUpdate {
    pub record: PacketRecord,
    pub frame: Vec<u8>,
}

/// The fixed sample from the composition root: one MCP-1 packet of 100 bytes
/// and one MCP-2 packet of 150 bytes, timestamped at construction.
pub fn sample_records() -> Vec<PacketRecord> {
    vec![
        PacketRecord::new("MCP-1", 100),
        PacketRecord::new("MCP-2", 150),
    ]
}

/// Raw frames matching `sample_records` in protocol and size.
pub fn sample_frames() -> Vec<Vec<u8>> {
    vec![
        build_frame(0x01, &patterned_payload(100 - HEADER_SIZE, 3)),
        build_frame(0x02, &patterned_payload(150 - HEADER_SIZE, 5)),
    ]
}

/// Build an MCP frame: 4-byte header, payload, trailing checksum byte set to
/// the byte sum of everything but the last four bytes, modulo 256.
pub fn build_frame(protocol_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![protocol_id, 0x00, 0x00, 0x00];
    frame.extend_from_slice(payload);
    if frame.len() >= HEADER_SIZE + 1 {
        let sum: u64 = frame[..frame.len() - 4].iter().map(|&b| u64::from(b)).sum();
        let last = frame.len() - 1;
        frame[last] = (sum % 256) as u8;
    }
    frame
}

fn patterned_payload(len: usize, step: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(step)).collect()
}

/// Start the synthetic packet producer on its own thread.
///
/// Frames are generated deterministically from `seed`: mostly well-formed
/// MCP-1/2/3 traffic with patterned payloads, with the occasional
/// unrecognized header or high-entropy burst so the anomaly path gets
/// exercised. The thread ends when the receiving side hangs up.
pub fn start_feed(interval: Duration, seed: u64, sender: Sender<PacketUpdate>) -> JoinHandle<()> {
    thread::spawn(move || {
        info!(interval_ms = interval.as_millis() as u64, "packet feed started");
        let mut rng = Xorshift64::new(seed);

        loop {
            let frame = next_frame(&mut rng);
            let record = PacketRecord::new(identify_protocol(&frame), frame.len() as u64);

            if sender.send(PacketUpdate { record, frame }).is_err() {
                debug!("feed channel closed, stopping producer");
                break;
            }
            thread::sleep(interval);
        }
    })
}

fn next_frame(rng: &mut Xorshift64) -> Vec<u8> {
    let roll = rng.next() % 20;
    let payload_len = 16 + (rng.next() % 112) as usize;

    match roll {
        // rare: unrecognized header
        0 => {
            let payload = patterned_payload(payload_len, 1);
            let mut frame = build_frame(0xEE, &payload);
            frame[1] = 0xEE;
            frame
        }
        // rare: noise burst, metrics far off the baseline
        1 => {
            let payload: Vec<u8> = (0..payload_len).map(|_| (rng.next() % 256) as u8).collect();
            build_frame(0x01, &payload)
        }
        r if r < 10 => build_frame(0x01, &patterned_payload(payload_len, 3)),
        r if r < 16 => build_frame(0x02, &patterned_payload(payload_len, 5)),
        _ => build_frame(0x03, &patterned_payload(payload_len, 7)),
    }
}

/// Small deterministic generator; keeps the demo feed reproducible without
/// pulling in a randomness crate.
struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        Xorshift64 {
            state: seed.max(1),
        }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}
