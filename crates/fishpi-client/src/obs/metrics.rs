//! In-process counters for a client run.
//!
//! Counters are keyed by a static name plus sorted labels and backed by
//! `DashMap`, so any task can bump them without a lock. `summary()` renders a
//! single line for the shutdown log.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let mut key: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        key.sort();
        let counter = self.map.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Sum across every label set.
    pub fn total(&self) -> u64 {
        self.map
            .iter()
            .map(|r| r.value().load(Ordering::Relaxed))
            .sum()
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        let mut key: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        key.sort();
        self.map
            .get(&key)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

#[derive(Default)]
pub struct ClientMetrics {
    /// Text frames read off the socket.
    pub frames_in: CounterVec,
    /// Outbound frames handed to the writer.
    pub frames_out: CounterVec,
    /// Reconnect attempts, labelled `result=ok|err`.
    pub reconnects: CounterVec,
    pub decode_errors: CounterVec,
    /// Events published, labelled by tag.
    pub events: CounterVec,
}

impl ClientMetrics {
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "frames_in={} frames_out={} reconnect_ok={} reconnect_err={} decode_errors={} events={}",
            self.frames_in.total(),
            self.frames_out.total(),
            self.reconnects.get(&[("result", "ok")]),
            self.reconnects.get(&[("result", "err")]),
            self.decode_errors.total(),
            self.events.total(),
        );
        out
    }
}
