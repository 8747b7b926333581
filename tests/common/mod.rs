//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use metrics_udpjson::{Record, Transport};

/// Captures every record written, shareable with the test after the
/// exporter has been moved into a task.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().clone()
    }

    pub fn records(&self) -> Vec<Record> {
        self.frames
            .lock()
            .iter()
            .map(|f| serde_json::from_slice(f).expect("frame is a record"))
            .collect()
    }

    pub fn values(&self) -> Vec<serde_json::Value> {
        self.frames
            .lock()
            .iter()
            .map(|f| serde_json::from_slice(f).expect("frame is json"))
            .collect()
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn write_record(&mut self, buf: &[u8]) -> io::Result<()> {
        self.frames.lock().push(buf.to_vec());
        Ok(())
    }
}

/// Behaves like a connection whose peer has gone away.
#[derive(Clone, Copy, Default)]
pub struct ClosedTransport;

#[async_trait]
impl Transport for ClosedTransport {
    async fn write_record(&mut self, _buf: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection closed"))
    }
}
