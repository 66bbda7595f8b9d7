// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! JSON-lines event output.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use connect_core::{Event, EventSink};
use parking_lot::Mutex;
use tracing::warn;

/// Writes each event as one JSON object per line.
///
/// Write failures are logged and counted, never propagated: the sink runs
/// inside the notification path.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
    written: AtomicU64,
    failed: AtomicU64,
}

impl JsonLinesSink<io::Stdout> {
    /// Creates a sink on stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Creates a sink on `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            written: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Number of events written.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Number of events that could not be written.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn process(&self, event: Event) {
        let mut writer = self.writer.lock();
        let result = serde_json::to_writer(&mut *writer, &event.to_json())
            .map_err(io::Error::from)
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush());

        match result {
            Ok(()) => {
                self.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                let failed = self.failed.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(error = %e, failed, "Failed to write event");
            }
        }
    }
}

impl<W> std::fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink")
            .field("written", &self.written.load(Ordering::Relaxed))
            .field("failed", &self.failed.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_one_line_per_event() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.process(Event::new().with_field("Speed", 1200).with_field("Status", "OK"));
        sink.process(Event::new().with_field("Speed", 1250).with_field("Status", "OK"));
        assert_eq!(sink.written(), 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["Speed"], 1200);
        assert_eq!(first["Status"], "OK");
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_counted() {
        let sink = JsonLinesSink::new(Broken);
        sink.process(Event::new().with_field("A", 1));
        assert_eq!(sink.written(), 0);
        assert_eq!(sink.failed(), 1);
    }
}
