// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Pull-parse driven adapters over raw byte streams.
//!
//! A [`Protocol`] knows how to obtain bytes from somewhere, a [`Parser`]
//! splits bytes into records and a [`Format`] turns one record into an
//! [`Event`]. [`GenericStreamAdapter`] exposes any protocol through the
//! common [`Adapter`] capability set.
//!
//! ```text
//!  bytes ──► Parser ──► record ──► Format ──► Event ──► EventSink
//!    ▲
//!  Protocol (reader, file, socket, ...)
//! ```

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

use crate::adapter::Adapter;
use crate::description::AdapterDescription;
use crate::error::{AdapterError, AdapterResult};
use crate::pipeline::{CollectingSink, EventSink};
use crate::schema::{infer_schema, GuessSchema};
use crate::types::{Event, Value};

/// Number of events sampled when guessing a schema.
pub const DEFAULT_SAMPLE_SIZE: usize = 20;

const READ_CHUNK: usize = 8 * 1024;

// =============================================================================
// Format / Parser
// =============================================================================

/// Converts one raw record into an event.
pub trait Format: Send + Sync {
    /// Format id.
    fn id(&self) -> &str;

    /// Parses one record.
    fn parse(&self, record: &[u8]) -> AdapterResult<Event>;
}

/// Splits raw bytes into records.
pub trait Parser: Send + Sync {
    /// Parser id.
    fn id(&self) -> &str;

    /// Emits every complete record at the front of `buffer` and removes it,
    /// leaving an incomplete tail in place.
    fn parse(&self, buffer: &mut Vec<u8>, emit: &mut dyn FnMut(&[u8]) -> AdapterResult<()>) -> AdapterResult<()>;

    /// Emits what is left in `buffer` at end of input.
    fn finish(&self, buffer: &mut Vec<u8>, emit: &mut dyn FnMut(&[u8]) -> AdapterResult<()>) -> AdapterResult<()>;
}

/// Newline delimited records. Blank lines are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineParser;

impl Parser for LineParser {
    fn id(&self) -> &str {
        "line"
    }

    fn parse(&self, buffer: &mut Vec<u8>, emit: &mut dyn FnMut(&[u8]) -> AdapterResult<()>) -> AdapterResult<()> {
        let mut start = 0;
        while let Some(pos) = buffer[start..].iter().position(|b| *b == b'\n') {
            let line = trim_line(&buffer[start..start + pos]);
            if !line.is_empty() {
                emit(line)?;
            }
            start += pos + 1;
        }
        buffer.drain(..start);
        Ok(())
    }

    fn finish(&self, buffer: &mut Vec<u8>, emit: &mut dyn FnMut(&[u8]) -> AdapterResult<()>) -> AdapterResult<()> {
        self.parse(buffer, emit)?;
        let line = trim_line(buffer);
        if !line.is_empty() {
            emit(line)?;
        }
        buffer.clear();
        Ok(())
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

/// One JSON object per record; top-level keys become fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonObjectFormat;

impl Format for JsonObjectFormat {
    fn id(&self) -> &str {
        "json-object"
    }

    fn parse(&self, record: &[u8]) -> AdapterResult<Event> {
        let json: serde_json::Value =
            serde_json::from_slice(record).map_err(|e| AdapterError::parse(e.to_string()))?;
        match json {
            serde_json::Value::Object(map) => Ok(map
                .iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect()),
            other => Err(AdapterError::parse(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// =============================================================================
// Protocol
// =============================================================================

/// A source of raw records.
#[async_trait]
pub trait Protocol: Send + Sync {
    /// Protocol id.
    fn id(&self) -> &str;

    /// Static description of the protocol.
    fn declare_model(&self) -> AdapterDescription;

    /// Reads up to `n` events from a fresh connection to the source.
    async fn get_n_elements(&self, n: usize) -> AdapterResult<Vec<Event>>;

    /// Guesses the schema from a sample of events.
    async fn guess_schema(&self) -> AdapterResult<GuessSchema> {
        let sample = self.get_n_elements(DEFAULT_SAMPLE_SIZE).await?;
        Ok(GuessSchema::new(infer_schema(&sample)).with_preview(sample))
    }

    /// Starts delivering events into `sink` in the background.
    async fn run(&self, sink: Arc<dyn EventSink>) -> AdapterResult<()>;

    /// Stops delivery. Once this returns no further event is delivered.
    async fn stop(&self) -> AdapterResult<()>;
}

type ReaderFactory = dyn Fn() -> io::Result<Box<dyn AsyncRead + Send + Unpin>> + Send + Sync;

/// Protocol that reads a byte stream from a reader factory.
///
/// The factory is invoked once per run and once per sample request.
pub struct ReaderProtocol {
    id: String,
    open: Arc<ReaderFactory>,
    parser: Arc<dyn Parser>,
    format: Arc<dyn Format>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReaderProtocol {
    /// Creates a protocol from a reader factory, parser and format.
    pub fn new<F>(id: impl Into<String>, open: F, parser: Arc<dyn Parser>, format: Arc<dyn Format>) -> Self
    where
        F: Fn() -> io::Result<Box<dyn AsyncRead + Send + Unpin>> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            open: Arc::new(open),
            parser,
            format,
            task: Mutex::new(None),
        }
    }

    fn open(&self) -> AdapterResult<Box<dyn AsyncRead + Send + Unpin>> {
        (self.open)().map_err(|e| AdapterError::connector(&self.id, e))
    }
}

/// Reads `reader` to the end (or until `limit` events), pushing events into `sink`.
async fn pump(
    mut reader: Box<dyn AsyncRead + Send + Unpin>,
    parser: &dyn Parser,
    format: &dyn Format,
    sink: &dyn EventSink,
    limit: Option<usize>,
) -> AdapterResult<usize> {
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut count = 0usize;
    let reached = |count: usize| limit.map_or(false, |l| count >= l);

    loop {
        let read = reader
            .read(&mut chunk)
            .await
            .map_err(|e| AdapterError::parse(format!("read failed: {}", e)))?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);

        let mut emit = |record: &[u8]| -> AdapterResult<()> {
            if !reached(count) {
                sink.process(format.parse(record)?);
                count += 1;
            }
            Ok(())
        };
        parser.parse(&mut buffer, &mut emit)?;
        if reached(count) {
            return Ok(count);
        }
    }

    let mut emit = |record: &[u8]| -> AdapterResult<()> {
        if !reached(count) {
            sink.process(format.parse(record)?);
            count += 1;
        }
        Ok(())
    };
    parser.finish(&mut buffer, &mut emit)?;
    Ok(count)
}

#[async_trait]
impl Protocol for ReaderProtocol {
    fn id(&self) -> &str {
        &self.id
    }

    fn declare_model(&self) -> AdapterDescription {
        AdapterDescription::builder(&self.id)
            .name(&self.id)
            .description(format!(
                "Byte stream parsed with '{}' records in '{}' format",
                self.parser.id(),
                self.format.id()
            ))
            .category("Generic")
            .build()
    }

    async fn get_n_elements(&self, n: usize) -> AdapterResult<Vec<Event>> {
        let reader = self.open()?;
        let collected = CollectingSink::new();
        pump(reader, self.parser.as_ref(), self.format.as_ref(), &collected, Some(n)).await?;
        Ok(collected.take())
    }

    async fn run(&self, sink: Arc<dyn EventSink>) -> AdapterResult<()> {
        let reader = self.open()?;
        let parser = self.parser.clone();
        let format = self.format.clone();
        let id = self.id.clone();

        let handle = tokio::spawn(async move {
            match pump(reader, parser.as_ref(), format.as_ref(), sink.as_ref(), None).await {
                Ok(count) => tracing::info!(protocol = %id, events = count, "Stream finished"),
                Err(e) => tracing::error!(protocol = %id, error = %e, "Stream failed"),
            }
        });

        if let Some(previous) = self.task.lock().replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    async fn stop(&self) -> AdapterResult<()> {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            // Wait for the task so nothing is emitted after we return.
            let _ = handle.await;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ReaderProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderProtocol")
            .field("id", &self.id)
            .field("parser", &self.parser.id())
            .field("format", &self.format.id())
            .finish()
    }
}

// =============================================================================
// GenericStreamAdapter
// =============================================================================

/// Adapter that delegates to a [`Protocol`].
pub struct GenericStreamAdapter {
    description: AdapterDescription,
    protocol: Arc<dyn Protocol>,
    running: bool,
}

impl GenericStreamAdapter {
    /// Creates an adapter for a protocol.
    pub fn new(description: AdapterDescription, protocol: Arc<dyn Protocol>) -> Self {
        Self {
            description,
            protocol,
            running: false,
        }
    }

    /// Returns the underlying protocol.
    pub fn protocol(&self) -> &Arc<dyn Protocol> {
        &self.protocol
    }
}

#[async_trait]
impl Adapter for GenericStreamAdapter {
    fn id(&self) -> &str {
        &self.description.app_id
    }

    fn description(&self) -> &AdapterDescription {
        &self.description
    }

    async fn start(&mut self, sink: Arc<dyn EventSink>) -> AdapterResult<()> {
        if self.running {
            return Err(AdapterError::lifecycle("adapter is already running"));
        }
        self.protocol.run(sink).await?;
        self.running = true;
        tracing::info!(adapter_id = %self.description.app_id, protocol = %self.protocol.id(), "Stream adapter started");
        Ok(())
    }

    async fn stop(&mut self) -> AdapterResult<()> {
        if !self.running {
            return Ok(());
        }
        self.protocol.stop().await?;
        self.running = false;
        tracing::info!(adapter_id = %self.description.app_id, "Stream adapter stopped");
        Ok(())
    }

    async fn get_schema(&self) -> AdapterResult<GuessSchema> {
        self.protocol.guess_schema().await
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

// =============================================================================
// Tests
// =============================================================================
