//! Simulated audio backend
//!
//! Succeeds after a configurable latency and records every call in a
//! [`MockJournal`] that tests can inspect while the orchestrator owns the
//! backend.

use super::AudioBackend;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// One backend call as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Start(String),
    Stop,
    SetVolume(u8),
}

#[derive(Debug, Default)]
struct JournalInner {
    calls: Vec<BackendCall>,
    active_streams: usize,
    peak_active_streams: usize,
}

/// Shared view of the mock's call history
#[derive(Debug, Clone, Default)]
pub struct MockJournal {
    inner: Arc<Mutex<JournalInner>>,
}

impl MockJournal {
    fn lock(&self) -> MutexGuard<'_, JournalInner> {
        // A panicking test thread must not hide the journal from the others
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: BackendCall) {
        self.lock().calls.push(call);
    }

    fn stream_started(&self) {
        let mut inner = self.lock();
        inner.active_streams += 1;
        inner.peak_active_streams = inner.peak_active_streams.max(inner.active_streams);
    }

    fn stream_stopped(&self) {
        let mut inner = self.lock();
        inner.active_streams = inner.active_streams.saturating_sub(1);
    }

    /// All calls in order
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// URLs passed to `start`, in order
    pub fn started_urls(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Start(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// Streams running right now
    pub fn active_streams(&self) -> usize {
        self.lock().active_streams
    }

    /// Most streams that were ever running at the same time
    pub fn peak_active_streams(&self) -> usize {
        self.lock().peak_active_streams
    }
}

/// Backend that only pretends to play
#[derive(Debug)]
pub struct MockBackend {
    latency: Duration,
    volume: u8,
    current_url: Option<String>,
    failing_urls: HashSet<String>,
    journal: MockJournal,
}

impl MockBackend {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            volume: 50,
            current_url: None,
            failing_urls: HashSet::new(),
            journal: MockJournal::default(),
        }
    }

    /// Make `start` fail for this URL
    pub fn fail_on(mut self, url: impl Into<String>) -> Self {
        self.failing_urls.insert(url.into());
        self
    }

    /// Handle to the call journal
    pub fn journal(&self) -> MockJournal {
        self.journal.clone()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl AudioBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn start(&mut self, url: &str) -> Result<()> {
        self.journal.record(BackendCall::Start(url.to_string()));
        self.simulate_latency().await;

        if self.failing_urls.contains(url) {
            return Err(Error::Backend(format!("simulated failure for {}", url)));
        }

        self.journal.stream_started();
        self.current_url = Some(url.to_string());
        info!("[MOCK] Playing {}", url);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.journal.record(BackendCall::Stop);
        if let Some(url) = self.current_url.take() {
            self.simulate_latency().await;
            self.journal.stream_stopped();
            info!("[MOCK] Stopped {}", url);
        }
        Ok(())
    }

    async fn set_volume(&mut self, level: u8) -> Result<()> {
        self.journal.record(BackendCall::SetVolume(level));
        self.volume = level.min(100);
        debug!("[MOCK] Volume {}", self.volume);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.current_url.is_some()
    }
}
