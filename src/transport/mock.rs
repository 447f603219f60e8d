//! Scripted in-memory transport for tests and hardware-free runs.
//!
//! Replies are scripted per line; an optional latency simulates device
//! turnaround. Every transaction is recorded with its enter/exit instants and
//! a per-line concurrency high-water mark, which is how the test suite proves
//! that no two transactions ever overlap on one line.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{TransactionResult, Transport, TransportError};

/// One recorded transaction.
#[derive(Clone, Debug)]
pub struct ExchangeRecord {
    /// Line the transaction targeted.
    pub line: String,
    /// Exact frame bytes written.
    pub frame: Vec<u8>,
    /// Instant the transaction entered the transport.
    pub started: Instant,
    /// Instant the transaction left the transport.
    pub finished: Instant,
}

#[derive(Default)]
struct ConcurrencyStats {
    active: usize,
    max_active: usize,
}

impl ConcurrencyStats {
    fn enter(&mut self) {
        self.active += 1;
        self.max_active = self.max_active.max(self.active);
    }

    fn leave(&mut self) {
        self.active = self.active.saturating_sub(1);
    }
}

/// In-memory [`Transport`] with scripted replies and an instrumented log.
pub struct MockTransport {
    latency: Duration,
    default_reply: String,
    replies: Mutex<HashMap<String, TransactionResult>>,
    log: Mutex<Vec<ExchangeRecord>>,
    per_line: Mutex<HashMap<String, ConcurrencyStats>>,
    total: Mutex<ConcurrencyStats>,
}

impl MockTransport {
    /// Transport answering `"0.00"` on every line with no latency.
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            default_reply: "0.00".to_string(),
            replies: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            per_line: Mutex::new(HashMap::new()),
            total: Mutex::new(ConcurrencyStats::default()),
        }
    }

    /// Add a fixed per-transaction latency (tokio virtual time aware).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Script the outcome of every transaction on `line`.
    pub async fn set_reply(&self, line: &str, result: TransactionResult) {
        self.replies.lock().await.insert(line.to_string(), result);
    }

    /// Script a transport failure on `line`.
    pub async fn fail_line(&self, line: &str, error: TransportError) {
        self.set_reply(line, Err(error)).await;
    }

    /// Frames recorded on `line`, in completion order.
    pub async fn frames(&self, line: &str) -> Vec<Vec<u8>> {
        self.log
            .lock()
            .await
            .iter()
            .filter(|r| r.line == line)
            .map(|r| r.frame.clone())
            .collect()
    }

    /// Full transaction log, in completion order.
    pub async fn records(&self) -> Vec<ExchangeRecord> {
        self.log.lock().await.clone()
    }

    /// Number of transactions recorded on `line`.
    pub async fn exchange_count(&self, line: &str) -> usize {
        self.log.lock().await.iter().filter(|r| r.line == line).count()
    }

    /// Highest number of simultaneously in-flight transactions seen on `line`.
    pub async fn max_concurrent(&self, line: &str) -> usize {
        self.per_line
            .lock()
            .await
            .get(line)
            .map(|s| s.max_active)
            .unwrap_or(0)
    }

    /// Highest number of simultaneously in-flight transactions across all lines.
    pub async fn max_concurrent_total(&self) -> usize {
        self.total.lock().await.max_active
    }

    async fn begin(&self, line: &str) -> Instant {
        self.per_line
            .lock()
            .await
            .entry(line.to_string())
            .or_default()
            .enter();
        self.total.lock().await.enter();
        Instant::now()
    }

    async fn transact(&self, line: &str, frame: &[u8]) -> TransactionResult {
        let started = self.begin(line).await;

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = self
            .replies
            .lock()
            .await
            .get(line)
            .cloned()
            .unwrap_or_else(|| Ok(self.default_reply.clone()));

        if let Some(stats) = self.per_line.lock().await.get_mut(line) {
            stats.leave();
        }
        self.total.lock().await.leave();
        self.log.lock().await.push(ExchangeRecord {
            line: line.to_string(),
            frame: frame.to_vec(),
            started,
            finished: Instant::now(),
        });

        reply
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, line: &str, frame: &[u8], _timeout: Duration) -> TransactionResult {
        self.transact(line, frame).await
    }

    async fn send(
        &self,
        line: &str,
        frame: &[u8],
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        self.transact(line, frame).await.map(|_| ())
    }
}
