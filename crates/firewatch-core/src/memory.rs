// ── In-memory engine ──
//
// A fake engine for tests. Rules live in a map, statistics are whatever
// the test installs, and every log subscription hands the test a
// `LogFeed` to push lines through and observe cancellation on.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use firewatch_api::engine::models::TrafficStatsResponse;
use firewatch_api::{LogRecord, LogStream};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::engine::{EngineApi, LogSource, TrafficStatsSource};
use crate::error::CoreError;
use crate::model::{EngineHealth, Rule, RuleDraft, RuleUpdate, TrafficSeries};
use crate::traffic::{self, TimeRange};

const FEED_CAPACITY: usize = 256;

/// Test-side end of one log subscription.
#[derive(Debug, Clone)]
pub struct LogFeed {
    sender: mpsc::Sender<Result<LogRecord, firewatch_api::Error>>,
    cancel: CancellationToken,
}

impl LogFeed {
    /// Push one raw line. Returns `false` once the subscriber is gone.
    pub async fn send_line(&self, line: &str) -> bool {
        self.send(LogRecord::from_frame(line)).await
    }

    pub async fn send(&self, record: LogRecord) -> bool {
        !self.cancel.is_cancelled() && self.sender.send(Ok(record)).await.is_ok()
    }

    /// Fail the subscription with a stream error.
    pub async fn fail(&self, reason: &str) {
        let _ = self
            .sender
            .send(Err(firewatch_api::Error::Stream(reason.to_owned())))
            .await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the subscriber cancels.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// A handle that can observe cancellation without keeping the
    /// record channel open.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// In-memory stand-in for the firewall engine.
#[derive(Debug)]
pub struct MemoryEngine {
    rules: Mutex<BTreeMap<u64, Rule>>,
    next_id: AtomicU64,
    stats: Mutex<TrafficStatsResponse>,
    requested_ranges: Mutex<Vec<TimeRange>>,
    feeds: Mutex<Vec<LogFeed>>,
    available: AtomicBool,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            stats: Mutex::new(TrafficStatsResponse::default()),
            requested_ranges: Mutex::new(Vec::new()),
            feeds: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Seed the rule table. Ids are kept; new ids continue after the
    /// highest seeded one.
    pub fn with_rules(self, rules: impl IntoIterator<Item = Rule>) -> Self {
        let map: BTreeMap<u64, Rule> = rules.into_iter().map(|r| (r.id, r)).collect();
        let next = map.keys().next_back().map_or(1, |id| id + 1);
        self.next_id.store(next, Ordering::SeqCst);
        Self {
            rules: Mutex::new(map),
            ..self
        }
    }

    /// Install the raw statistics the engine will answer with.
    pub async fn set_stats(&self, stats: TrafficStatsResponse) {
        *self.stats.lock().await = stats;
    }

    /// Ranges requested so far, in order.
    pub async fn requested_ranges(&self) -> Vec<TimeRange> {
        self.requested_ranges.lock().await.clone()
    }

    /// Simulate the engine going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Feeds for every subscription opened so far, oldest first.
    pub async fn feeds(&self) -> Vec<LogFeed> {
        self.feeds.lock().await.clone()
    }

    /// Subscriptions that have not been cancelled.
    pub async fn open_subscriptions(&self) -> usize {
        self.feeds
            .lock()
            .await
            .iter()
            .filter(|f| !f.is_cancelled())
            .count()
    }

    fn ensure_available(&self) -> Result<(), CoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CoreError::EngineUnavailable {
                reason: "in-memory engine switched off".into(),
            })
        }
    }
}

fn require_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation {
            message: "rule name must not be empty".into(),
        });
    }
    Ok(())
}

#[async_trait]
impl EngineApi for MemoryEngine {
    async fn status(&self) -> Result<EngineHealth, CoreError> {
        self.ensure_available()?;
        let active = self.rules.lock().await.len() as u64;
        Ok(EngineHealth {
            status: "running".into(),
            version: Some("memory".into()),
            uptime_seconds: Some(0),
            active_rules: Some(active),
            extra: serde_json::Map::new(),
        })
    }

    async fn list_rules(&self) -> Result<Vec<Rule>, CoreError> {
        self.ensure_available()?;
        Ok(self.rules.lock().await.values().cloned().collect())
    }

    async fn create_rule(&self, draft: RuleDraft) -> Result<Rule, CoreError> {
        self.ensure_available()?;
        require_name(&draft.name)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let rule = Rule {
            id,
            name: draft.name,
            source_ip: draft.source_ip,
            dest_ip: draft.dest_ip,
            source_port: draft.source_port,
            dest_port: draft.dest_port,
            protocol: draft.protocol,
            action: draft.action,
        };
        self.rules.lock().await.insert(id, rule.clone());
        Ok(rule)
    }

    async fn update_rule(&self, id: u64, update: RuleUpdate) -> Result<Rule, CoreError> {
        self.ensure_available()?;
        if let Some(ref name) = update.name {
            require_name(name)?;
        }
        let mut rules = self.rules.lock().await;
        let rule = rules.get_mut(&id).ok_or_else(|| CoreError::rule_not_found(id))?;
        update.apply_to(rule);
        Ok(rule.clone())
    }

    async fn delete_rule(&self, id: u64) -> Result<(), CoreError> {
        self.ensure_available()?;
        self.rules
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CoreError::rule_not_found(id))
    }
}

#[async_trait]
impl TrafficStatsSource for MemoryEngine {
    async fn traffic_stats(&self, range: &TimeRange) -> Result<TrafficSeries, CoreError> {
        self.ensure_available()?;
        self.requested_ranges.lock().await.push(range.clone());
        let raw = self.stats.lock().await.clone();
        Ok(traffic::reshape(raw, range))
    }
}

#[async_trait]
impl LogSource for MemoryEngine {
    async fn subscribe(&self, cancel: CancellationToken) -> Result<LogStream, CoreError> {
        self.ensure_available()?;
        let (sender, records) = mpsc::channel(FEED_CAPACITY);
        self.feeds.lock().await.push(LogFeed {
            sender,
            cancel: cancel.clone(),
        });
        Ok(LogStream::from_receiver(records, cancel))
    }
}
