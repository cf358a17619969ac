// ── Engine capabilities ──
//
// The gateway talks to the firewall engine only through these traits.
// `RemoteEngine` is the real implementation over `firewatch_api`; the
// in-memory fake lives in `crate::memory`. Which one backs a gateway is
// decided once, when its state is built.

use async_trait::async_trait;
use firewatch_api::engine::models::{RulePatch, RuleSpec};
use firewatch_api::{EngineClient, LogStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::model::{EngineHealth, Rule, RuleDraft, RuleUpdate, TrafficSeries};
use crate::traffic::{self, TimeRange};

// ── Capability traits ────────────────────────────────────────────────

/// Rule management and health queries.
#[async_trait]
pub trait EngineApi: Send + Sync {
    async fn status(&self) -> Result<EngineHealth, CoreError>;

    async fn list_rules(&self) -> Result<Vec<Rule>, CoreError>;

    /// Create a rule. The engine assigns the id.
    async fn create_rule(&self, draft: RuleDraft) -> Result<Rule, CoreError>;

    async fn update_rule(&self, id: u64, update: RuleUpdate) -> Result<Rule, CoreError>;

    /// Delete a rule. An unknown id is `CoreError::NotFound`.
    async fn delete_rule(&self, id: u64) -> Result<(), CoreError>;
}

/// Bucketed traffic statistics, already reshaped for display.
#[async_trait]
pub trait TrafficStatsSource: Send + Sync {
    async fn traffic_stats(&self, range: &TimeRange) -> Result<TrafficSeries, CoreError>;
}

/// Engine log subscriptions.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Open one log subscription governed by `cancel`.
    async fn subscribe(&self, cancel: CancellationToken) -> Result<LogStream, CoreError>;
}

/// Everything the gateway needs from an engine.
pub trait Engine: EngineApi + TrafficStatsSource + LogSource {}

impl<T> Engine for T where T: EngineApi + TrafficStatsSource + LogSource {}

// ── RemoteEngine ─────────────────────────────────────────────────────

/// Engine reached over its remote control interface.
#[derive(Debug, Clone)]
pub struct RemoteEngine {
    client: EngineClient,
}

impl RemoteEngine {
    /// Build the HTTP client for `config`. No request is made yet.
    pub fn connect(config: &EngineConfig) -> Result<Self, CoreError> {
        let client = EngineClient::new(config.url.clone(), &config.transport())?;
        info!(url = %config.url, timeout = ?config.timeout, "engine client ready");
        Ok(Self { client })
    }
}

/// Rewrite a generic engine 404 as a missing rule.
fn rule_scoped(id: u64) -> impl FnOnce(firewatch_api::Error) -> CoreError {
    move |err| {
        if err.is_not_found() {
            CoreError::rule_not_found(id)
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl EngineApi for RemoteEngine {
    async fn status(&self) -> Result<EngineHealth, CoreError> {
        Ok(self.client.get_status().await?.into())
    }

    async fn list_rules(&self) -> Result<Vec<Rule>, CoreError> {
        let rules = self.client.list_rules().await?;
        debug!(count = rules.len(), "listed engine rules");
        Ok(rules.into_iter().map(Rule::from).collect())
    }

    async fn create_rule(&self, draft: RuleDraft) -> Result<Rule, CoreError> {
        let created = self.client.create_rule(&RuleSpec::from(draft)).await?;
        info!(rule_id = created.id, name = %created.name, "rule created");
        Ok(created.into())
    }

    async fn update_rule(&self, id: u64, update: RuleUpdate) -> Result<Rule, CoreError> {
        let updated = self
            .client
            .update_rule(id, &RulePatch::from(update))
            .await
            .map_err(rule_scoped(id))?;
        info!(rule_id = id, "rule updated");
        Ok(updated.into())
    }

    async fn delete_rule(&self, id: u64) -> Result<(), CoreError> {
        self.client
            .delete_rule(id)
            .await
            .map_err(rule_scoped(id))?;
        info!(rule_id = id, "rule deleted");
        Ok(())
    }
}

#[async_trait]
impl TrafficStatsSource for RemoteEngine {
    async fn traffic_stats(&self, range: &TimeRange) -> Result<TrafficSeries, CoreError> {
        let raw = self.client.get_traffic_stats(range.as_str()).await?;
        Ok(traffic::reshape(raw, range))
    }
}

#[async_trait]
impl LogSource for RemoteEngine {
    async fn subscribe(&self, cancel: CancellationToken) -> Result<LogStream, CoreError> {
        Ok(self.client.subscribe_log_stream(cancel).await?)
    }
}
