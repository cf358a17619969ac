// Engine rule endpoints
//
// Thin CRUD pass-through. The engine owns rule identity and validation;
// its rejection messages come back untouched as `Error::Rejected`.

use tracing::debug;

use crate::engine::client::EngineClient;
use crate::engine::models::{DeleteAck, EngineRule, RuleEnvelope, RuleList, RulePatch, RuleSpec};
use crate::error::Error;

impl EngineClient {
    /// List all rules.
    ///
    /// `GET /v1/rules`
    pub async fn list_rules(&self) -> Result<Vec<EngineRule>, Error> {
        let url = self.api_url("rules")?;
        let list: RuleList = self.get(url).await?;
        debug!(count = list.rules.len(), "listed rules");
        Ok(list.rules)
    }

    /// Create a rule. The returned rule carries the engine-assigned `id`.
    ///
    /// `POST /v1/rules` with `{ "rule": { ... } }`
    pub async fn create_rule(&self, spec: &RuleSpec) -> Result<EngineRule, Error> {
        let url = self.api_url("rules")?;
        let created: RuleEnvelope<EngineRule> =
            self.post(url, &RuleEnvelope { rule: spec }).await?;
        debug!(id = created.rule.id, "rule created");
        Ok(created.rule)
    }

    /// Apply a partial update to a rule.
    ///
    /// `PUT /v1/rules/{id}` with `{ "rule": { ...changed fields } }`
    pub async fn update_rule(&self, id: u64, patch: &RulePatch) -> Result<EngineRule, Error> {
        let url = self.api_url(&format!("rules/{id}"))?;
        let updated: RuleEnvelope<EngineRule> =
            self.put(url, &RuleEnvelope { rule: patch }).await?;
        Ok(updated.rule)
    }

    /// Delete a rule.
    ///
    /// `DELETE /v1/rules/{id}`. Some engine builds answer `200` with
    /// `{ "success": false }` for an unknown id instead of `404`; both
    /// come back as [`Error::NotFound`].
    pub async fn delete_rule(&self, id: u64) -> Result<(), Error> {
        let url = self.api_url(&format!("rules/{id}"))?;
        let path = url.path().to_owned();
        let ack: DeleteAck = self.delete(url).await?;
        if ack.success {
            debug!(id, "rule deleted");
            Ok(())
        } else {
            Err(Error::NotFound {
                path,
                message: format!("rule {id} does not exist"),
            })
        }
    }
}
