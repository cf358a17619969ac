// Engine status endpoint

use crate::engine::client::EngineClient;
use crate::engine::models::EngineStatus;
use crate::error::Error;

impl EngineClient {
    /// Fetch the engine health snapshot.
    ///
    /// `GET /v1/status`
    pub async fn get_status(&self) -> Result<EngineStatus, Error> {
        let url = self.api_url("status")?;
        self.get(url).await
    }
}
