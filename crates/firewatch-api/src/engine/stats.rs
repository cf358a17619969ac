// Engine traffic statistics endpoint
//
// Bucketed totals for a requested window. The dashboard's range names are
// translated into the engine's own vocabulary here; the response stays
// loosely typed until the reshaper in `firewatch-core` coerces it.

use tracing::debug;

use crate::engine::client::EngineClient;
use crate::engine::models::TrafficStatsResponse;
use crate::error::Error;

/// Map a dashboard range name to the engine's range vocabulary.
///
/// `7d` → `1w`, `30d` → `month`. Everything else (including names the
/// gateway does not know) passes through unchanged.
pub fn engine_time_range(range: &str) -> &str {
    match range {
        "7d" => "1w",
        "30d" => "month",
        other => other,
    }
}

impl EngineClient {
    /// Fetch bucketed traffic statistics.
    ///
    /// `GET /v1/traffic?time_range={engine range}`
    pub async fn get_traffic_stats(&self, range: &str) -> Result<TrafficStatsResponse, Error> {
        let url = self.api_url("traffic")?;
        let engine_range = engine_time_range(range);
        debug!(range, engine_range, "fetching traffic stats");
        self.get_with_query(url, &[("time_range", engine_range)])
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn range_vocabulary() {
        assert_eq!(engine_time_range("5m"), "5m");
        assert_eq!(engine_time_range("1h"), "1h");
        assert_eq!(engine_time_range("24h"), "24h");
        assert_eq!(engine_time_range("7d"), "1w");
        assert_eq!(engine_time_range("30d"), "month");
        assert_eq!(engine_time_range("90d"), "90d");
    }
}
