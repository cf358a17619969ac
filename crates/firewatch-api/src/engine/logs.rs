// Engine log-stream subscription

use tokio_util::sync::CancellationToken;

use crate::engine::client::EngineClient;
use crate::error::Error;
use crate::log_stream::LogStream;

impl EngineClient {
    /// Open a long-lived log subscription.
    ///
    /// WebSocket `ws(s)://{base}/v1/logs/stream`. The handshake is awaited
    /// under the transport's TLS mode and timeout, so an unreachable or
    /// silent engine fails here rather than later. The returned
    /// stream stays open until `cancel` fires, the handle is dropped, or the
    /// engine ends it.
    pub async fn subscribe_log_stream(&self, cancel: CancellationToken) -> Result<LogStream, Error> {
        let url = self.stream_url("logs/stream")?;
        LogStream::connect(&url, self.transport(), cancel).await
    }
}
