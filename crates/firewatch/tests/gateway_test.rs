// End-to-end tests for the gateway: an in-process server on port 0 backed
// by the in-memory engine, driven by reqwest and tokio-tungstenite.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use firewatch::{ServerConfig, ServerHandle, SessionGate};
use firewatch_core::memory::{LogFeed, MemoryEngine};
use firewatch_core::{Engine, Rule, RuleAction, TimeRange};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const ALLOW_LINE: &str = "TRAFFIC ALLOW | Proto: 6 | 10.0.0.1:1234 -> 10.0.0.2:80";
const WAIT: Duration = Duration::from_secs(2);

// ── Helpers ─────────────────────────────────────────────────────────

struct Gateway {
    handle: ServerHandle,
    engine: Arc<MemoryEngine>,
    http: reqwest::Client,
}

impl Gateway {
    async fn start(engine: MemoryEngine, gate: SessionGate) -> Self {
        let engine = Arc::new(engine);
        let config = ServerConfig {
            listen: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        };
        let handle = firewatch::start(config, Arc::clone(&engine) as Arc<dyn Engine>, gate)
            .await
            .unwrap();
        Self {
            handle,
            engine,
            http: reqwest::Client::new(),
        }
    }

    async fn open() -> Self {
        Self::start(MemoryEngine::new(), SessionGate::open()).await
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.handle.addr())
    }

    fn ws_url(&self, query: &str) -> String {
        format!("ws://{}/ws{query}", self.handle.addr())
    }

    async fn connect(&self) -> WsClient {
        let (ws, _) = tokio_tungstenite::connect_async(self.ws_url("")).await.unwrap();
        ws
    }

    /// Wait until `n` engine subscriptions exist and return the newest.
    async fn feed(&self, n: usize) -> LogFeed {
        timeout(WAIT, async {
            loop {
                let feeds = self.engine.feeds().await;
                if feeds.len() >= n {
                    return feeds.into_iter().nth(n - 1).unwrap();
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap()
    }

    async fn wait_for_sessions(&self, expected: usize) {
        timeout(WAIT, async {
            while self.handle.sessions().count() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }
}

/// Next JSON text frame, skipping heartbeats.
async fn next_json(ws: &mut WsClient) -> Value {
    loop {
        let frame = timeout(WAIT, ws.next()).await.unwrap().unwrap().unwrap();
        match frame {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Read until the server closes the connection.
async fn expect_closed(ws: &mut WsClient) {
    timeout(WAIT, async {
        loop {
            match ws.next().await {
                None | Some(Err(_) | Ok(Message::Close(_))) => return,
                Some(Ok(Message::Text(text))) => panic!("unexpected message: {text}"),
                Some(Ok(_)) => {}
            }
        }
    })
    .await
    .unwrap();
}

fn seeded_rule() -> Rule {
    Rule {
        id: 7,
        name: "Allow DNS".into(),
        source_ip: "any".into(),
        dest_ip: "10.0.0.53".into(),
        source_port: 0,
        dest_port: 53,
        protocol: "UDP".into(),
        action: RuleAction::Allow,
    }
}

// ── REST ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_is_open_and_counts_sessions() {
    let gw = Gateway::start(
        MemoryEngine::new(),
        SessionGate::new(Some(SecretString::from("letmein"))),
    )
    .await;

    let body: Value = gw
        .http
        .get(gw.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "status": "ok", "sessions": 0 }));
}

#[tokio::test]
async fn test_rule_lifecycle() {
    let gw = Gateway::start(
        MemoryEngine::new().with_rules([seeded_rule()]),
        SessionGate::open(),
    )
    .await;

    let resp = gw
        .http
        .post(gw.url("/api/rules"))
        .json(&json!({
            "id": 999,
            "name": "Block SSH",
            "sourceIp": "any",
            "destIp": "10.0.0.5",
            "destPort": 22,
            "protocol": "TCP",
            "action": "Deny"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["id"], 8, "engine assigns ids, client id ignored");
    assert_eq!(created["destPort"], 22);

    let rules: Vec<Value> = gw
        .http
        .get(gw.url("/api/rules"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rules.len(), 2);

    let updated: Value = gw
        .http
        .put(gw.url("/api/rules/8"))
        .json(&json!({ "action": "ALLOW", "destPort": 2222 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["action"], "Allow");
    assert_eq!(updated["destPort"], 2222);
    assert_eq!(updated["name"], "Block SSH");

    let resp = gw.http.delete(gw.url("/api/rules/8")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "success": true }));
}

#[tokio::test]
async fn test_delete_unknown_rule_is_404() {
    let gw = Gateway::open().await;

    let resp = gw.http.delete(gw.url("/api/rules/4242")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
    assert!(body["error"]["message"].as_str().unwrap().contains("4242"));

    let resp = gw
        .http
        .put(gw.url("/api/rules/4242"))
        .json(&json!({ "name": "ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_invalid_rule_requests_are_rejected() {
    let gw = Gateway::open().await;

    let resp = gw
        .http
        .post(gw.url("/api/rules"))
        .json(&json!({ "name": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["message"], "rule name must not be empty");

    let resp = gw
        .http
        .post(gw.url("/api/rules"))
        .json(&json!({ "destPort": 22 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400, "missing name");

    let resp = gw
        .http
        .delete(gw.url("/api/rules/not-a-number"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404, "non-numeric id names no rule");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    let resp = gw
        .http
        .put(gw.url("/api/rules/abc"))
        .json(&json!({"name": "renamed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_traffic_range_defaults_to_day() {
    let gw = Gateway::open().await;
    gw.engine
        .set_stats(
            serde_json::from_value(json!({
                "total_inbound": "1500",
                "total_outbound": 700,
                "total_blocked": 3,
                "data_points": [
                    { "timestamp": 1_700_000_000, "inbound": 10, "outbound": "4", "blocked": 1 }
                ]
            }))
            .unwrap(),
        )
        .await;

    let day: Value = gw
        .http
        .get(gw.url("/api/traffic"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(day["timePeriod"], "24h");
    assert_eq!(day["totalInbound"], 1500);
    assert_eq!(day["points"][0]["time"], "22:13");
    assert_eq!(day["points"][0]["outbound"], 4);

    let week: Value = gw
        .http
        .get(gw.url("/api/traffic?range=7d"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(week["points"][0]["time"], "14/11");

    assert_eq!(
        gw.engine.requested_ranges().await,
        vec![TimeRange::Day, TimeRange::Week]
    );
}

#[tokio::test]
async fn test_engine_unavailable_is_503() {
    let gw = Gateway::open().await;
    gw.engine.set_available(false);

    for path in ["/api/status", "/api/rules", "/api/traffic"] {
        let resp = gw.http.get(gw.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 503, "{path}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "engine_unavailable");
    }

    gw.engine.set_available(true);
    let status: Value = gw
        .http
        .get(gw.url("/api/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "running");
}

#[tokio::test]
async fn test_session_gate() {
    let gw = Gateway::start(
        MemoryEngine::new(),
        SessionGate::new(Some(SecretString::from("letmein"))),
    )
    .await;

    let resp = gw.http.get(gw.url("/api/rules")).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "unauthorized");

    let resp = gw
        .http
        .get(gw.url("/api/rules"))
        .bearer_auth("letmein")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    assert!(
        tokio_tungstenite::connect_async(gw.ws_url(""))
            .await
            .is_err()
    );
    assert_eq!(gw.engine.feeds().await.len(), 0);

    let (mut ws, _) = tokio_tungstenite::connect_async(gw.ws_url("?token=letmein"))
        .await
        .unwrap();
    assert_eq!(next_json(&mut ws).await["type"], "connection");
}

// ── WebSocket ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_stream_acknowledges_then_relays_traffic() {
    let gw = Gateway::open().await;
    let mut ws = gw.connect().await;

    let ack = next_json(&mut ws).await;
    assert_eq!(ack["type"], "connection");
    assert_eq!(ack["status"], "connected");
    assert!(ack["sessionId"].as_str().is_some_and(|id| id.len() == 36));

    let feed = gw.feed(1).await;
    assert!(feed.send_line("engine heartbeat ok").await);
    assert!(feed.send_line(ALLOW_LINE).await);
    assert!(
        feed.send_line("TRAFFIC DENY | Proto: ICMP | 1.1.1.1:0 -> 2.2.2.2:0 tv_sec: 1700000000")
            .await
    );

    let first = next_json(&mut ws).await;
    assert_eq!(first["type"], "log_entry");
    assert_eq!(
        first["payload"]["message"], ALLOW_LINE,
        "non-traffic line must be skipped"
    );
    assert_eq!(first["payload"]["action"], "Allowed");
    assert_eq!(first["payload"]["protocol"], "TCP");
    assert_eq!(first["payload"]["sourceIp"], "10.0.0.1");
    assert_eq!(first["payload"]["destPort"], 80);

    let second = next_json(&mut ws).await;
    assert_eq!(second["payload"]["action"], "Blocked");
    assert_eq!(second["payload"]["protocol"], "ICMP");
    assert_eq!(second["payload"]["timestamp"], "2023-11-14T22:13:20.000Z");
}

#[tokio::test]
async fn test_subscribe_and_ping_replies() {
    let gw = Gateway::open().await;
    let mut ws = gw.connect().await;
    assert_eq!(next_json(&mut ws).await["type"], "connection");

    ws.send(Message::Text(r#"{"type":"subscribe"}"#.into()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut ws).await, json!({ "type": "subscribed" }));

    ws.send(Message::Text("not json".into())).await.unwrap();
    ws.send(Message::Text(r#"{"type":"reboot"}"#.into()))
        .await
        .unwrap();
    ws.send(Message::Text(r#"{"type":"ping"}"#.into()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut ws).await, json!({ "type": "pong" }));
}

#[tokio::test]
async fn test_disconnect_cancels_engine_subscription() {
    let gw = Gateway::open().await;
    let mut ws = gw.connect().await;
    next_json(&mut ws).await;
    let feed = gw.feed(1).await;
    gw.wait_for_sessions(1).await;

    ws.close(None).await.unwrap();
    drop(ws);

    timeout(WAIT, feed.cancelled()).await.unwrap();
    gw.wait_for_sessions(0).await;
    assert_eq!(gw.engine.open_subscriptions().await, 0);
}

#[tokio::test]
async fn test_clients_are_isolated() {
    let gw = Gateway::open().await;
    let mut a = gw.connect().await;
    next_json(&mut a).await;
    let feed_a = gw.feed(1).await;
    let mut b = gw.connect().await;
    next_json(&mut b).await;
    let feed_b = gw.feed(2).await;

    feed_b
        .send_line("TRAFFIC DENY | Proto: 17 | 192.168.1.9:5353 -> 224.0.0.251:5353")
        .await;
    feed_a.send_line(ALLOW_LINE).await;

    assert_eq!(next_json(&mut a).await["payload"]["message"], ALLOW_LINE);
    assert_eq!(next_json(&mut b).await["payload"]["protocol"], "UDP");

    drop(a);
    timeout(WAIT, feed_a.cancelled()).await.unwrap();
    assert!(!feed_b.is_cancelled());
}

#[tokio::test]
async fn test_engine_unavailable_on_connect() {
    let gw = Gateway::open().await;
    gw.engine.set_available(false);

    let mut ws = gw.connect().await;
    assert_eq!(next_json(&mut ws).await["type"], "connection");
    let err = next_json(&mut ws).await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["message"], "firewall engine unavailable");
    expect_closed(&mut ws).await;
    gw.wait_for_sessions(0).await;
}

#[tokio::test]
async fn test_client_gone_before_open_failure_is_unregistered() {
    let gw = Gateway::open().await;
    gw.engine.set_available(false);

    for _ in 0..4 {
        let mut ws = gw.connect().await;
        assert_eq!(next_json(&mut ws).await["type"], "connection");
        drop(ws);
    }
    gw.wait_for_sessions(0).await;

    let resp = gw.http.get(gw.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_engine_failure_closes_client() {
    let gw = Gateway::open().await;
    let mut ws = gw.connect().await;
    next_json(&mut ws).await;

    gw.feed(1).await.fail("engine restarted").await;
    expect_closed(&mut ws).await;
    gw.wait_for_sessions(0).await;
}

#[tokio::test]
async fn test_shutdown_cancels_every_session() {
    let gw = Gateway::open().await;
    let mut clients = Vec::new();
    for n in 1..=3 {
        let mut ws = gw.connect().await;
        next_json(&mut ws).await;
        gw.feed(n).await;
        clients.push(ws);
    }

    let feeds = gw.engine.feeds().await;
    let Gateway { handle, .. } = gw;
    timeout(Duration::from_secs(5), handle.shutdown())
        .await
        .unwrap()
        .unwrap();

    for feed in &feeds {
        assert!(feed.is_cancelled());
    }
    for ws in &mut clients {
        expect_closed(ws).await;
    }
}
