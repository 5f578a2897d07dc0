// Poll Broadcaster
//
// This is supposed to be very basic:
// [a] it launches and starts listening on a port
// [b] it waits to receive a websocket message: a search key id (e.g. '2f81c630')
// [c] it looks inside the queue store for the polling data of that search
// [d] it parses, packages (as JSON) and redistributes the data over the socket
// [e] when the poll disappears from the queue store, the messages stop
//
// Each upgraded socket runs its own loop; there is no fan-out across clients.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::time;
use tracing::{debug, info, trace};

use crate::error::Result;
use crate::store::QueueStore;

pub const POLLING_INTERVAL: Duration = Duration::from_millis(333);

// lower case inside the queue store, Title-cased on the wire
const POLL_KEY_SUFFIXES: [&str; 8] = [
    "launchtime",
    "active",
    "statusmessage",
    "remaining",
    "poolofwork",
    "hitcount",
    "portnumber",
    "notes",
];

/// Typed projection of the eight progress keys, rebuilt on every tick.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct ProgressRecord {
    #[serde(rename = "Launchtime")]
    pub launch_time: f64,
    #[serde(rename = "Active")]
    pub active: String,
    #[serde(rename = "Statusmessage")]
    pub status_message: String,
    #[serde(rename = "Remaining")]
    pub remaining: i64,
    #[serde(rename = "Poolofwork")]
    pub pool_of_work: i64,
    #[serde(rename = "Hitcount")]
    pub hit_count: i64,
    #[serde(rename = "Portnumber")]
    pub port_number: i64,
    #[serde(rename = "Notes")]
    pub notes: String,
}

impl ProgressRecord {
    /// Everything arrives as a string; coerce each field to its declared
    /// type, with conversion failures landing on zero or empty.
    pub fn from_values(values: &[String; 8]) -> Self {
        Self {
            launch_time: values[0].parse().unwrap_or_default(),
            active: values[1].clone(),
            status_message: values[2].clone(),
            remaining: values[3].parse().unwrap_or_default(),
            pool_of_work: values[4].parse().unwrap_or_default(),
            hit_count: values[5].parse().unwrap_or_default(),
            port_number: values[6].parse().unwrap_or_default(),
            notes: values[7].clone(),
        }
    }
}

struct PollServer {
    store: QueueStore,
    fail_threshold: u32,
    preserve_keys: bool,
}

/// Open the websocket endpoint and serve poll loops until interrupted.
pub async fn serve_polls(
    port: u16,
    fail_threshold: u32,
    preserve_keys: bool,
    store: QueueStore,
) -> Result<()> {
    let server = Arc::new(PollServer {
        store,
        fail_threshold,
        preserve_keys,
    });

    let app = Router::new().route("/", get(poll_upgrade)).with_state(server);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("WebSocket poll broadcaster listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn poll_upgrade(ws: WebSocketUpgrade, State(server): State<Arc<PollServer>>) -> Response {
    ws.on_upgrade(move |socket| poll_session(socket, server))
}

async fn poll_session(mut socket: WebSocket, server: Arc<PollServer>) {
    while let Some(Ok(message)) = socket.recv().await {
        if let Message::Text(frame) = message {
            // the id usually arrives wrapped in ASCII quotes; fix that
            let search_id = frame.trim().trim_matches('"').to_string();
            debug!("id is {}", search_id);
            if let Err(e) = poll_message_loop(&search_id, &mut socket, &server).await {
                debug!("poll loop for {} ended: {}", search_id, e);
            }
            // the poll has wound down; the session goes with it
            break;
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn poll_message_loop(
    search_id: &str,
    socket: &mut WebSocket,
    server: &PollServer,
) -> Result<()> {
    let keys = poll_keys(search_id);
    let mut missing: u32 = 0;
    let mut iterations: u64 = 0;

    loop {
        iterations += 1;
        trace!("{} - poll loop is on iteration #{}", search_id, iterations);
        time::sleep(POLLING_INTERVAL).await;

        let values = read_poll_values(&keys, &server.store).await?;
        let record = ProgressRecord::from_values(&values);
        let frame = serde_json::to_string(&record)?;
        socket.send(Message::Text(frame.into())).await?;

        // values[1] is _active: an empty read means the poll does not exist
        // yet or never existed; "no" means the search has wound down
        if values[1].is_empty() || values[1] == "no" {
            missing += 1;
            debug!(
                "{}_active = '{}'; missing is now {}",
                search_id, values[1], missing
            );
        }
        if missing >= server.fail_threshold {
            debug!(
                "breaking for {} because missing >= fail threshold: {} >= {}",
                search_id, missing, server.fail_threshold
            );
            break;
        }
    }

    if server.preserve_keys {
        debug!("retained the poll keys for {}", search_id);
    } else {
        server.store.delete_many(&keys).await?;
        debug!("deleted the poll keys for {}", search_id);
    }

    Ok(())
}

fn poll_keys(search_id: &str) -> Vec<String> {
    POLL_KEY_SUFFIXES
        .iter()
        .map(|suffix| format!("{}_{}", search_id, suffix))
        .collect()
}

async fn read_poll_values(keys: &[String], store: &QueueStore) -> Result<[String; 8]> {
    let mut values: [String; 8] = Default::default();
    for (i, key) in keys.iter().enumerate() {
        values[i] = store.get_text(key).await?.unwrap_or_default();
        trace!("{} = {}", key, values[i]);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_projection_coerces_failures_to_zero() {
        let values = [
            "1627327896.2841927".to_string(),
            "yes".to_string(),
            "Preliminary cleanups complete".to_string(),
            "17".to_string(),
            "20".to_string(),
            "not-a-number".to_string(),
            String::new(),
            String::new(),
        ];
        let record = ProgressRecord::from_values(&values);
        assert!((record.launch_time - 1627327896.2841927).abs() < f64::EPSILON);
        assert_eq!(record.active, "yes");
        assert_eq!(record.remaining, 17);
        assert_eq!(record.pool_of_work, 20);
        assert_eq!(record.hit_count, 0);
        assert_eq!(record.port_number, 0);
    }

    #[test]
    fn test_absent_keys_project_to_an_empty_record() {
        let record = ProgressRecord::from_values(&Default::default());
        assert_eq!(record, ProgressRecord::default());
    }

    #[test]
    fn test_record_serializes_numbers_as_numbers() {
        let record = ProgressRecord {
            launch_time: 1.5,
            active: "yes".to_string(),
            remaining: 17,
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"Launchtime\":1.5"));
        assert!(json.contains("\"Remaining\":17"));
        assert!(json.contains("\"Active\":\"yes\""));
        assert!(json.contains("\"Poolofwork\":0"));
    }

    #[test]
    fn test_poll_keys_cover_the_contract() {
        let keys = poll_keys("2f81c630");
        assert_eq!(keys.len(), 8);
        assert_eq!(keys[0], "2f81c630_launchtime");
        assert_eq!(keys[7], "2f81c630_notes");
    }
}
