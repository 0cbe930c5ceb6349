use std::time::Duration;

use anyhow::Context;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite};
use url::Url;

use crate::domain::events::{ConnectionStatus, RealtimeEvent};

use super::wire::EventWire;

const REALTIME_MONITOR_STARTED: &str = "REALTIME_MONITOR_STARTED";
const REALTIME_MONITOR_STOPPED: &str = "REALTIME_MONITOR_STOPPED";
const REALTIME_MONITOR_SIGNAL_SEND_FAILED: &str = "REALTIME_MONITOR_SIGNAL_SEND_FAILED";
const REALTIME_MONITOR_CONNECT_FAILED: &str = "REALTIME_MONITOR_CONNECT_FAILED";
const REALTIME_MONITOR_READ_FAILED: &str = "REALTIME_MONITOR_READ_FAILED";

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// What the monitor reports back to the controller loop.
#[derive(Debug)]
pub enum MonitorSignal {
    Event(RealtimeEvent),
    Status(ConnectionStatus),
}

/// Background websocket listener for server push events.
///
/// Reconnects forever with bounded backoff; the polling fallback covers the
/// gaps. Dropping the handle signals the task to stop.
#[derive(Debug)]
pub struct RealtimeMonitor {
    stop_tx: Option<watch::Sender<bool>>,
}

impl RealtimeMonitor {
    pub fn start(
        base_url: &Url,
        signal_tx: mpsc::UnboundedSender<MonitorSignal>,
    ) -> anyhow::Result<Self> {
        let endpoint = websocket_endpoint(base_url)?;
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(run_monitor(endpoint, signal_tx, stop_rx));

        tracing::info!(code = REALTIME_MONITOR_STARTED, "realtime monitor started");

        Ok(Self {
            stop_tx: Some(stop_tx),
        })
    }
}

impl Drop for RealtimeMonitor {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
    }
}

/// Derives the `/ws` endpoint from the API base url, switching the scheme
/// to its websocket counterpart.
fn websocket_endpoint(base_url: &Url) -> anyhow::Result<Url> {
    let mut endpoint = base_url.join("/ws").context("joining /ws endpoint")?;
    let scheme = match base_url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => anyhow::bail!("api base_url must be http or https, got {other}"),
    };
    endpoint
        .set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("cannot derive websocket scheme for {base_url}"))?;
    Ok(endpoint)
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

async fn run_monitor(
    endpoint: Url,
    signal_tx: mpsc::UnboundedSender<MonitorSignal>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        if *stop_rx.borrow() {
            break;
        }

        if signal_tx
            .send(MonitorSignal::Status(ConnectionStatus::Connecting))
            .is_err()
        {
            break;
        }

        match connect_async(endpoint.as_str()).await {
            Ok((stream, _)) => {
                backoff = INITIAL_BACKOFF;
                if signal_tx
                    .send(MonitorSignal::Status(ConnectionStatus::Connected))
                    .is_err()
                {
                    break;
                }

                if read_until_closed(stream, &signal_tx, &mut stop_rx).await == ReadEnd::Stopped {
                    break;
                }

                if signal_tx
                    .send(MonitorSignal::Status(ConnectionStatus::Disconnected))
                    .is_err()
                {
                    break;
                }
            }
            Err(error) => {
                tracing::warn!(
                    code = REALTIME_MONITOR_CONNECT_FAILED,
                    endpoint = %endpoint,
                    error = %error,
                    "realtime connect failed; retrying"
                );
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
        backoff = next_backoff(backoff);
    }

    tracing::info!(code = REALTIME_MONITOR_STOPPED, "realtime monitor stopped");
}

#[derive(Debug, PartialEq, Eq)]
enum ReadEnd {
    Stopped,
    ConnectionLost,
}

async fn read_until_closed<S>(
    mut stream: S,
    signal_tx: &mpsc::UnboundedSender<MonitorSignal>,
    stop_rx: &mut watch::Receiver<bool>,
) -> ReadEnd
where
    S: futures::Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    return ReadEnd::Stopped;
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        match serde_json::from_str::<EventWire>(&text) {
                            Ok(wire) => {
                                if signal_tx.send(MonitorSignal::Event(wire.into_event())).is_err() {
                                    tracing::warn!(
                                        code = REALTIME_MONITOR_SIGNAL_SEND_FAILED,
                                        "realtime monitor receiver dropped"
                                    );
                                    return ReadEnd::Stopped;
                                }
                            }
                            Err(error) => {
                                tracing::debug!(error = %error, "skipping unrecognized push frame");
                            }
                        }
                    }
                    Some(Ok(tungstenite::Message::Close(_))) | None => {
                        return ReadEnd::ConnectionLost;
                    }
                    Some(Ok(_)) => {
                        // Ping/pong and binary frames carry no events.
                    }
                    Some(Err(error)) => {
                        tracing::warn!(
                            code = REALTIME_MONITOR_READ_FAILED,
                            error = %error,
                            "realtime read failed; reconnecting"
                        );
                        return ReadEnd::ConnectionLost;
                    }
                }
            }
        }
    }
}
