//! Online/offline signal
//!
//! The resolver consults the latest value before attempting remote
//! generation; the daemon forwards changes to the orchestrator so front-ends
//! can render them.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Timeout for a single probe request
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Read side of the connectivity signal
#[derive(Debug, Clone)]
pub struct Connectivity {
    rx: watch::Receiver<bool>,
}

impl Connectivity {
    /// A signal that never changes
    #[must_use]
    pub fn fixed(online: bool) -> Self {
        let (tx, rx) = watch::channel(online);
        // Receivers keep returning the last value after the sender is gone
        drop(tx);
        Self { rx }
    }

    /// A signal driven by the returned sender
    #[must_use]
    pub fn manual(online: bool) -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(online);
        (tx, Self { rx })
    }

    /// Latest known state
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the next change and return the new state
    ///
    /// Returns `None` once the signal can no longer change.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

/// Periodically probes a URL and publishes reachability
pub struct ConnectivityMonitor;

impl ConnectivityMonitor {
    /// Probe `probe_url` once and return a signal fixed at the result
    ///
    /// Used by one-shot commands that never run the probe loop.
    pub async fn probe_once(probe_url: &str) -> Connectivity {
        let online = match probe_client() {
            Ok(client) => probe(&client, probe_url).await,
            Err(e) => {
                tracing::error!(error = %e, "failed to build connectivity probe client");
                false
            }
        };

        if !online {
            tracing::warn!(url = %probe_url, "network offline");
        }
        Connectivity::fixed(online)
    }

    /// Spawn the probe loop
    ///
    /// The first probe runs immediately; the signal starts out online.
    #[must_use]
    pub fn spawn(probe_url: String, interval: Duration) -> (Connectivity, JoinHandle<()>) {
        let (tx, connectivity) = Connectivity::manual(true);

        let handle = tokio::spawn(async move {
            let client = match probe_client() {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(error = %e, "failed to build connectivity probe client");
                    return;
                }
            };

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let online = probe(&client, &probe_url).await;
                let changed = tx.send_if_modified(|current| {
                    if *current == online {
                        false
                    } else {
                        *current = online;
                        true
                    }
                });

                if changed {
                    if online {
                        tracing::info!("network online");
                    } else {
                        tracing::warn!(url = %probe_url, "network offline");
                    }
                }

                if tx.is_closed() {
                    tracing::debug!("connectivity monitor stopped");
                    break;
                }
            }
        });

        (connectivity, handle)
    }
}

fn probe_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()
}

async fn probe(client: &reqwest::Client, url: &str) -> bool {
    client.head(url).send().await.is_ok()
}
