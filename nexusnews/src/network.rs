//! Connectivity state shared between the platform callback (single writer)
//! and any number of requesters reading snapshots.

use futures::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkType {
    Wifi,
    Cellular,
    Ethernet,
    Other,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connectivity {
    pub connected: bool,
    pub network_type: NetworkType,
}

impl Connectivity {
    fn offline() -> Self {
        Self {
            connected: false,
            network_type: NetworkType::None,
        }
    }
}

/// Cheap to clone; all clones observe the same state.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    state: Arc<watch::Sender<Connectivity>>,
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NetworkMonitor {
    pub fn new(connected: bool) -> Self {
        let initial = if connected {
            Connectivity {
                connected: true,
                network_type: NetworkType::Other,
            }
        } else {
            Connectivity::offline()
        };
        let (tx, _rx) = watch::channel(initial);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Current connectivity, read synchronously.
    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    pub fn network_type(&self) -> NetworkType {
        self.state.borrow().network_type
    }

    pub fn snapshot(&self) -> Connectivity {
        *self.state.borrow()
    }

    /// Report a connectivity change. Identical reports do not notify subscribers.
    pub fn update(&self, connected: bool, network_type: NetworkType) {
        let next = if connected {
            Connectivity {
                connected,
                network_type,
            }
        } else {
            Connectivity::offline()
        };
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            tracing::debug!(connected, ?network_type, "connectivity changed");
        }
    }

    pub fn set_connected(&self, connected: bool) {
        let network_type = if connected {
            match self.network_type() {
                NetworkType::None => NetworkType::Other,
                other => other,
            }
        } else {
            NetworkType::None
        };
        self.update(connected, network_type);
    }

    /// Stream of connectivity. Yields the current value immediately, then
    /// every transition; consecutive identical values are never repeated.
    pub fn changes(&self) -> impl Stream<Item = bool> + Send + 'static {
        let mut rx = self.state.subscribe();
        async_stream::stream! {
            let mut last = rx.borrow_and_update().connected;
            yield last;
            while rx.changed().await.is_ok() {
                let now = rx.borrow_and_update().connected;
                if now != last {
                    last = now;
                    yield now;
                }
            }
        }
    }

    /// One-shot TCP reachability check that feeds the monitor.
    pub async fn check_reachable<A: ToSocketAddrs>(&self, addr: A, timeout: Duration) -> bool {
        let reachable = matches!(
            tokio::time::timeout(timeout, TcpStream::connect(addr)).await,
            Ok(Ok(_))
        );
        if !reachable {
            tracing::warn!("connectivity check failed");
        }
        self.set_connected(reachable);
        reachable
    }
}
