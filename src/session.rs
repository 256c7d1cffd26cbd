//! Lazily created, time-bounded Proxmox session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::cluster::Connector;
use crate::error::BotError;

struct CachedSession<S> {
    session: Arc<S>,
    created_at: Instant,
}

/// Owns the single live session. A session older than `ttl` is replaced,
/// never mutated; callers holding the old `Arc` finish with it.
pub struct SessionManager<C: Connector> {
    connector: C,
    ttl: Duration,
    slot: Mutex<Option<CachedSession<C::Session>>>,
}

impl<C: Connector> SessionManager<C> {
    pub fn new(connector: C, ttl: Duration) -> Self {
        Self {
            connector,
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached session, or build a new one when it is absent or
    /// stale. A failed connect leaves the slot empty.
    pub async fn get(&self) -> Result<Arc<C::Session>, BotError> {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref()
            && cached.created_at.elapsed() < self.ttl
        {
            return Ok(cached.session.clone());
        }

        *slot = None;
        match self.connector.connect().await {
            Ok(session) => {
                let session = Arc::new(session);
                *slot = Some(CachedSession {
                    session: session.clone(),
                    created_at: Instant::now(),
                });
                Ok(session)
            }
            Err(e) => {
                tracing::error!(error = %e, "Proxmox connection error");
                Err(e)
            }
        }
    }
}
