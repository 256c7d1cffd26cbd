//! Entry point of the cluster-interaction core.
//!
//! `ClusterControl` ties the session cache, the retry policy and the stop
//! settle period together. The operations themselves live in `locator`,
//! `lifecycle` and `status`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cluster::Connector;
use crate::cluster::proxmox::ProxmoxConnector;
use crate::config::Config;
use crate::error::BotError;
use crate::retry::RetryPolicy;
use crate::session::SessionManager;

pub struct ClusterControl<C: Connector> {
    sessions: SessionManager<C>,
    retry: RetryPolicy,
    pub(crate) settle: Duration,
}

impl ClusterControl<ProxmoxConnector> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ProxmoxConnector::new(config.proxmox.clone()),
            config.proxmox.session_ttl(),
            RetryPolicy::from_config(&config.retry),
            Duration::from_secs(config.lifecycle.settle_s),
        )
    }
}

impl<C: Connector> ClusterControl<C> {
    pub fn new(connector: C, session_ttl: Duration, retry: RetryPolicy, settle: Duration) -> Self {
        Self {
            sessions: SessionManager::new(connector, session_ttl),
            retry,
            settle,
        }
    }

    /// Run `op` against the current session under the retry policy.
    ///
    /// The session is fetched again on every attempt so a retry loop that
    /// outlives the session window picks up the replacement.
    pub(crate) async fn call<T, F, Fut>(&self, op: F) -> Result<T, BotError>
    where
        F: Fn(Arc<C::Session>) -> Fut,
        Fut: Future<Output = Result<T, BotError>>,
    {
        let op = &op;
        let sessions = &self.sessions;
        self.retry
            .run(|| async move {
                let session = sessions.get().await?;
                op(session).await
            })
            .await
    }
}
