//! Find which node hosts a guest and whether it is a VM or a container.

use crate::cluster::{ClusterApi, Connector, GuestInfo, GuestKind, RunState, Vmid};
use crate::control::ClusterControl;
use crate::error::BotError;

/// A guest together with its placement. Built fresh on every lookup since
/// placement and state change between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub node: String,
    pub kind: GuestKind,
    pub vmid: Vmid,
    pub name: String,
    pub state: RunState,
}

impl Resource {
    pub fn new(node: &str, kind: GuestKind, guest: GuestInfo) -> Self {
        Self {
            node: node.to_string(),
            kind,
            vmid: guest.vmid,
            name: guest.name,
            state: guest.state,
        }
    }
}

/// Walk the nodes in API order, trying the VM then the container status on
/// each. The first hit wins; uniqueness across nodes is not checked.
async fn scan<S: ClusterApi>(session: &S, vmid: Vmid) -> Result<Option<Resource>, BotError> {
    let nodes = session.nodes().await?;
    for node in &nodes {
        for kind in GuestKind::ALL {
            match session.guest_status(node, kind, vmid).await {
                Ok(guest) => {
                    tracing::debug!(%node, %kind, %vmid, state = %guest.state, "located guest");
                    return Ok(Some(Resource::new(node, kind, guest)));
                }
                Err(e) => tracing::trace!(%node, %kind, %vmid, error = %e, "not here"),
            }
        }
    }
    Ok(None)
}

impl<C: Connector> ClusterControl<C> {
    /// Locate `vmid` anywhere in the cluster. `Ok(None)` means no node
    /// reported it. The scan is retried as a whole.
    pub async fn find_resource(&self, vmid: Vmid) -> Result<Option<Resource>, BotError> {
        self.call(|session| async move { scan(&*session, vmid).await })
            .await
    }
}
