//! Cluster-wide status report.

use std::collections::BTreeMap;

use crate::cluster::{ClusterApi, Connector, GuestKind};
use crate::control::ClusterControl;
use crate::error::BotError;
use crate::locator::Resource;

pub const EMPTY_REPORT: &str = "No resources found.";

/// Enumerate every guest on every node. A node whose VM or container list
/// cannot be read contributes what it can; only the node list is fatal.
async fn collect<S: ClusterApi>(session: &S) -> Result<Vec<Resource>, BotError> {
    let nodes = session.nodes().await?;
    let mut all = Vec::new();
    for node in &nodes {
        for kind in GuestKind::ALL {
            match session.guests(node, kind).await {
                Ok(guests) => all.extend(
                    guests
                        .into_iter()
                        .map(|guest| Resource::new(node, kind, guest)),
                ),
                Err(e) => {
                    tracing::debug!(%node, %kind, error = %e, "skipping unreadable guest list")
                }
            }
        }
    }
    Ok(all)
}

/// Group by node (ascending) and order each group by id.
pub fn render_report(mut entries: Vec<Resource>) -> String {
    if entries.is_empty() {
        return EMPTY_REPORT.to_string();
    }
    entries.sort_by(|a, b| (a.node.as_str(), a.vmid).cmp(&(b.node.as_str(), b.vmid)));

    let mut by_node: BTreeMap<&str, Vec<&Resource>> = BTreeMap::new();
    for entry in &entries {
        by_node.entry(entry.node.as_str()).or_default().push(entry);
    }

    let mut reply = String::from("🖥️ VM/LXC STATUS\n\n");
    for (node, guests) in &by_node {
        reply.push_str(&format!("🖥️ Node: {node}\n"));
        for guest in guests {
            let icon = if guest.state.is_running() { "🟢" } else { "🔴" };
            let name = if guest.name.is_empty() {
                "unnamed"
            } else {
                guest.name.as_str()
            };
            reply.push_str(&format!(
                " {icon} {name} (ID: {}, type: {}) - {}\n",
                guest.vmid, guest.kind, guest.state
            ));
        }
        reply.push('\n');
    }
    reply.trim_end().to_string()
}

impl<C: Connector> ClusterControl<C> {
    /// Human-readable report of every guest in the cluster.
    pub async fn list_all(&self) -> String {
        match self.call(|session| async move { collect(&*session).await }).await {
            Ok(entries) => render_report(entries),
            Err(e) => format!("Error retrieving status: {e}"),
        }
    }
}
