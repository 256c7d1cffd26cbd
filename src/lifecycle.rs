//! Start, stop, restart and ping. Every operation returns an `Outcome`;
//! errors never escape to the router.

use crate::cluster::{ClusterApi, Connector, GuestAction, RunState, Vmid};
use crate::control::ClusterControl;
use crate::error::BotError;
use crate::locator::Resource;
use crate::outcome::{FailureKind, Outcome};

impl<C: Connector> ClusterControl<C> {
    async fn act(&self, res: &Resource, action: GuestAction) -> Result<(), BotError> {
        let (node, kind, vmid) = (res.node.as_str(), res.kind, res.vmid);
        tracing::info!(%node, %kind, %vmid, action = action.api_segment(), "issuing action");
        self.call(|session| async move { session.guest_action(node, kind, vmid, action).await })
            .await
    }

    /// Start a guest. A running guest is left alone. Boot is not verified.
    pub async fn start(&self, vmid: Vmid) -> Outcome {
        self.try_start(vmid).await.unwrap_or_else(Outcome::error)
    }

    async fn try_start(&self, vmid: Vmid) -> Result<Outcome, BotError> {
        let Some(res) = self.find_resource(vmid).await? else {
            return Ok(Outcome::not_found(vmid));
        };
        if res.state.is_running() {
            return Ok(Outcome::Success(format!("{} {vmid} already running", res.kind)));
        }
        self.act(&res, GuestAction::Start).await?;
        Ok(Outcome::Success(format!(
            "Started {} {vmid} on node {}",
            res.kind, res.node
        )))
    }

    /// Stop a guest and confirm it after the settle period.
    ///
    /// `force = false` asks the guest to shut down; `force = true` stops it
    /// immediately.
    pub async fn stop(&self, vmid: Vmid, force: bool) -> Outcome {
        self.try_stop(vmid, force)
            .await
            .unwrap_or_else(Outcome::error)
    }

    pub async fn force_stop(&self, vmid: Vmid) -> Outcome {
        self.stop(vmid, true).await.with_suffix(" (forced)")
    }

    async fn try_stop(&self, vmid: Vmid, force: bool) -> Result<Outcome, BotError> {
        let Some(res) = self.find_resource(vmid).await? else {
            return Ok(Outcome::not_found(vmid));
        };
        if res.state == RunState::Stopped {
            return Ok(Outcome::Success(format!("{} {vmid} already stopped", res.kind)));
        }

        let action = if force {
            GuestAction::Stop
        } else {
            GuestAction::Shutdown
        };
        self.act(&res, action).await?;

        tokio::time::sleep(self.settle).await;
        let after = self.find_resource(vmid).await?;

        match after {
            Some(now) if now.state == RunState::Stopped => Ok(Outcome::Success(format!(
                "{} {vmid} stopped on node {}",
                res.kind, res.node
            ))),
            other => {
                tracing::warn!(
                    %vmid,
                    state = other.as_ref().map(|r| r.state.as_str()).unwrap_or("missing"),
                    "stop not confirmed after settle period"
                );
                Ok(Outcome::Failure {
                    kind: FailureKind::Unverified,
                    message: format!("{} {vmid} may still be running", res.kind),
                })
            }
        }
    }

    /// Reboot a guest regardless of its current state. Not verified.
    pub async fn restart(&self, vmid: Vmid) -> Outcome {
        self.try_restart(vmid).await.unwrap_or_else(Outcome::error)
    }

    async fn try_restart(&self, vmid: Vmid) -> Result<Outcome, BotError> {
        let Some(res) = self.find_resource(vmid).await? else {
            return Ok(Outcome::not_found(vmid));
        };
        self.act(&res, GuestAction::Reboot).await?;
        Ok(Outcome::Success(format!(
            "Restarted {} {vmid} on node {}",
            res.kind, res.node
        )))
    }

    /// Check that the API answers by listing the nodes.
    pub async fn ping(&self) -> Outcome {
        match self.call(|session| async move { session.nodes().await }).await {
            Ok(nodes) => Outcome::Success(format!(
                "Connection successful - Found {} nodes",
                nodes.len()
            )),
            Err(e) => Outcome::Failure {
                kind: FailureKind::Error,
                message: format!("Connection failed: {e}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cluster::GuestKind;
    use crate::cluster::fake::FakeCluster;
    use crate::control::tests::{control, two_node_cluster};

    #[tokio::test]
    async fn start_running_guest_is_noop() {
        let cluster = two_node_cluster();
        let outcome = control(&cluster).start(Vmid(100)).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.message(), "QEMU 100 already running");
        assert!(cluster.actions().is_empty());
    }

    #[tokio::test]
    async fn start_stopped_guest() {
        let cluster = two_node_cluster();
        let outcome = control(&cluster).start(Vmid(105)).await;

        assert_eq!(outcome.message(), "Started LXC 105 on node pve2");
        assert_eq!(
            cluster.actions(),
            [("pve2".to_string(), GuestKind::Container, Vmid(105), GuestAction::Start)]
        );
    }

    #[tokio::test]
    async fn start_unknown_guest() {
        let cluster = two_node_cluster();
        let outcome = control(&cluster).start(Vmid(404)).await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::NotFound));
        assert!(outcome.message().contains("not found"));
    }

    #[tokio::test]
    async fn stop_stopped_guest_is_noop() {
        let cluster = two_node_cluster();
        let outcome = control(&cluster).stop(Vmid(101), false).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.message(), "QEMU 101 already stopped");
        assert!(cluster.actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_settle_and_confirms() {
        let cluster = two_node_cluster();
        let start = tokio::time::Instant::now();
        let outcome = control(&cluster).stop(Vmid(100), false).await;

        assert!(outcome.is_success(), "{outcome}");
        assert_eq!(outcome.message(), "QEMU 100 stopped on node pve1");
        assert!(start.elapsed() >= Duration::from_secs(8));
        assert_eq!(cluster.actions()[0].3, GuestAction::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_unconfirmed_is_soft_failure() {
        let cluster = two_node_cluster();
        cluster.freeze_actions();
        let outcome = control(&cluster).stop(Vmid(100), false).await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::Unverified));
        assert_eq!(outcome.message(), "QEMU 100 may still be running");
        // issued once, not retried after the failed check
        assert_eq!(cluster.actions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn force_stop_uses_hard_stop_and_marks_message() {
        let cluster = two_node_cluster();
        let outcome = control(&cluster).force_stop(Vmid(100)).await;

        assert_eq!(outcome.message(), "QEMU 100 stopped on node pve1 (forced)");
        assert_eq!(cluster.actions()[0].3, GuestAction::Stop);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_paused_guest_is_not_short_circuited() {
        let cluster =
            FakeCluster::new(&["pve1"]).with_guest("pve1", GuestKind::Vm, 300, "held", "paused");
        let outcome = control(&cluster).stop(Vmid(300), true).await;
        assert!(outcome.is_success());
        assert_eq!(cluster.actions().len(), 1);
    }

    #[tokio::test]
    async fn restart_always_issues_reboot() {
        let cluster = two_node_cluster();
        let outcome = control(&cluster).restart(Vmid(101)).await;

        assert_eq!(outcome.message(), "Restarted QEMU 101 on node pve1");
        assert_eq!(cluster.actions()[0].3, GuestAction::Reboot);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_failure_becomes_error_outcome() {
        let cluster = two_node_cluster();
        cluster.fail_node_list(u32::MAX);
        let outcome = control(&cluster).restart(Vmid(101)).await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::Error));
        assert!(outcome.message().starts_with("Error: "));
        assert!(cluster.actions().is_empty());
    }

    #[tokio::test]
    async fn ping_counts_nodes() {
        let cluster = two_node_cluster();
        let outcome = control(&cluster).ping().await;
        assert_eq!(outcome.message(), "Connection successful - Found 2 nodes");
    }

    #[tokio::test(start_paused = true)]
    async fn ping_reports_connection_failure() {
        let cluster = two_node_cluster();
        cluster.fail_connect(u32::MAX);
        let outcome = control(&cluster).ping().await;
        assert!(!outcome.is_success());
        assert!(outcome.message().starts_with("Connection failed: "));
    }
}
