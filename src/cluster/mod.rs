//! The remote boundary: what the bot needs from a Proxmox VE cluster.
//!
//! `ClusterApi` is one authenticated session; `Connector` builds sessions.
//! Both are generic seams so the core can run against the HTTP client in
//! `proxmox` or the in-memory cluster used by the tests.

#[cfg(test)]
pub(crate) mod fake;
pub mod proxmox;

use std::fmt;
use std::str::FromStr;

use crate::error::BotError;

/// Proxmox guest identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vmid(pub u32);

impl FromStr for Vmid {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u32>() {
            Ok(n) if n > 0 => Ok(Vmid(n)),
            _ => Err(BotError::Validation {
                message: format!("'{s}' is not a valid VM/LXC id"),
            }),
        }
    }
}

impl fmt::Display for Vmid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GuestKind {
    /// QEMU virtual machine.
    Vm,
    /// LXC container.
    Container,
}

impl GuestKind {
    /// Lookup order on each node.
    pub const ALL: [GuestKind; 2] = [GuestKind::Vm, GuestKind::Container];

    /// Path segment in the Proxmox API.
    pub fn api_segment(self) -> &'static str {
        match self {
            GuestKind::Vm => "qemu",
            GuestKind::Container => "lxc",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GuestKind::Vm => "QEMU",
            GuestKind::Container => "LXC",
        }
    }
}

impl fmt::Display for GuestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
    /// Anything else Proxmox reports (`paused`, `suspended`, ...).
    Other(String),
}

impl RunState {
    pub fn from_api(status: &str) -> Self {
        match status {
            "running" => RunState::Running,
            "stopped" => RunState::Stopped,
            other => RunState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunState::Running => "running",
            RunState::Stopped => "stopped",
            RunState::Other(s) => s,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One guest as reported by an enumeration or a status read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestInfo {
    pub vmid: Vmid,
    pub name: String,
    pub state: RunState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestAction {
    Start,
    /// Graceful shutdown through ACPI / the container's init.
    Shutdown,
    /// Immediate stop, like pulling the plug.
    Stop,
    Reboot,
}

impl GuestAction {
    pub fn api_segment(self) -> &'static str {
        match self {
            GuestAction::Start => "start",
            GuestAction::Shutdown => "shutdown",
            GuestAction::Stop => "stop",
            GuestAction::Reboot => "reboot",
        }
    }
}

#[allow(async_fn_in_trait)] // sessions are only used through generics
pub trait ClusterApi {
    /// Names of all cluster nodes, in API order.
    async fn nodes(&self) -> Result<Vec<String>, BotError>;

    async fn guests(&self, node: &str, kind: GuestKind) -> Result<Vec<GuestInfo>, BotError>;

    /// Fails when the guest does not exist on `node` as `kind`.
    async fn guest_status(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: Vmid,
    ) -> Result<GuestInfo, BotError>;

    async fn guest_action(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: Vmid,
        action: GuestAction,
    ) -> Result<(), BotError>;
}

#[allow(async_fn_in_trait)]
pub trait Connector {
    type Session: ClusterApi;

    async fn connect(&self) -> Result<Self::Session, BotError>;
}
