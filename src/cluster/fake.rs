//! In-memory cluster for unit tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use super::{ClusterApi, Connector, GuestAction, GuestInfo, GuestKind, RunState, Vmid};
use crate::error::BotError;

#[derive(Default)]
struct State {
    nodes: Vec<String>,
    guests: BTreeMap<(String, GuestKind), Vec<GuestInfo>>,
    broken_lists: HashSet<(String, GuestKind)>,
    node_list_failures: u32,
    node_list_calls: u32,
    connect_failures: u32,
    sessions: u32,
    /// When false, actions are recorded but guests keep their state.
    actions_apply: bool,
    actions: Vec<(String, GuestKind, Vmid, GuestAction)>,
}

/// Shared handle: clones see the same cluster.
#[derive(Clone)]
pub struct FakeCluster {
    state: Arc<Mutex<State>>,
}

impl FakeCluster {
    pub fn new(nodes: &[&str]) -> Self {
        let state = State {
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
            actions_apply: true,
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_guest(self, node: &str, kind: GuestKind, vmid: u32, name: &str, status: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .guests
            .entry((node.to_string(), kind))
            .or_default()
            .push(GuestInfo {
                vmid: Vmid(vmid),
                name: name.to_string(),
                state: RunState::from_api(status),
            });
        self
    }

    /// Enumerating `kind` on `node` always fails.
    pub fn break_list(&self, node: &str, kind: GuestKind) {
        self.state
            .lock()
            .unwrap()
            .broken_lists
            .insert((node.to_string(), kind));
    }

    /// The next `n` node-list calls fail.
    pub fn fail_node_list(&self, n: u32) {
        self.state.lock().unwrap().node_list_failures = n;
    }

    /// The next `n` connection attempts fail.
    pub fn fail_connect(&self, n: u32) {
        self.state.lock().unwrap().connect_failures = n;
    }

    pub fn freeze_actions(&self) {
        self.state.lock().unwrap().actions_apply = false;
    }

    pub fn actions(&self) -> Vec<(String, GuestKind, Vmid, GuestAction)> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn sessions_created(&self) -> u32 {
        self.state.lock().unwrap().sessions
    }

    pub fn node_list_calls(&self) -> u32 {
        self.state.lock().unwrap().node_list_calls
    }
}

pub struct FakeSession {
    /// Sequence number of this session, starting at 1.
    pub id: u32,
    state: Arc<Mutex<State>>,
}

impl Connector for FakeCluster {
    type Session = FakeSession;

    async fn connect(&self) -> Result<FakeSession, BotError> {
        let mut state = self.state.lock().unwrap();
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(BotError::Connection {
                message: "connection refused".into(),
                hint: "fake cluster".into(),
            });
        }
        state.sessions += 1;
        Ok(FakeSession {
            id: state.sessions,
            state: self.state.clone(),
        })
    }
}

impl ClusterApi for FakeSession {
    async fn nodes(&self) -> Result<Vec<String>, BotError> {
        let mut state = self.state.lock().unwrap();
        state.node_list_calls += 1;
        if state.node_list_failures > 0 {
            state.node_list_failures -= 1;
            return Err(BotError::remote("GET /nodes: HTTP 595 no route to host"));
        }
        Ok(state.nodes.clone())
    }

    async fn guests(&self, node: &str, kind: GuestKind) -> Result<Vec<GuestInfo>, BotError> {
        let state = self.state.lock().unwrap();
        let key = (node.to_string(), kind);
        if state.broken_lists.contains(&key) {
            return Err(BotError::remote(format!("listing {kind} on {node} failed")));
        }
        Ok(state.guests.get(&key).cloned().unwrap_or_default())
    }

    async fn guest_status(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: Vmid,
    ) -> Result<GuestInfo, BotError> {
        let state = self.state.lock().unwrap();
        state
            .guests
            .get(&(node.to_string(), kind))
            .and_then(|list| list.iter().find(|g| g.vmid == vmid))
            .cloned()
            .ok_or_else(|| BotError::remote(format!("HTTP 500: {kind} {vmid} does not exist")))
    }

    async fn guest_action(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: Vmid,
        action: GuestAction,
    ) -> Result<(), BotError> {
        let mut state = self.state.lock().unwrap();
        state.actions.push((node.to_string(), kind, vmid, action));
        if !state.actions_apply {
            return Ok(());
        }
        let guest = state
            .guests
            .get_mut(&(node.to_string(), kind))
            .and_then(|list| list.iter_mut().find(|g| g.vmid == vmid))
            .ok_or_else(|| BotError::remote(format!("HTTP 500: {kind} {vmid} does not exist")))?;
        guest.state = match action {
            GuestAction::Start | GuestAction::Reboot => RunState::Running,
            GuestAction::Shutdown | GuestAction::Stop => RunState::Stopped,
        };
        Ok(())
    }
}
