//! Text command parsing, caller authorization and dispatch.

use crate::cluster::{Connector, Vmid};
use crate::control::ClusterControl;

pub const HELP: &str = "AVAILABLE COMMANDS:\n\n\
/status – Status of all VM/LXC\n\
/start <vmid>\n\
/stop <vmid> [force]\n\
/forcestop <vmid>\n\
/restart <vmid>\n\
/ping";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Status,
    Start(Vmid),
    Stop { vmid: Vmid, force: bool },
    ForceStop(Vmid),
    Restart(Vmid),
    Ping,
    Help,
}

fn vmid_arg(args: &[&str], usage: &str) -> Result<Vmid, String> {
    let Some(raw) = args.first() else {
        return Err(format!("Usage: {usage}"));
    };
    raw.parse()
        .map_err(|_| format!("'{raw}' is not a valid VM/LXC id. Usage: {usage}"))
}

impl Command {
    /// Parse `/cmd args...`. The `Err` carries the reply for the operator.
    pub fn parse(text: &str) -> Result<Command, String> {
        let text = text.trim();
        let Some(body) = text.strip_prefix('/') else {
            return Err("Command not recognised. Start with '/'.".into());
        };
        let mut words = body.split_whitespace();
        let Some(word) = words.next() else {
            return Err("Empty command.".into());
        };
        // `/status@my_bot` in group chats
        let word = word.split('@').next().unwrap_or(word).to_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match word.as_str() {
            "status" | "list" => Command::Status,
            "start" => Command::Start(vmid_arg(&args, "/start <vmid>")?),
            "stop" => Command::Stop {
                vmid: vmid_arg(&args, "/stop <vmid> [force]")?,
                force: args
                    .get(1)
                    .is_some_and(|a| a.eq_ignore_ascii_case("force")),
            },
            "forcestop" => Command::ForceStop(vmid_arg(&args, "/forcestop <vmid>")?),
            "restart" => Command::Restart(vmid_arg(&args, "/restart <vmid>")?),
            "ping" => Command::Ping,
            _ => Command::Help,
        };
        Ok(command)
    }
}

/// Who sent a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// A Telegram chat id, checked against the allow-list.
    Chat(i64),
    /// The local CLI; trusted.
    Local,
}

pub struct Router<C: Connector> {
    control: ClusterControl<C>,
    authorized: Vec<i64>,
}

impl<C: Connector> Router<C> {
    pub fn new(control: ClusterControl<C>, authorized: Vec<i64>) -> Self {
        Self {
            control,
            authorized,
        }
    }

    pub fn is_authorized(&self, caller: Caller) -> bool {
        match caller {
            Caller::Local => true,
            Caller::Chat(id) => self.authorized.contains(&id),
        }
    }

    /// Handle one inbound message and produce the reply text.
    pub async fn handle(&self, caller: Caller, text: &str) -> String {
        if !self.is_authorized(caller) {
            tracing::warn!(?caller, text, "unauthorized command");
            return "Access denied.".into();
        }

        let command = match Command::parse(text) {
            Ok(command) => command,
            Err(reply) => return reply,
        };
        tracing::info!(?caller, ?command, "received command");
        self.dispatch(command).await
    }

    async fn dispatch(&self, command: Command) -> String {
        let control = &self.control;
        let outcome = match command {
            Command::Status => return control.list_all().await,
            Command::Help => return HELP.to_string(),
            Command::Start(vmid) => control.start(vmid).await,
            Command::Stop { vmid, force } => control.stop(vmid, force).await,
            Command::ForceStop(vmid) => control.force_stop(vmid).await,
            Command::Restart(vmid) => control.restart(vmid).await,
            Command::Ping => control.ping().await,
        };
        if !outcome.is_success() {
            tracing::warn!(?command, kind = ?outcome.failure_kind(), message = outcome.message(), "command failed");
        }
        outcome.to_string()
    }
}
