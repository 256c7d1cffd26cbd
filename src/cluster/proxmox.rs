//! Proxmox VE HTTP client authenticated with an API token.

use facet::Facet;
use facet_value::Value;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use super::{ClusterApi, Connector, GuestAction, GuestInfo, GuestKind, RunState, Vmid};
use crate::config::ProxmoxConfig;
use crate::error::BotError;

const DEFAULT_PORT: u16 = 8006;

// ── wire types ───────────────────────────────────────────

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct NodeList {
    #[facet(default)]
    data: Vec<NodeEntry>,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct NodeEntry {
    #[facet(default)]
    node: String,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct GuestList {
    #[facet(default)]
    data: Vec<GuestEntry>,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct GuestReply {
    data: Option<GuestEntry>,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct GuestEntry {
    /// A number for VMs; some PVE versions send a string for containers.
    vmid: Option<Value>,
    #[facet(default)]
    name: String,
    #[facet(default)]
    status: String,
}

impl GuestEntry {
    fn vmid(&self) -> Option<Vmid> {
        let raw = self.vmid.as_ref()?;
        if let Some(n) = raw.as_number() {
            return n.to_u64().and_then(|n| u32::try_from(n).ok()).map(Vmid);
        }
        raw.as_string()?.as_str().parse().ok()
    }

    fn into_info(self, vmid: Vmid) -> GuestInfo {
        GuestInfo {
            vmid,
            name: self.name,
            state: RunState::from_api(&self.status),
        }
    }
}

// ── connector ────────────────────────────────────────────

/// Base URL of the JSON API for a configured host.
///
/// `pve` → `https://pve:8006/api2/json`; an explicit port or scheme is kept.
pub fn api_base(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    let (scheme, authority) = match host.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("https", host),
    };
    let has_port = match authority.rsplit_once(':') {
        Some((_, port)) => !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    };
    if has_port {
        format!("{scheme}://{authority}/api2/json")
    } else {
        format!("{scheme}://{authority}:{DEFAULT_PORT}/api2/json")
    }
}

pub struct ProxmoxConnector {
    config: ProxmoxConfig,
}

impl ProxmoxConnector {
    pub fn new(config: ProxmoxConfig) -> Self {
        Self { config }
    }
}

impl Connector for ProxmoxConnector {
    type Session = ProxmoxSession;

    async fn connect(&self) -> Result<ProxmoxSession, BotError> {
        let cfg = &self.config;
        let base = api_base(&cfg.host);
        tracing::info!(%base, user = %cfg.user, "creating new Proxmox session");

        let token = format!(
            "PVEAPIToken={}!{}={}",
            cfg.user, cfg.token_name, cfg.token_value
        );
        let mut auth = HeaderValue::from_str(&token).map_err(|e| BotError::Connection {
            message: format!("invalid API token header: {e}"),
            hint: "token name and value must be plain ASCII".into(),
        })?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(cfg.timeout())
            .danger_accept_invalid_certs(!cfg.verify_tls)
            .build()
            .map_err(|e| BotError::Connection {
                message: format!("failed to build HTTP client: {e}"),
                hint: format!("check the TLS settings for {}", cfg.host),
            })?;

        Ok(ProxmoxSession { http, base })
    }
}

// ── session ──────────────────────────────────────────────

pub struct ProxmoxSession {
    http: reqwest::Client,
    base: String,
}

impl ProxmoxSession {
    fn guest_path(node: &str, kind: GuestKind, vmid: Vmid) -> String {
        format!("/nodes/{node}/{}/{vmid}", kind.api_segment())
    }

    async fn read(&self, response: reqwest::Response, what: &str) -> Result<String, BotError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BotError::remote(format!("{what}: {e}")))?;
        if !status.is_success() {
            return Err(BotError::remote(format!(
                "{what}: HTTP {status}: {}",
                body.trim()
            )));
        }
        Ok(body)
    }

    async fn get(&self, path: &str) -> Result<String, BotError> {
        let what = format!("GET {path}");
        tracing::debug!(%path, "proxmox request");
        let response = self
            .http
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .map_err(|e| BotError::remote(format!("{what}: {e}")))?;
        self.read(response, &what).await
    }

    async fn post(&self, path: &str) -> Result<String, BotError> {
        let what = format!("POST {path}");
        tracing::debug!(%path, "proxmox request");
        let response = self
            .http
            .post(format!("{}{path}", self.base))
            .send()
            .await
            .map_err(|e| BotError::remote(format!("{what}: {e}")))?;
        self.read(response, &what).await
    }
}

fn decode_error(what: &str, e: impl std::fmt::Display) -> BotError {
    BotError::remote(format!("unexpected {what} response: {e}"))
}

impl ClusterApi for ProxmoxSession {
    async fn nodes(&self) -> Result<Vec<String>, BotError> {
        let body = self.get("/nodes").await?;
        let list: NodeList =
            facet_json::from_str(&body).map_err(|e| decode_error("node list", e))?;
        Ok(list.data.into_iter().map(|n| n.node).collect())
    }

    async fn guests(&self, node: &str, kind: GuestKind) -> Result<Vec<GuestInfo>, BotError> {
        let body = self
            .get(&format!("/nodes/{node}/{}", kind.api_segment()))
            .await?;
        let list: GuestList =
            facet_json::from_str(&body).map_err(|e| decode_error("guest list", e))?;
        let mut guests = Vec::with_capacity(list.data.len());
        for entry in list.data {
            match entry.vmid() {
                Some(vmid) => guests.push(entry.into_info(vmid)),
                None => {
                    tracing::warn!(%node, %kind, raw = ?entry.vmid, "skipping guest with unreadable vmid")
                }
            }
        }
        Ok(guests)
    }

    async fn guest_status(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: Vmid,
    ) -> Result<GuestInfo, BotError> {
        let path = format!("{}/status/current", Self::guest_path(node, kind, vmid));
        let body = self.get(&path).await?;
        let reply: GuestReply =
            facet_json::from_str(&body).map_err(|e| decode_error("guest status", e))?;
        let entry = reply
            .data
            .ok_or_else(|| BotError::remote(format!("{kind} {vmid} not present on {node}")))?;
        Ok(entry.into_info(vmid))
    }

    async fn guest_action(
        &self,
        node: &str,
        kind: GuestKind,
        vmid: Vmid,
        action: GuestAction,
    ) -> Result<(), BotError> {
        let path = format!(
            "{}/status/{}",
            Self::guest_path(node, kind, vmid),
            action.api_segment()
        );
        let task = self.post(&path).await?;
        tracing::debug!(%node, %kind, %vmid, task = %task.trim(), "task submitted");
        Ok(())
    }
}
