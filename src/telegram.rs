//! Telegram Bot API transport: long-poll for messages, route them, reply.

use std::future::Future;
use std::time::Duration;

use facet::Facet;

use crate::cluster::Connector;
use crate::error::BotError;
use crate::router::{Caller, Router};

/// Bot API limit for one message, in UTF-16 code units.
const MAX_MESSAGE_UNITS: usize = 4096;

// ── wire types ───────────────────────────────────────────

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct UpdatesReply {
    #[facet(default)]
    ok: bool,
    #[facet(default)]
    result: Vec<Update>,
    description: Option<String>,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct Update {
    #[facet(default)]
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct Message {
    #[facet(default)]
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct Chat {
    #[facet(default)]
    id: i64,
}

#[derive(Debug, Default, Facet)]
#[facet(default)]
struct SendReply {
    #[facet(default)]
    ok: bool,
    description: Option<String>,
}

// ── client ───────────────────────────────────────────────

pub struct TelegramClient {
    http: reqwest::Client,
    base: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str, poll_timeout: Duration) -> Result<Self, BotError> {
        let http = reqwest::Client::builder()
            // the long poll itself may take `poll_timeout`
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()
            .map_err(|e| BotError::Telegram {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            base: format!("{}/bot{token}", api_url.trim_end_matches('/')),
            poll_timeout,
        })
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, BotError> {
        let body = self
            .http
            .get(format!("{}/getUpdates", self.base))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.poll_timeout.as_secs().to_string()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BotError::Telegram {
                message: format!("getUpdates: {}", e.without_url()),
            })?
            .text()
            .await
            .map_err(|e| BotError::Telegram {
                message: format!("getUpdates: {}", e.without_url()),
            })?;

        parse_updates(&body)
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), BotError> {
        for chunk in split_message(text, MAX_MESSAGE_UNITS) {
            let body = self
                .http
                .post(format!("{}/sendMessage", self.base))
                .form(&[("chat_id", chat_id.to_string()), ("text", chunk)])
                .send()
                .await
                .map_err(|e| BotError::Telegram {
                    message: format!("sendMessage: {}", e.without_url()),
                })?
                .text()
                .await
                .map_err(|e| BotError::Telegram {
                    message: format!("sendMessage: {}", e.without_url()),
                })?;
            let reply: SendReply = facet_json::from_str(&body).map_err(|e| BotError::Telegram {
                message: format!("sendMessage: unexpected response: {e}"),
            })?;
            if !reply.ok {
                return Err(BotError::Telegram {
                    message: format!(
                        "sendMessage rejected: {}",
                        reply.description.unwrap_or_default()
                    ),
                });
            }
        }
        Ok(())
    }
}

fn parse_updates(body: &str) -> Result<Vec<Update>, BotError> {
    let reply: UpdatesReply = facet_json::from_str(body).map_err(|e| BotError::Telegram {
        message: format!("getUpdates: unexpected response: {e}"),
    })?;
    if !reply.ok {
        return Err(BotError::Telegram {
            message: format!(
                "getUpdates rejected: {}",
                reply.description.unwrap_or_default()
            ),
        });
    }
    Ok(reply.result)
}

/// Split `text` into pieces of at most `limit` UTF-16 code units (the unit
/// Telegram counts in), preferring line boundaries. A chunk always holds at
/// least one char, so a `limit` below a char's width still makes progress.
fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let mut line = line;
        loop {
            let line_len = line.encode_utf16().count();
            if current_len + line_len <= limit {
                current.push_str(line);
                current_len += line_len;
                break;
            }
            if current_len > 0 {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
                continue;
            }
            // a single line longer than the limit
            let cut = utf16_cut(line, limit);
            chunks.push(line[..cut].to_string());
            line = &line[cut..];
        }
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Byte index of the longest prefix of `line` within `limit` UTF-16 units,
/// never less than the first char.
fn utf16_cut(line: &str, limit: usize) -> usize {
    let mut units = 0;
    for (i, c) in line.char_indices() {
        units += c.len_utf16();
        if units > limit {
            return if i == 0 { c.len_utf8() } else { i };
        }
    }
    line.len()
}

// ── poll loop ────────────────────────────────────────────

/// Poll for updates until `shutdown` resolves. Each message is handled to
/// completion before the next one; `shutdown` interrupts a poll, a command
/// in flight, or the back-off after a failed poll.
pub async fn run_bot<C: Connector>(
    client: &TelegramClient,
    router: &Router<C>,
    error_delay: Duration,
    shutdown: impl Future,
) -> Result<(), BotError> {
    let mut offset = 0;
    tracing::info!("Proxmox bot started");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = poll_once(client, router, error_delay, &mut offset) => {}
            _ = &mut shutdown => {
                tracing::info!("interrupted, shutting down");
                return Ok(());
            }
        }
    }
}

async fn poll_once<C: Connector>(
    client: &TelegramClient,
    router: &Router<C>,
    error_delay: Duration,
    offset: &mut i64,
) {
    let updates = match client.get_updates(*offset).await {
        Ok(updates) => updates,
        Err(e) => {
            tracing::warn!(error = %e, "polling failed");
            tokio::time::sleep(error_delay).await;
            return;
        }
    };

    for update in updates {
        *offset = (*offset).max(update.update_id + 1);
        let Some(message) = update.message else {
            continue;
        };
        let Some(text) = message.text else {
            continue;
        };
        let chat_id = message.chat.id;
        let reply = router.handle(Caller::Chat(chat_id), &text).await;
        if let Err(e) = client.send_message(chat_id, &reply).await {
            tracing::warn!(chat_id, error = %e, "failed to deliver reply");
        }
    }
}
