use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BotError {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config from {path}: {message}")]
    ConfigParse { path: String, message: String },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("cannot connect to Proxmox: {message}")]
    #[diagnostic(help("{hint}"))]
    Connection { message: String, hint: String },

    #[error("{message}")]
    Remote { message: String },

    #[error("telegram: {message}")]
    Telegram { message: String },
}

impl BotError {
    pub(crate) fn remote(message: impl Into<String>) -> Self {
        BotError::Remote {
            message: message.into(),
        }
    }
}
