use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pvebot",
    about = "Control Proxmox VE guests from Telegram or the command line"
)]
pub struct Cli {
    /// Path to config file (default: ./pvebot.toml, then ~/.config/pvebot/pvebot.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write debug logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the Telegram bot
    Serve,

    /// Run one bot command locally and print the reply, e.g. `exec stop 105 force`
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
}

impl Command {
    /// The `exec` words as a bot command, with the leading `/` added when
    /// it was left out.
    pub fn exec_text(words: &[String]) -> String {
        let text = words.join(" ");
        if text.starts_with('/') {
            text
        } else {
            format!("/{text}")
        }
    }
}
