use std::io::IsTerminal;
use std::time::Duration;

use clap::Parser;
use indicatif::ProgressBar;

use pvebot::cli::{Cli, Command};
use pvebot::config;
use pvebot::control::ClusterControl;
use pvebot::router::{self, Caller, Router};
use pvebot::telegram::{self, TelegramClient};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // `exec` keeps the terminal for its reply; the bot logs at info.
    let default_level = match cli.command {
        Command::Serve => "info",
        Command::Exec { .. } => "warn",
    };
    pvebot::logging::init(default_level, cli.verbose, cli.log_file.as_deref())?;

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve => {
            config.require_telegram()?;
            let client = TelegramClient::new(
                &config.telegram.api_url,
                &config.telegram.token,
                Duration::from_secs(config.telegram.poll_timeout_s),
            )?;
            let router = Router::new(
                ClusterControl::from_config(&config),
                config.telegram.authorized_users.clone(),
            );
            telegram::run_bot(
                &client,
                &router,
                Duration::from_secs(config.retry.delay_s.max(1)),
                tokio::signal::ctrl_c(),
            )
            .await?;
        }
        Command::Exec { words } => {
            let text = Command::exec_text(&words);
            if let Err(reply) = router::Command::parse(&text) {
                eprintln!("{reply}");
                std::process::exit(2);
            }

            let router = Router::new(ClusterControl::from_config(&config), Vec::new());
            let spinner = (std::io::stderr().is_terminal() && !cli.verbose).then(|| {
                let s = ProgressBar::new_spinner();
                s.set_message(format!("Running {text}..."));
                s.enable_steady_tick(Duration::from_millis(120));
                s
            });

            let reply = router.handle(Caller::Local, &text).await;

            if let Some(s) = spinner {
                s.finish_and_clear();
            }
            println!("{reply}");
        }
    }

    Ok(())
}
