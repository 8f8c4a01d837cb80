//! Terminal front-end for a chat session.
//!
//! Reads lines from stdin and sends them as messages. Lines starting with `/`
//! are commands:
//!
//! ```text
//! /stats                      backend statistics
//! /models                     available models
//! /model                      active model
//! /switch <provider> <model>  switch the active model
//! /dismiss                    dismiss the warning banner
//! /quit                       end the session
//! ```

use std::error::Error;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use chatlink::adapters::{HttpChatBackend, WsConnector};
use chatlink::application::{SessionController, SessionHandle, SessionSettings, SessionSnapshot};
use chatlink::config::AppConfig;
use chatlink::domain::conversation::Sender;
use chatlink::domain::session::ConnectionState;
use chatlink::ports::ChatBackend;
use chatlink::telemetry;

#[derive(Debug, PartialEq, Eq)]
enum CliCommand {
    Say(String),
    Stats,
    Models,
    CurrentModel,
    Switch { provider: String, model_name: String },
    Dismiss,
    Quit,
    Usage(&'static str),
    Empty,
}

impl CliCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return CliCommand::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return CliCommand::Say(line.to_string());
        };

        let mut words = rest.split_whitespace();
        match words.next().unwrap_or_default() {
            "stats" => CliCommand::Stats,
            "models" => CliCommand::Models,
            "model" => CliCommand::CurrentModel,
            "switch" => match (words.next(), words.next()) {
                (Some(provider), Some(model_name)) => CliCommand::Switch {
                    provider: provider.to_string(),
                    model_name: model_name.to_string(),
                },
                _ => CliCommand::Usage("usage: /switch <provider> <model>"),
            },
            "dismiss" => CliCommand::Dismiss,
            "quit" | "exit" => CliCommand::Quit,
            _ => CliCommand::Usage(
                "commands: /stats /models /model /switch <provider> <model> /dismiss /quit",
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    telemetry::init_tracing(&config.logging)?;

    let backend = Arc::new(HttpChatBackend::from_config(&config.backend)?);
    let settings = SessionSettings::new(config.backend.stream_base()?)
        .with_reconnect_delay(config.session.reconnect_delay())
        .with_command_buffer(config.session.command_buffer);

    let handle = SessionController::spawn(settings, Arc::new(WsConnector::new()), backend.clone());
    println!("conversation {}", handle.conversation_id());

    let printer = tokio::spawn(render(handle.subscribe()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match CliCommand::parse(&line) {
            CliCommand::Quit => break,
            CliCommand::Empty => {}
            command => {
                if let Err(error) = run_command(command, &handle, backend.as_ref()).await {
                    println!("! {}", error);
                }
            }
        }
    }

    handle.shutdown().await?;
    printer.abort();
    Ok(())
}

async fn run_command(
    command: CliCommand,
    handle: &SessionHandle,
    backend: &dyn ChatBackend,
) -> Result<(), Box<dyn Error>> {
    match command {
        CliCommand::Say(text) => {
            handle.send_message(text).await?;
        }
        CliCommand::Stats => {
            let stats = backend.fetch_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        CliCommand::Models => {
            let models = backend.list_models().await?;
            println!("{}", serde_json::to_string_pretty(&models)?);
        }
        CliCommand::CurrentModel => {
            let model = backend.current_model().await?;
            println!("{} / {}", model.provider, model.display_name());
        }
        CliCommand::Switch {
            provider,
            model_name,
        } => handle.switch_model(provider, model_name).await?,
        CliCommand::Dismiss => handle.dismiss_warning().await?,
        CliCommand::Usage(text) => println!("{}", text),
        CliCommand::Quit | CliCommand::Empty => {}
    }
    Ok(())
}

/// Prints new messages, connectivity changes and warnings as they appear.
async fn render(mut snapshots: watch::Receiver<SessionSnapshot>) {
    let mut shown = 0;
    let mut connection: Option<ConnectionState> = None;
    let mut warning: Option<String> = None;

    loop {
        {
            let snapshot = snapshots.borrow_and_update();

            if connection != Some(snapshot.connection) {
                connection = Some(snapshot.connection);
                println!("[{}]", snapshot.connection);
            }
            for message in snapshot.messages.iter().skip(shown) {
                match message.sender() {
                    Sender::User => {}
                    Sender::Bot => println!("bot> {}", message.text()),
                    Sender::System => println!("*** {}", message.text()),
                }
            }
            shown = snapshot.messages.len();
            if warning != snapshot.warning {
                warning = snapshot.warning.clone();
                if let Some(text) = &warning {
                    println!("! {}", text);
                }
            }
        }

        if snapshots.changed().await.is_err() {
            break;
        }
    }
}
