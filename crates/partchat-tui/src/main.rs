use std::sync::Arc;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use partchat_core::{render_content, BackendClient, Config, Conversation, SubmitOutcome, SubmitPolicy};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use logging::LogTarget;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "partchat")]
#[command(version, about = "Chat with the parts assistant backend")]
struct Cli {
    /// Backend chat endpoint (overrides config and PARTCHAT_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Send one query at a time; later messages wait for the current reply
    #[arg(long, global = true)]
    serialize: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single query and print the reply
    Ask {
        /// Your question
        query: String,
        /// Print the rendered, sanitized HTML instead of the raw reply
        #[arg(long)]
        html: bool,
    },
    /// Show the config file location and current settings
    Config {
        /// Write the current settings to the config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load config")?;
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }
    if cli.serialize {
        config.submit_policy = SubmitPolicy::Serialized;
    }

    match cli.command {
        None => {
            logging::init(&config, LogTarget::File);
            run_tui(&config).await
        }
        Some(Commands::Ask { query, html }) => {
            logging::init(&config, LogTarget::Stderr);
            ask(&config, &query, html).await
        }
        Some(Commands::Config { init }) => show_config(&config, init),
    }
}

async fn run_tui(config: &Config) -> Result<()> {
    let mut app = App::new(config)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        app.sync_transcript();
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(app, event)?,
            () = app.conversation.receive_reply() => {}
            else => break,
        }
    }

    if app.conversation.is_awaiting() {
        tracing::info!(
            in_flight = app.conversation.in_flight(),
            "Exiting with replies still pending"
        );
    }
    Ok(())
}

async fn ask(config: &Config, query: &str, html: bool) -> Result<()> {
    let client = BackendClient::from_config(config).context("Failed to create backend client")?;
    let mut conversation = Conversation::from_config(Arc::new(client), config);

    conversation.set_input(query);
    if conversation.submit() == SubmitOutcome::Ignored {
        bail!("Query is empty");
    }
    conversation.resolve_next().await;

    let Some(reply) = conversation.messages().last() else {
        bail!("No reply recorded");
    };

    if html {
        println!("{}", render_content(&reply.content));
    } else {
        println!("{}", reply.content);
    }
    Ok(())
}

fn show_config(config: &Config, init: bool) -> Result<()> {
    let path = Config::path()?;

    if init {
        config.save()?;
        println!("Wrote {}", path.display());
    } else {
        println!("{}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
