//! Terminal front-end for the BeeBot webhook chat.
//!
//! Deliberately thin: all chat behavior lives in `beebot_core`, this binary
//! only parses flags, reads lines and prints replies.

use anyhow::Result;
use clap::Parser;
use console::style;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use beebot_core::utils::time::date_bucket;
use beebot_core::{
    ChatController, ChatMode, Config, ConversationManager, ConversationStore, Role, SendRejected,
    WebhookClient,
};

#[derive(Parser)]
#[command(name = "beebot")]
#[command(about = "Chat with an n8n automation workflow from the terminal", long_about = None)]
struct Cli {
    /// Webhook endpoint (overrides config file and BEEBOT_WEBHOOK_URL)
    #[arg(long)]
    endpoint: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// A parsed REPL input line.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    New,
    List,
    Select(usize),
    Delete(usize),
    Mode(ChatMode),
    Help,
    Quit,
    Send(&'a str),
    Invalid(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    if !line.starts_with('/') {
        return Command::Send(line);
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    match verb {
        "/new" => Command::New,
        "/list" => Command::List,
        "/select" => match arg.parse() {
            Ok(n) => Command::Select(n),
            Err(_) => Command::Invalid(line),
        },
        "/delete" => match arg.parse() {
            Ok(n) => Command::Delete(n),
            Err(_) => Command::Invalid(line),
        },
        "/mode" => match arg {
            "reasoning" => Command::Mode(ChatMode::Reasoning),
            "image" => Command::Mode(ChatMode::Image),
            "research" => Command::Mode(ChatMode::Research),
            "none" => Command::Mode(ChatMode::None),
            _ => Command::Invalid(line),
        },
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Invalid(line),
    }
}

fn print_help() {
    println!("  /new                 start a new conversation");
    println!("  /list                list conversations");
    println!("  /select <n>          switch to conversation n");
    println!("  /delete <n>          delete conversation n");
    println!("  /mode <m>            tag the next message (reasoning|image|research|none)");
    println!("  /quit                exit");
    println!("  anything else is sent to the workflow");
}

fn print_conversation_list(manager: &ConversationManager) {
    if manager.conversations().is_empty() {
        println!("{}", style("no conversations yet").dim());
        return;
    }
    for (i, conversation) in manager.conversations().iter().enumerate() {
        let marker = if Some(conversation.id.as_str()) == manager.current_id() {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:>2}. {}  {}",
            marker,
            i + 1,
            conversation.title,
            style(date_bucket(conversation.updated_at)).dim()
        );
    }
}

/// Resolves a 1-based list index to a conversation id.
fn conversation_at(manager: &ConversationManager, index: usize) -> Option<String> {
    index
        .checked_sub(1)
        .and_then(|i| manager.conversations().get(i))
        .map(|c| c.id.clone())
}

async fn run(mut controller: ChatController) -> Result<()> {
    println!(
        "{} {}",
        style("BeeBot").yellow().bold(),
        style("— type /help for commands").dim()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Command::Quit => break,
            Command::Help => print_help(),
            Command::New => {
                controller.manager_mut().create_conversation();
                println!("{}", style("started a new conversation").dim());
            }
            Command::List => print_conversation_list(controller.manager()),
            Command::Select(index) => match conversation_at(controller.manager(), index) {
                Some(id) => {
                    controller.manager_mut().select_conversation(&id);
                    print_conversation_list(controller.manager());
                }
                None => println!("{}", style("no such conversation").red()),
            },
            Command::Delete(index) => match conversation_at(controller.manager(), index) {
                Some(id) => {
                    controller.manager_mut().delete_conversation(&id);
                    println!("{}", style("deleted").dim());
                }
                None => println!("{}", style("no such conversation").red()),
            },
            Command::Mode(mode) => {
                controller.set_mode(mode);
                println!("{}", style(format!("next message tagged {:?}", mode)).dim());
            }
            Command::Invalid(input) => {
                println!("{}", style(format!("unrecognized command: {input}")).red());
            }
            Command::Send(text) => {
                match controller.handle_send_message(text).await {
                    Ok(()) => {
                        let reply = controller
                            .manager()
                            .current_conversation()
                            .and_then(|c| c.messages.last())
                            .filter(|m| m.role == Role::Assistant)
                            .map(|m| m.content.clone())
                            .unwrap_or_default();
                        println!("{} {}", style("bee>").yellow().bold(), reply);
                    }
                    Err(SendRejected::Busy) => {
                        println!("{}", style("still waiting on the previous message").dim());
                    }
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();
    let endpoint = cli.endpoint.unwrap_or(config.webhook_url);
    tracing::debug!(%endpoint, timeout_secs = config.request_timeout_secs, "starting beebot");

    let store = ConversationStore::open_default()?;
    let manager = ConversationManager::new(store);
    let client = WebhookClient::with_timeout(
        endpoint,
        Duration::from_secs(config.request_timeout_secs),
    );

    run(ChatController::new(manager, client)).await
}
