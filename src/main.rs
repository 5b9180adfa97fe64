//! searchchat - terminal chat client with web search
//!
//! Sends each user turn through a relay to a hosted completion service,
//! resolving one round of web search tool use before showing the reply.

mod config;
mod llm;
mod runtime;
mod state_machine;
mod transcript;

use config::ChatConfig;
use llm::{LoggingClient, MessageRole, RelayClient};
use runtime::{ChatEvent, ChatHandle, ChatRuntime};
use state_machine::RoundOutcome;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transcript::{Transcript, Turn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "searchchat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ChatConfig::from_env()?;
    tracing::info!(
        relay = %config.relay_url,
        model = %config.model,
        search = config.search_enabled,
        "Configuration loaded"
    );

    let relay = RelayClient::new(&config.relay_url)?;
    tracing::debug!(endpoint = relay.endpoint(), "Relay client ready");
    let client = LoggingClient::new(relay);
    let transcript = Transcript::default();
    for turn in transcript.turns() {
        println!("assistant> {}", turn.text());
    }

    let (runtime, handle) =
        ChatRuntime::new(config.context(), transcript, client, config.search_enabled);
    let printer = tokio::spawn(print_events(handle.subscribe(), handle.transcript()));
    let runtime = tokio::spawn(runtime.run());

    read_input(&handle).await?;
    if handle.is_busy() {
        println!("(waiting for the reply in flight)");
    }

    // Dropping the last handle stops the runtime once any round in flight settles
    drop(handle);
    runtime.await?;
    printer.await?;

    Ok(())
}

async fn read_input(handle: &ChatHandle) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "/quit" | "/exit" => break,
            "/reset" => {
                if !handle.reset() {
                    println!("(still answering, try again when the reply arrives)");
                }
            }
            "/search on" => {
                handle.set_search_enabled(true);
                println!("(web search on)");
            }
            "/search off" => {
                handle.set_search_enabled(false);
                println!("(web search off)");
            }
            "" => {}
            text => {
                if !handle.submit_user_turn(text) {
                    println!("(still answering, input ignored)");
                }
            }
        }
    }

    Ok(())
}

/// Print assistant turns as they land in the transcript
async fn print_events(mut rx: broadcast::Receiver<ChatEvent>, mut shown: Vec<Turn>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Printer lagged behind runtime events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            ChatEvent::TranscriptChanged { turns } => {
                let common = shown
                    .iter()
                    .zip(&turns)
                    .take_while(|(a, b)| a == b)
                    .count();

                if turns.len() == 1 && shown.len() > 1 {
                    println!("(conversation reset)");
                    println!("assistant> {}", turns[0].text());
                } else {
                    for turn in &turns[common..] {
                        if turn.role == MessageRole::Assistant {
                            println!("assistant> {}", turn.text());
                        }
                    }
                }

                shown = turns;
            }
            ChatEvent::BusyChanged { busy: true } => println!("(thinking...)"),
            ChatEvent::RoundFinished {
                outcome: RoundOutcome::Recovered(error),
            } => println!("({error})"),
            ChatEvent::BusyChanged { busy: false } | ChatEvent::RoundFinished { .. } => {}
        }
    }
}
