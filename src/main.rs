//! b-agent - terminal chat entry point.
//!
//! Reads one message per line from stdin. `/clear` resets the conversation,
//! `/quit` exits. Ctrl-C cancels the reply in progress, or exits at the prompt.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use b_agent::{agent::Agent, llm::AnthropicClient, tools::builtin_registry, Config};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// What the user did at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Message(String),
    Clear,
    Quit,
    Blank,
}

/// Wait for the next prompt line, or for `interrupt` to fire first.
///
/// EOF and an interrupt both read as [`Input::Quit`].
async fn next_input<R, F>(lines: &mut Lines<R>, interrupt: F) -> std::io::Result<Input>
where
    R: AsyncBufRead + Unpin,
    F: Future,
{
    let line = tokio::select! {
        line = lines.next_line() => line?,
        _ = interrupt => return Ok(Input::Quit),
    };

    Ok(match line.as_deref().map(str::trim) {
        None | Some("/quit") => Input::Quit,
        Some("/clear") => Input::Clear,
        Some("") => Input::Blank,
        Some(text) => Input::Message(text.to_string()),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so they stay out of the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "b_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, workspace={}",
        config.default_model,
        config.workspace_path.display()
    );

    let registry = builtin_registry(&config)?;
    info!("Registered {} tools", registry.len());

    let llm = Arc::new(AnthropicClient::from_config(&config)?);
    let mut agent = Agent::new(&config, llm, registry);
    info!("Session {} started", agent.session_id());

    println!("b-agent ready. Type /clear to reset, /quit to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let message = match next_input(&mut lines, tokio::signal::ctrl_c()).await? {
            Input::Quit => break,
            Input::Blank => continue,
            Input::Clear => {
                agent.clear_history();
                println!("Conversation cleared.");
                continue;
            }
            Input::Message(text) => text,
        };

        let cancel = CancellationToken::new();
        let on_interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        match agent.chat_with_cancel(&message, &cancel).await {
            Ok(reply) => println!("\nAssistant: {}", reply),
            Err(e) => println!("\n[error] {}", e),
        }
        on_interrupt.abort();
    }

    println!("\nGoodbye!");
    Ok(())
}
