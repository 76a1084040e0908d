//! `inlet chat` — Run one exchange through the relay.

use std::io::Write;

use tokio::sync::mpsc;

use inlet_config::InletConfig;
use inlet_core::{ChannelSink, Message, Notification, RelayOutcome};
use inlet_relay::{ExchangeRequest, RelayOrchestrator};
use inlet_search::WebSearch;

pub async fn run(
    message: String,
    user: String,
    task: Option<String>,
    search: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = InletConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let orchestrator = RelayOrchestrator::new(&config.relay)?;

    let (notif_tx, mut notif_rx) = mpsc::channel(64);
    let sink = ChannelSink::new(notif_tx);

    // Print statuses and citations on stderr as they arrive, leaving
    // stdout to the answer itself.
    let printer = tokio::spawn(async move {
        while let Some(notification) = notif_rx.recv().await {
            match notification {
                Notification::Status(s) if !s.hidden => {
                    eprintln!("  [{}]", s.description);
                }
                Notification::Status(_) => {}
                Notification::Citation(c) => {
                    if let Some(source) = c.source {
                        eprintln!("  [{}] {}", source.id.unwrap_or_default(), source.name);
                    }
                }
                Notification::Message(m) => {
                    eprintln!("  {}", m.content);
                }
            }
        }
    });

    let web_results = if search {
        let web = WebSearch::new(&config.search)?;
        web.search_web(&message, &sink).await?
    } else {
        Vec::new()
    };

    let request = ExchangeRequest {
        user: Some(user),
        messages: vec![Message::user(&message)],
        web_results,
        web_search_activated: search,
        task,
        ..ExchangeRequest::default()
    };

    let (content_tx, mut content_rx) = mpsc::channel(64);
    let exchange = orchestrator.run(&request, &sink, content_tx);

    let output = tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        while let Some(chunk) = content_rx.recv().await {
            print!("{chunk}");
            let _ = stdout.flush();
        }
        println!();
    });

    let outcome = exchange.await;
    drop(sink);
    let _ = output.await;
    let _ = printer.await;

    match outcome {
        RelayOutcome::Streamed { chunks } => {
            tracing::debug!(chunks, "Exchange complete");
            Ok(())
        }
        RelayOutcome::Task(text) => {
            println!("{text}");
            Ok(())
        }
        RelayOutcome::Error(payload) => Err(payload.content.into()),
    }
}
