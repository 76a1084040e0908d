//! `inlet search` — Search the web and print the scraped results.

use tokio::sync::mpsc;

use inlet_config::InletConfig;
use inlet_core::{ChannelSink, Notification};
use inlet_search::WebSearch;

pub async fn run(query: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = InletConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let web = WebSearch::new(&config.search)?;

    let (notif_tx, mut notif_rx) = mpsc::channel(64);
    let sink = ChannelSink::new(notif_tx);

    let printer = tokio::spawn(async move {
        while let Some(notification) = notif_rx.recv().await {
            if let Notification::Status(s) = notification {
                eprintln!("  [{}]", s.description);
            }
        }
    });

    let results = web.search_web(&query, &sink).await?;
    drop(sink);
    let _ = printer.await;

    for result in &results {
        match serde_json::from_str::<serde_json::Value>(result) {
            Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            Err(_) => println!("{result}"),
        }
    }
    Ok(())
}
