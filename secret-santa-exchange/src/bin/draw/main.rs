mod error;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use secret_santa_config::get_config;
use secret_santa_exchange::{
    Exchange, ExchangeService, InMemoryExchangeRepository, LoggingEmailService, TracingAuditSink,
};
use secret_santa_telemetry::setup_telemetry;

use crate::error::DrawError;

/// Draws assignments for an exchange and notifies every gift giver.
#[derive(Parser, Debug)]
#[command(name = "draw", version)]
struct Args {
    /// Exchange as JSON
    exchange: PathBuf,

    /// Only apply explicit conflicts
    #[arg(long)]
    no_auto_detect: bool,

    /// Send a single summary of the draw to the organizer
    #[arg(long)]
    organizer_only: bool,

    /// Print the message the first participant would get and stop
    #[arg(long)]
    preview: bool,
}

#[tokio::main]
async fn main() -> Result<(), DrawError> {
    setup_telemetry();
    let args = Args::parse();
    let config = Arc::new(get_config()?);

    let json = tokio::fs::read_to_string(&args.exchange).await?;
    let mut exchange: Exchange = serde_json::from_str(&json)?;
    if args.no_auto_detect {
        exchange.auto_detect = false;
    }

    let repository = InMemoryExchangeRepository::new();
    repository.insert(exchange.clone()).await;
    let service = ExchangeService::new(config, repository, LoggingEmailService, TracingAuditSink)?;

    if args.preview {
        let message = service.generate_preview(&exchange)?;
        println!("Subject: {}", message.subject);
        if let Some(body) = message.plaintext.or(message.html) {
            println!("\n{body}");
        }
        return Ok(());
    }

    let report = if args.organizer_only {
        let assignments = service.generate_assignments(&exchange, exchange.auto_detect)?;
        service.send_messages(&exchange, &assignments, true).await?
    } else {
        service.send_notifications(exchange.id).await?
    };

    println!("{} of {} messages sent", report.sent, report.attempted);
    if report.is_complete() {
        Ok(())
    } else {
        Err(DrawError::Incomplete {
            sent: report.sent,
            attempted: report.attempted,
        })
    }
}
