//! courier - demo driver for the in-process topic queue.
//!
//! Subscribes a `user.save` handler that rejects the user named `fail`,
//! publishes three users and prints queue stats until everything settles.

use std::error::Error;
use std::path::PathBuf;

use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, sleep};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use courier_core::{Backoff, HandlerError, Message, MessageHandler, MessageQueue, QueueOptions};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Run the courier queue demo", long_about = None)]
#[command(version)]
struct Cli {
    /// Options file (JSON: {"retry", "delay", "backoff"}); flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Redeliveries before a job is marked failed
    #[arg(long)]
    retry: Option<u32>,

    /// Base delay before redelivery, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// linear or exponential
    #[arg(long)]
    backoff: Option<Backoff>,

    /// How often stats are printed, in milliseconds
    #[arg(long, default_value = "1000")]
    stats_every_ms: u64,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Serialize, Deserialize)]
struct SaveUser {
    name: String,
}

impl Message for SaveUser {
    const TOPIC: &'static str = "user.save";
}

struct SaveUserHandler;

#[async_trait]
impl MessageHandler<SaveUser> for SaveUserHandler {
    async fn handle(&self, user: SaveUser) -> Result<(), HandlerError> {
        if user.name == "fail" {
            return Err(HandlerError::failed(format!("cannot save user {}", user.name)));
        }
        sleep(Duration::from_millis(100)).await;
        println!("saved user: {}", user.name);
        Ok(())
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("courier=info,courier_core=info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init(),
    }
}

fn load_options(cli: &Cli) -> Result<QueueOptions, Box<dyn Error>> {
    let mut options = match &cli.config {
        Some(path) => QueueOptions::from_json_file(path)?,
        None => QueueOptions::default(),
    };
    if let Some(retry) = cli.retry {
        options = options.with_retry(retry);
    }
    if let Some(delay_ms) = cli.delay_ms {
        options = options.with_delay(Duration::from_millis(delay_ms));
    }
    if let Some(backoff) = cli.backoff {
        options = options.with_backoff(backoff);
    }
    Ok(options)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let options = load_options(&cli)?;
    tracing::info!(
        retry = options.retry,
        delay_ms = options.delay_ms,
        backoff = %options.backoff,
        "starting queue"
    );

    let queue = MessageQueue::builder()
        .options(options)
        .subscribe_message::<SaveUser, _>(SaveUserHandler)
        .expect_topics(&[SaveUser::TOPIC])
        .build()?;

    for name in ["Shishir", "fail", "Ram"] {
        let id = queue.publish_message(&SaveUser {
            name: name.to_string(),
        })?;
        println!("published {id} ({name})");
    }

    let every = Duration::from_millis(cli.stats_every_ms.max(1));
    loop {
        let stats = queue.stats();
        println!(
            "stats: queue_length={} topics={:?} draining={}",
            stats.queue_length,
            stats.topics,
            queue.is_draining()
        );
        if stats.queue_length == 0 && !queue.is_draining() {
            break;
        }
        sleep(every).await;
    }

    Ok(())
}
