//! Rivulet CLI
//!
//! Runs live queries against a feed and prints one JSON line per event:
//! - Query a feed
//! - Check a statement
//! - List functions
//! - Print the default config

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use rivulet::config::{generate_default_config, Config};
use rivulet::query::{parse, BoxedExpression, FunctionRegistry};
use rivulet::stream::{Event, JsonWriter, StreamRegistry};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "rivulet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live queries over streaming JSON feeds")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the usual locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Upstream feed server, overrides the config file
    #[arg(long, global = true)]
    pub upstream: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate statements against every event of a feed
    Query {
        /// Feed name sent to the upstream
        feed: String,
        /// One or more statements, e.g. 'WindowAve(RollingWindow(latency, 50))'.
        /// Results are keyed by display form; repeats get a `#2`, `#3`... suffix.
        #[arg(required = true)]
        statements: Vec<String>,
    },

    /// Parse a statement and print its display form
    Check {
        statement: String,
    },

    /// List registered functions
    Functions,

    /// Print the default config file
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The logging config comes from the file, so the search is reported afterwards
    let (mut config, loaded, failures) = match &cli.config {
        Some(path) => (Config::load_with_env(path)?, Some(path.clone()), Vec::new()),
        None => Config::search_default(),
    };
    if let Some(upstream) = cli.upstream {
        config.upstream.address = upstream;
    }
    init_logging(&config);

    for e in &failures {
        tracing::warn!("{}", e);
    }
    match loaded {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::debug!("Using default config with environment overrides"),
    }

    match cli.command {
        Commands::Query { feed, statements } => run_query(&config, &feed, &statements).await?,
        Commands::Check { statement } => {
            let query = parse(&statement).with_context(|| format!("Invalid statement {:?}", statement))?;
            println!("{}", query);
        }
        Commands::Functions => {
            for (name, arity) in FunctionRegistry::global().signatures() {
                println!("{:<14} {} argument{}", name, arity, if arity == 1 { "" } else { "s" });
            }
        }
        Commands::Config => print!("{}", generate_default_config()),
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only results
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rivulet={}", config.logging.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run_query(config: &Config, feed: &str, statements: &[String]) -> anyhow::Result<()> {
    let mut queries = statements
        .iter()
        .map(|s| parse(s).with_context(|| format!("Invalid statement {:?}", s)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let registry = StreamRegistry::new(config.distributor());
    let stream = registry.get(feed).await;
    let (id, mut events) = stream
        .subscribe_channel(config.stream.subscriber_capacity)
        .await
        .with_context(|| format!("Failed to subscribe to feed {}", feed))?;
    tracing::info!(feed, queries = queries.len(), "Running queries");

    let mut out = JsonWriter::new(tokio::io::stdout());
    loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down...");
                break;
            }
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let line = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "results": evaluate_all(&mut queries, &event),
        });
        out.write(&line).await?;
    }

    stream.unsubscribe(id).await?;
    Ok(())
}

/// Evaluate each query; failures render as null
fn evaluate_all(queries: &mut [BoxedExpression], event: &Event) -> serde_json::Value {
    let mut results = serde_json::Map::new();
    for query in queries.iter_mut() {
        let value = match query.evaluate(event) {
            Ok(value) => value.to_json(),
            Err(e) => {
                tracing::debug!(query = %query, error = %e, "Evaluation failed");
                serde_json::Value::Null
            }
        };
        // Labels set by As() are only known after evaluating
        let key = unique_key(&results, query.to_string());
        results.insert(key, value);
    }
    serde_json::Value::Object(results)
}

/// `display`, or `display#N` for the first N not already taken
fn unique_key(results: &serde_json::Map<String, serde_json::Value>, display: String) -> String {
    if !results.contains_key(&display) {
        return display;
    }
    let mut n = 2;
    loop {
        let key = format!("{}#{}", display, n);
        if !results.contains_key(&key) {
            return key;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_duplicate_displays_kept_apart() {
        let mut queries: Vec<BoxedExpression> = ["As(a, \"x\")", "As(b, \"x\")", "a", "As(c, \"x\")"]
            .iter()
            .map(|s| parse(s).unwrap())
            .collect();
        let event: Event = Arc::new(json!({"a": 1, "b": 2, "c": 3}));

        let results = evaluate_all(&mut queries, &event);
        assert_eq!(
            results,
            json!({"x": 1.0, "x#2": 2.0, "a": 1.0, "x#3": 3.0})
        );
    }

    #[test]
    fn test_failed_evaluation_is_null() {
        let mut queries = vec![parse("Add(a, name)").unwrap()];
        let event: Event = Arc::new(json!({"a": 1, "name": "n"}));
        assert_eq!(
            evaluate_all(&mut queries, &event),
            json!({"Add(a,name)": null})
        );
    }
}
