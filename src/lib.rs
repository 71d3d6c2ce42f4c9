//! # Rivulet
//!
//! Live queries over streaming JSON. Statements such as
//! `WindowAve(RollingWindow(response.latency, 100))` are parsed once into an
//! expression tree and then evaluated against every event of a feed.
//!
//! ## Modules
//!
//! - [`query`]: literals, statement parser, function registry, expression nodes
//! - [`window`]: count and time windows with incremental aggregators
//! - [`stream`]: per-feed distributors sharing one upstream connection
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rivulet::query::parse;
//! use rivulet::stream::{DataStream, DistributorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut query = parse("As(Multiply(bytes, 8), \"bits\")")?;
//!
//!     let feed = DataStream::spawn("transfers", DistributorConfig::default());
//!     let (_id, mut events) = feed.subscribe_channel(256).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         let value = query.evaluate(&event)?;
//!         println!("{} = {}", query, value);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod query;
pub mod stream;
pub mod window;

pub use config::Config;
pub use query::{parse, Expression, QueryError, QueryResult, Value};
pub use stream::{DataStream, StreamError, StreamRegistry};
