//! # pubmed-mcp
//!
//! A Rust client for PubMed (NCBI E-utilities) and an MCP server exposing it
//! to AI agents.
//!
//! Provides:
//! - **Library**: blocking client for keyword/advanced search, article
//!   metadata and PMC PDF download
//! - **MCP server**: five tools over stdio, each call run off the async
//!   executor so calls never stall one another
//! - **CLI**: `pubmed` binary for terminal use (includes `pubmed serve`)
//!
//! ## Quick Start
//!
//! ```no_run
//! # fn example() -> pubmed_mcp::error::Result<()> {
//! use pubmed_mcp::PubMedClient;
//!
//! // Reads NCBI_API_KEY / NCBI_EMAIL / PUBMED_DOWNLOAD_DIR if set
//! let client = PubMedClient::from_env()?;
//!
//! for article in client.search_keywords("long covid fatigue", 5)? {
//!     println!("{} ({}) - {}", article.title, article.publication_date, article.pmid);
//! }
//!
//! if let Some(article) = client.fetch_metadata("31452104")? {
//!     println!("{}", article.abstract_text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Serving tools
//!
//! The blocking HTTP client must not be dropped inside the async runtime, so
//! keep a handle to it outside `block_on`.
//!
//! ```no_run
//! # fn example() -> pubmed_mcp::error::Result<()> {
//! use pubmed_mcp::{Dispatcher, PubMedClient};
//! use std::sync::Arc;
//!
//! let client = Arc::new(PubMedClient::from_env()?);
//! let runtime = tokio::runtime::Runtime::new()?;
//! runtime.block_on(pubmed_mcp::mcp::run_server(Dispatcher::new(Arc::clone(&client))))?;
//! drop(runtime);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod metadata;
pub mod parse;
pub mod pdf;
pub mod query;
pub mod rate_limit;
pub mod search;
pub mod source;
pub mod types;

pub mod mcp;

#[cfg(feature = "cli")]
pub mod setup;

// Re-export key types at the crate root.
pub use analysis::DeepAnalysis;
pub use client::PubMedClient;
pub use dispatch::{Dispatcher, Payload, ToolName, ToolResponse, ToolResult};
pub use error::PubMedError;
pub use query::QueryBuilder;
pub use source::LiteratureSource;
pub use types::*;
