//! Retrieval pipeline for webcontext.
//!
//! Ties together the search provider, page fetcher, and similarity ranker
//! into a single run (see [`WebSearchPipeline::run`]) that turns a
//! conversation into ranked context passages grouped by source.

pub mod aggregate;
pub mod fetch;
pub mod filter;
pub mod generate;
pub mod notify;
pub mod pipeline;
pub mod query;
pub mod segment;
pub mod select;

pub use generate::{ChatQueryGenerator, QueryGenerator};
pub use notify::{ChannelSink, SilentSink, UpdateSink};
pub use pipeline::{WebSearchPipeline, WebSearchRequest};
