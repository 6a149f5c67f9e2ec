//! HTTP access for notarization log retrieval

pub mod client;
pub mod log_fetcher;

pub use client::{HttpClient, HttpClientBuilder};
pub use log_fetcher::HttpLogFetcher;
