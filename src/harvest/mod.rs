//! Harvest module - fetch client, record mapping and the run controller
//!
//! This module contains the fetch-and-persist core:
//! - Building HTTP clients and fetching product payloads with retry/backoff
//! - Mapping payloads to output records
//! - The run controller that drives a whole resumable run

mod client;
mod controller;
pub mod record;

pub use client::{
    backoff_delay, build_http_client, fetch_product, product_url, FetchOutcome, FetchReport,
};
pub use controller::{run_harvest, Controller, RunSummary};
pub use record::{clean_text, map_product, ProductRecord, FIELDS};
