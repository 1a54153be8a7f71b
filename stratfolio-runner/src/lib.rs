//! Stratfolio Runner: allocation request orchestration and reporting.
//!
//! This crate builds on `stratfolio-core` to provide:
//! - End-to-end request handling (validate, resolve, fetch, score, allocate)
//! - Portfolio value history over the fetched window
//! - Request fingerprinting
//! - JSON/CSV artifact export and plain-text rendering

pub mod export;
pub mod history;
pub mod plan;
pub mod summary;

pub use export::{
    export_allocations_csv, export_history_csv, export_json, import_json, save_artifacts,
};
pub use history::{portfolio_value_history, ValuePoint};
pub use plan::{
    request_fingerprint, run_allocation, AllocationRequest, PlanError, PortfolioReport,
    SCHEMA_VERSION,
};
pub use summary::{render_catalog, render_details, render_summary};
