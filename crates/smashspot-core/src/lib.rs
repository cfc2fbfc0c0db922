// Library root for the matchup scoring engine.
//
// Pipeline stages, leaves first: snapshot -> context (canonical lines/props,
// league percentiles) -> eligibility -> scoring -> aggregate -> feed.

pub mod aggregate;
pub mod config;
pub mod context;
pub mod db;
pub mod eligibility;
pub mod factors;
pub mod feed;
pub mod import;
pub mod market;
pub mod model;
pub mod percentile;
pub mod scoring;
pub mod snapshot;
