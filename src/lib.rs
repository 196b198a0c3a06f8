//! Educational-attainment choropleth of US counties.
//!
//! The pipeline fetches a county topology and per-county statistics,
//! joins them by FIPS code, colors each county with a threshold scale
//! and draws the result, with a legend and hover tooltip, into a single
//! HTML page.

pub mod config;
pub mod data;
pub mod error;
pub mod interaction;
pub mod projection;
pub mod render;
pub mod scale;
pub mod server;
pub mod topology;
pub mod types;

#[cfg(test)]
mod fixtures;
