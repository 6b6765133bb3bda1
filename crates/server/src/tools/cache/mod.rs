//! Cache maintenance MCP tools.
//!
//! Mirror the page-to-worker messages: size query, full clear, and a refresh
//! of the static assets.

pub mod clear;
pub mod size;
pub mod update;
