//! Network side of shellcache.
//!
//! This crate provides the reqwest-backed [`Transport`](shellcache_core::Transport)
//! the router fetches through, and URL resolution against the site origin.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, UrlError, canonicalize, resolve};
