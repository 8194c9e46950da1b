//! ISS gateway — a typed query schema over the MOEX ISS REST API, discovered
//! from ISS reference pages at startup.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod naming;
pub mod rest;
pub mod schema;

pub use client::IssClient;
pub use config::{GatewayConfig, OnReferenceError, ReferenceSource};
pub use error::{GatewayError, GatewayResult};
pub use schema::{assemble, render_sdl, QuerySchema};
