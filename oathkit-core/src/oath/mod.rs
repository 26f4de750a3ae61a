//! OATH credential engine
//!
//! URI codec, code generation, and the service/client pair that manages
//! credential lifecycle.

pub mod algorithm;
pub mod client;
pub mod encoding;
pub mod service;
pub mod uri;

pub use client::OathClient;
pub use service::{LockTransition, OathConfiguration, OathService};
pub use uri::{format_uri, parse_uri};
