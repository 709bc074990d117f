// src/http/mod.rs
//! JSON API over hyper. Every body is wrapped in the `{ code, message, data }`
//! envelope.
pub mod cors;
pub mod handlers;
pub mod router;
pub mod server;

pub use router::Api;
pub use server::{run, serve};
