//! staticd - Minimal static file server
//!
//! Core library for request handling, path resolution and the accept loop.

pub mod config;
pub mod http;
pub mod server;
pub mod static_files;
