//! Climate Data Store archive access.

pub mod client;
pub mod credentials;

pub use client::CdsClient;
pub use credentials::Credentials;
