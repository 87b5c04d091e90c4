pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod model;
pub mod notification;
pub mod payment;
pub mod storage;
pub mod telemetry;

pub use client::MwanamamaClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ErrorKind, MwanamamaError};
