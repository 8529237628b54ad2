//! Translation of STIX-style filter trees into Infoblox native queries, and
//! windowed retrieval of their results across the dnsEventData, tideDbData
//! and dossierData dialects.

pub mod config;
pub mod connector;
pub mod dialect;
pub mod error;
pub mod format;
pub mod mapping;
pub mod models;
pub mod pagination;
pub mod pattern;
pub mod telemetry;
pub mod time;
pub mod translate;
pub mod transport;
pub mod value;

pub use connector::Connector;
pub use dialect::Dialect;
pub use translate::{translate, translate_pattern};
