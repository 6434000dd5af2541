pub mod config;
pub mod domain;
pub mod encode;
pub mod error;
pub mod manifest;
pub mod metadata;
pub mod output;
pub mod reconcile;
pub mod sanitize;
pub mod sheets;
pub mod store;
pub mod sync;
