pub mod config;
pub mod http;
pub mod properties;
pub mod provider;
pub mod reconcile;
pub mod server;
pub mod types;
pub mod waf;
pub mod waiter;
