pub mod config;
pub mod domain;
pub mod http;
pub mod mqtt;
pub mod realtime;
pub mod runner;
pub mod store;
