pub mod app;
pub mod catalog;
pub mod config;
pub mod dates;
pub mod domain;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod output;
pub mod resolver;
pub mod store;
