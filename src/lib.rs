pub mod api;
pub mod config;
pub mod console;
pub mod editor;
pub mod error;
pub mod export;
pub mod model;
pub mod poller;
pub mod store;
