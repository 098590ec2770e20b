pub mod api;
pub mod config;
pub mod feed;
pub mod filter;
pub mod import;
pub mod links;
pub mod model;
pub mod view;
