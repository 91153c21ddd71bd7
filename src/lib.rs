pub mod browser;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod filter;
pub mod loader;
pub mod metadata;
pub mod omero;
pub mod orphaned;
pub mod output;
pub mod repository;
pub mod session;
pub mod thumbnail;
pub mod uri;
