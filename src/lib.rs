pub mod api;
pub mod app;
pub mod attendance;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod jobs;
pub mod model;
pub mod notify;
pub mod routes;
pub mod store;
pub mod utils;
