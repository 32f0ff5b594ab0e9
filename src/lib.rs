pub mod auth;
pub mod configuration;
pub mod error;
pub mod media_client;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod users;
pub mod validators;
