pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod offline;
pub mod readiness;
pub mod realtime;
pub mod repositories;
pub mod reset;
pub mod routes;
pub mod seed;
pub mod session;
pub mod version;
