pub mod config;
pub mod db;
pub mod error;
pub mod lessons;
pub mod models;
pub mod query;
pub mod routes;
pub mod schedule;
