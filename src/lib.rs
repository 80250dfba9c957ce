pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

#[cfg(test)]
mod test_support;
