pub mod clock;
pub mod config;
pub mod filter;
pub mod handlers;
pub mod menu;
pub mod models;
pub mod overdue;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
