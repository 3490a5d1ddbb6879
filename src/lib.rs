pub mod config;
pub mod db;
pub mod errors;
pub mod jupiter;
pub mod ledger;
pub mod models;
pub mod monitoring;
pub mod solana;
pub mod strategy;
pub mod utils;
