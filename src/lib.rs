//! Plankjes - storefront and back office for the Zaanse Plankjes Maffia studio
//!
//! This library provides the gallery, order and form handling behind the
//! studio's website, stored in MySQL/SQLite with JSON files as a fallback.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
