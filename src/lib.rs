//! Travel guide admin backend.
//!
//! REST API used by the admin dashboard to curate destinations ("places")
//! and the homestays, hotels and nearby sights grouped under each place.
//! Records live in Sled trees; mutating routes require an admin session token.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod rest;
pub mod storage;
