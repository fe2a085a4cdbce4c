// src/lib.rs

pub mod config;
pub mod dedup;
pub mod matching;
pub mod models;
pub mod utils;

pub use models::{Evidence, Intervention, NewEvidenceLink};
pub use utils::db_connect::PgPool;
