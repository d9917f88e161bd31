pub mod config;
pub mod parse_id;
pub mod providers;
pub mod schema;
