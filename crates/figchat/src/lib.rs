pub mod agent;
pub mod catalog;
pub mod errors;
pub mod mcp;
pub mod models;
pub mod providers;
pub mod stream;
pub mod systems;
