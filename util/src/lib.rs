pub mod config;
pub mod state;
pub mod validation;
pub mod ws;
