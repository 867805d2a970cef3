pub mod harvest;
pub mod show_config;
