pub mod config;
pub mod model;
pub mod parsers;
pub mod services;
