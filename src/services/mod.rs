pub mod collector;
pub mod details;
pub mod driver;
pub mod enrich;
pub mod merge;
pub mod pipeline;
pub mod store;
pub mod webdriver;
