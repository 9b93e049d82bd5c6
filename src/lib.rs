pub mod config;
pub mod driver;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod scraper;
pub mod storage;
pub mod utils;
