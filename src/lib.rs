pub mod api;
pub mod benchmark;
pub mod news_prediction;
pub mod utils;
