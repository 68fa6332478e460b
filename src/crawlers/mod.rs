pub mod crawler;
pub mod web;

pub use crawler::PageFetcher;
pub use web::WebDriverFetcher;
