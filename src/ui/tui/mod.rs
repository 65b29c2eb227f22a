mod app;
mod listing;
mod render;

pub use app::{run_browser, App, StatusSink};
pub use listing::{DirListing, Entry};
