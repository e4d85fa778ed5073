pub mod pager;

pub use pager::{process_listing_pages, RunStats};
