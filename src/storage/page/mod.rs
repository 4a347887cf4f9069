mod data_page;
mod header_page;
mod link;

pub use data_page::*;
pub use header_page::*;
pub use link::*;
