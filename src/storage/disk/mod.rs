mod disk_manager;
mod page_bitmap;

pub use disk_manager::*;
pub use page_bitmap::*;
