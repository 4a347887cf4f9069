mod relation;

pub use relation::*;
