mod codec;
mod data_type;
mod record;
mod schema;
mod value;

pub use codec::RecordCodec;
pub use data_type::DataType;
pub use record::Record;
pub use schema::{Column, Schema, SchemaBuilder};
pub use value::Value;
