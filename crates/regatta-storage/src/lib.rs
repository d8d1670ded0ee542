mod record;
mod schema;
mod table;

pub use record::Record;
pub use schema::{Field, FieldMode, Schema};
pub use table::Table;
