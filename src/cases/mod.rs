mod lookup;
mod schema;
mod table;

pub use lookup::{NO_CASE_REPORTED, lookup_case};
pub use schema::{CASE_NUMBER_COLUMN, CHANNEL_COLUMN, describe_schema};
pub use table::{CaseTable, Cell, TableError};
