mod error;
mod traits;
mod types;

pub use error::{Result, StorageError};
pub use traits::{Connection, Connector};
pub use types::{validate_name, CREATED_AT_INDEX, TODOS_TABLE};
