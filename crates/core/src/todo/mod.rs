mod error;
mod merge;
mod operations;
mod types;

pub use error::TodoError;
pub use merge::apply_patch;
pub use operations::{parse_body, prepare_delete, prepare_new, prepare_update};
pub use types::{
    format_timestamp, NewTodo, Todo, TodoPatch, CREATED_AT_FIELD, ID_FIELD, SAVING_FIELD,
};
