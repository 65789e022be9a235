mod bson;
mod collection;
mod errors;

pub use bson::{id_to_string, string_id_filter, Id};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use errors::{is_permission_denied, UNAUTHORIZED};
