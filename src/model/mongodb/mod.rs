mod bson;
mod collection;
mod counter;
mod errors;

pub use bson::{opt_chrono_datetime_as_bson_datetime, u32_id_filter, Id};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{
    ensure_counters_exist, Counter, CANDIDATE_COUNTER_ID, USER_COUNTER_ID, VOTER_COUNTER_ID,
};
pub use errors::is_duplicate_key_error;
