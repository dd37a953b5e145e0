use log::debug;
use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Coll;

/// Counter handing out user IDs.
pub const USER_COUNTER_ID: &str = "users";
/// Counter handing out voter IDs.
pub const VOTER_COUNTER_ID: &str = "voters";
/// Counter handing out candidate IDs, shared by all categories.
pub const CANDIDATE_COUNTER_ID: &str = "candidates";

const COUNTER_IDS: [&str; 3] = [USER_COUNTER_ID, VOTER_COUNTER_ID, CANDIDATE_COUNTER_ID];

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Create a new `Counter` with the given ID, starting at 1.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            next: 1,
        }
    }

    /// Take the next value, incrementing the counter.
    pub fn take(&mut self) -> u32 {
        let value = self.next;
        self.next += 1;
        value
    }

    /// Atomically retrieve the next value of the counter with the given ID.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u32> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?
            .ok_or_else(|| Error::not_found(format!("Contador '{id}'")))?;
        Ok(counter.next)
    }
}

/// Ensure every ID counter exists, without resetting any that already do.
///
/// This operation is idempotent.
pub async fn ensure_counters_exist(counters: &Coll<Counter>) -> Result<()> {
    debug!("Ensuring ID counters exist");
    let upsert = UpdateOptions::builder().upsert(true).build();
    for id in COUNTER_IDS {
        let fresh = Counter::new(id);
        counters
            .update_one(
                doc! { "_id": id },
                doc! { "$setOnInsert": { "next": fresh.next } },
                upsert.clone(),
            )
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_increments() {
        let mut counter = Counter::new(VOTER_COUNTER_ID);
        assert_eq!(counter.take(), 1);
        assert_eq!(counter.take(), 2);
        assert_eq!(counter.next, 3);
    }
}
