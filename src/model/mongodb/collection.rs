use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::config::Isolation;
use crate::model::db::{
    candidate::Candidate,
    user::User,
    vote::{NullVote, Vote},
    voter::Voter,
};

use super::counter::Counter;

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MongoCollection for User {
    const NAME: &'static str = "users";
}

impl MongoCollection for Voter {
    const NAME: &'static str = "voters";
}

/// All three categories share one collection, distinguished by `category`.
impl MongoCollection for Candidate {
    const NAME: &'static str = "candidates";
}

/// All three category ledgers share one collection, distinguished by `category`.
impl MongoCollection for Vote {
    const NAME: &'static str = "votes";
}

impl MongoCollection for NullVote {
    const NAME: &'static str = "null_votes";
}

impl MongoCollection for Counter {
    const NAME: &'static str = "counters";
}

/// Ensure that all the required indexes exist on the given database.
///
/// Under [`Isolation::Serializable`] the vote ledger gets a unique
/// `(voter_id, category)` index, which is what finally rejects a second
/// vote that slipped past a concurrent eligibility check. Under
/// [`Isolation::Racy`] the same keys are indexed without the constraint.
///
/// This operation is idempotent, but an existing index is never relaxed:
/// switching a database from serializable to racy requires dropping
/// `voter_category` by hand.
pub async fn ensure_indexes_exist(db: &Database, isolation: Isolation) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // User collection.
    let user_index = IndexModel::builder()
        .keys(doc! {"correo": 1})
        .options(unique.clone())
        .build();
    Coll::<User>::from_db(db)
        .create_index(user_index, None)
        .await?;

    // Voter collection.
    let voter_index = IndexModel::builder()
        .keys(doc! {"national_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Voter>::from_db(db)
        .create_index(voter_index, None)
        .await?;

    // Candidate collection.
    let candidate_index = IndexModel::builder()
        .keys(doc! {"category": 1, "_id": 1})
        .build();
    Coll::<Candidate>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    // Vote ledger.
    let ledger_options = IndexOptions::builder()
        .name("voter_category".to_string())
        .unique(isolation == Isolation::Serializable)
        .build();
    let ledger_index = IndexModel::builder()
        .keys(doc! {"voter_id": 1, "category": 1})
        .options(ledger_options)
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(ledger_index, None)
        .await?;

    // Null vote ledger.
    let null_index = IndexModel::builder().keys(doc! {"voter_id": 1}).build();
    Coll::<NullVote>::from_db(db)
        .create_index(null_index, None)
        .await?;

    Ok(())
}
