use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{common::VoterId, mongodb::opt_chrono_datetime_as_bson_datetime};

/// Voter identity data as submitted at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVoter {
    /// National identity document number, unique among voters.
    pub national_id: String,
    pub given_names: String,
    pub surnames: String,
    pub birth_date: NaiveDate,
    pub region: String,
    pub district: String,
}

/// A registered voter from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: VoterId,
    pub national_id: String,
    pub given_names: String,
    pub surnames: String,
    pub birth_date: NaiveDate,
    pub region: String,
    pub district: String,
    /// When the voter last had a vote recorded, if ever.
    #[serde(default, with = "opt_chrono_datetime_as_bson_datetime")]
    pub last_vote_at: Option<DateTime<Utc>>,
}

impl Voter {
    /// Give a newly registered voter its ID. Registered voters have never voted.
    pub fn new(id: VoterId, voter: NewVoter) -> Self {
        Self {
            id,
            national_id: voter.national_id,
            given_names: voter.given_names,
            surnames: voter.surnames,
            birth_date: voter.birth_date,
            region: voter.region,
            district: voter.district,
            last_vote_at: None,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl NewVoter {
        pub fn example() -> Self {
            Self {
                national_id: "12345678".to_string(),
                given_names: "Rosa Elvira".to_string(),
                surnames: "Quispe Mamani".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1988, 3, 21).unwrap(),
                region: "Cusco".to_string(),
                district: "Wanchaq".to_string(),
            }
        }

        pub fn example2() -> Self {
            Self {
                national_id: "87654321".to_string(),
                given_names: "Jorge Luis".to_string(),
                surnames: "Huamán Torres".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1975, 11, 2).unwrap(),
                region: "Lima".to_string(),
                district: "Miraflores".to_string(),
            }
        }
    }
}
