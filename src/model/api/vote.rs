use serde::{Deserialize, Serialize};

use crate::model::common::{CandidateId, VoterId};

/// A vote in one category, as submitted by a client.
///
/// Regional and district ballots traditionally name the candidate field
/// after their category; both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSpec {
    pub id_votantes: VoterId,
    #[serde(alias = "id_candidato_regional", alias = "id_candidato_distrital")]
    pub id_candidato: CandidateId,
}

/// A null vote, as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullVoteSpec {
    pub id_votantes: VoterId,
    pub dni: String,
}

/// A plain confirmation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json;

    use super::*;

    #[test]
    fn category_specific_candidate_fields() {
        let regional: VoteSpec = serde_json::from_str(
            r#"{"id_votantes": 1, "id_candidato_regional": 4, "region": "Cusco"}"#,
        )
        .unwrap();
        let district: VoteSpec =
            serde_json::from_str(r#"{"id_votantes": 1, "id_candidato_distrital": 5}"#).unwrap();
        let presidential: VoteSpec =
            serde_json::from_str(r#"{"id_votantes": 1, "id_candidato": 6}"#).unwrap();
        assert_eq!(
            (
                regional.id_candidato,
                district.id_candidato,
                presidential.id_candidato
            ),
            (4, 5, 6)
        );

        assert!(serde_json::from_str::<VoteSpec>(r#"{"id_votantes": 1}"#).is_err());
    }
}
