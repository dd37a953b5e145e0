use serde::{Deserialize, Serialize};

use crate::model::{
    common::{CandidateId, Category},
    db::candidate::{Candidate, NewCandidate},
};

/// A new candidate, as submitted by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub nombres: String,
    pub apellidos: String,
}

impl CandidateSpec {
    pub fn into_candidate(self, category: Category) -> NewCandidate {
        NewCandidate::new(category, self.nombres, self.apellidos)
    }
}

/// A candidate and its running tally, as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDesc {
    pub id: CandidateId,
    pub nombres: String,
    pub apellidos: String,
    pub nombre_completo: String,
    pub cantidad_votos: u64,
}

impl From<Candidate> for CandidateDesc {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            nombre_completo: candidate.full_name(),
            cantidad_votos: candidate.votes,
            nombres: candidate.candidate.given_names,
            apellidos: candidate.candidate.surnames,
        }
    }
}

/// Response to a successful candidate creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCreated {
    pub id: CandidateId,
    pub nombres: String,
    pub apellidos: String,
    pub message: String,
}

impl From<Candidate> for CandidateCreated {
    fn from(candidate: Candidate) -> Self {
        Self {
            message: format!("Candidato {} creado exitosamente", candidate.category),
            id: candidate.id,
            nombres: candidate.candidate.given_names,
            apellidos: candidate.candidate.surnames,
        }
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateSpec {
        pub fn example() -> Self {
            Self {
                nombres: "Ana María".into(),
                apellidos: "Flores Rojas".into(),
            }
        }
    }
}
