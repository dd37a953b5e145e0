use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::VoterId,
    db::voter::{NewVoter, Voter},
};

/// A voter registration, as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterSpec {
    pub dni: String,
    pub nombres: String,
    pub apellidos: String,
    pub fecha_nacimiento: NaiveDate,
    pub region: String,
    pub distrito: String,
}

impl From<VoterSpec> for NewVoter {
    fn from(spec: VoterSpec) -> Self {
        Self {
            national_id: spec.dni.trim().to_string(),
            given_names: spec.nombres,
            surnames: spec.apellidos,
            birth_date: spec.fecha_nacimiento,
            region: spec.region,
            district: spec.distrito,
        }
    }
}

/// A registered voter, as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterDesc {
    pub id_votantes: VoterId,
    pub dni: String,
    pub nombres: String,
    pub apellidos: String,
    pub fecha_nacimiento: NaiveDate,
    pub region: String,
    pub distrito: String,
    pub fecha_voto: Option<DateTime<Utc>>,
}

impl From<Voter> for VoterDesc {
    fn from(voter: Voter) -> Self {
        Self {
            id_votantes: voter.id,
            dni: voter.national_id,
            nombres: voter.given_names,
            apellidos: voter.surnames,
            fecha_nacimiento: voter.birth_date,
            region: voter.region,
            distrito: voter.district,
            fecha_voto: voter.last_vote_at,
        }
    }
}

/// Response to a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registered {
    pub id_votantes: VoterId,
    pub message: String,
}

#[cfg(test)]
mod examples {
    use super::*;

    impl VoterSpec {
        pub fn example() -> Self {
            let voter = NewVoter::example();
            Self {
                dni: voter.national_id,
                nombres: voter.given_names,
                apellidos: voter.surnames,
                fecha_nacimiento: voter.birth_date,
                region: voter.region,
                distrito: voter.district,
            }
        }
    }
}
