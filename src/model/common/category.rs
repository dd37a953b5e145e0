use std::fmt::{Display, Formatter};

use mongodb::bson::Bson;
use rocket::request::FromParam;
use serde::{Deserialize, Serialize};

/// The independent ballots a voter may each vote in once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Presidential,
    Regional,
    District,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Presidential, Self::Regional, Self::District];

    /// Path segment naming a single ballot, e.g. `/votos/presidencial`.
    pub fn singular(self) -> &'static str {
        match self {
            Self::Presidential => "presidencial",
            Self::Regional => "regional",
            Self::District => "distrital",
        }
    }

    /// Path segment naming the candidate list, e.g. `/candidatos/presidenciales`.
    pub fn plural(self) -> &'static str {
        match self {
            Self::Presidential => "presidenciales",
            Self::Regional => "regionales",
            Self::District => "distritales",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.singular())
    }
}

impl From<Category> for Bson {
    fn from(category: Category) -> Self {
        let name = match category {
            Category::Presidential => "presidential",
            Category::Regional => "regional",
            Category::District => "district",
        };
        Bson::String(name.to_string())
    }
}

/// Error for a path segment that names no category.
#[derive(Debug, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl Category {
    fn from_singular(param: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| param == category.singular())
    }

    fn from_plural(param: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| param == category.plural())
    }
}

/// Ballot routes (`/votos`, `/resultados`) take the singular spelling only.
impl<'a> FromParam<'a> for Category {
    type Error = UnknownCategory;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        Self::from_singular(param).ok_or_else(|| UnknownCategory(param.to_string()))
    }
}

/// A category named in a `/candidatos` path, where the plural spelling
/// (`/candidatos/presidenciales`) is accepted as well as the singular.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CandidateCategory(pub Category);

impl<'a> FromParam<'a> for CandidateCategory {
    type Error = UnknownCategory;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        Category::from_singular(param)
            .or_else(|| Category::from_plural(param))
            .map(Self)
            .ok_or_else(|| UnknownCategory(param.to_string()))
    }
}
