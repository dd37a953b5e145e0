use serde::{Deserialize, Serialize};

/// Default page size when none is requested.
pub const DEFAULT_LIMIT: u32 = 100;

/// Page parameters of a list request, e.g. `?limit=20&offset=40`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromForm)]
pub struct PaginationRequest {
    #[field(default = DEFAULT_LIMIT)]
    #[field(validate = range(1..))]
    pub limit: u32,
    #[field(default = 0)]
    pub offset: u32,
}

impl PaginationRequest {
    pub fn wrap<T>(self, items: Vec<T>, total: u64) -> Paginated<T> {
        Paginated {
            items,
            total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// One page of a longer list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}
