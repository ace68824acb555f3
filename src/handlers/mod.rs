// Handlers are grouped by the access they require:
// public (no token), protected (/api/*, any active account) and
// elevated (/api/admin/*, admin roles checked by the services).
pub mod elevated;
pub mod protected;
pub mod public;

use serde::Deserialize;

use crate::api::PageRequest;

/// `?page=&limit=` shared by every listing endpoint
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}
