use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl Pagination {
    /// Returns `(page, per_page, offset)`; page is 1-based, per_page clamped
    /// to 1..=100. The offset saturates for page numbers past the end.
    pub fn normalize(&self) -> (u64, u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    /// Page number, default 1
    pub page: Option<u64>,
    /// Items per page, default 20
    pub per_page: Option<u64>,
    /// Only products owned by this wholesaler
    pub wholesaler_id: Option<String>,
    /// Case-insensitive name search
    pub q: Option<String>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
