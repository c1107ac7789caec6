use serde::{Deserialize, Serialize};

/// Envelope for every API response: `{success, data, pagination}` on
/// the happy path, `{success: false, error}` otherwise.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), pagination: None, error: None }
    }

    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self { success: true, data: Some(data), pagination: Some(pagination), error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, data: None, pagination: None, error: Some(message.into()) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

/// Normalized pagination window: page ≥ 1, per_page default 20 and
/// capped at 100.
#[derive(Debug, Clone, Copy)]
pub struct PageWindow {
    pub page: u32,
    pub per_page: u32,
}

impl PageWindow {
    pub const DEFAULT_PER_PAGE: u32 = 20;
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn clamp(page: Option<u32>, per_page: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE);
        Self { page, per_page }
    }

    // u64 arithmetic: `page` comes straight from the client and
    // page * per_page can exceed u32.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    pub fn pagination(&self, total: u64) -> Pagination {
        let total_pages = total.div_ceil(self.per_page as u64);
        Pagination { page: self.page, per_page: self.per_page, total, total_pages }
    }
}

#[derive(Debug, Deserialize)]
pub struct FundsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub class: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BondsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub security_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssuersQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_applies_defaults_and_caps() {
        let w = PageWindow::clamp(None, None);
        assert_eq!((w.page, w.per_page), (1, 20));

        let w = PageWindow::clamp(Some(0), Some(500));
        assert_eq!((w.page, w.per_page), (1, 100));

        let w = PageWindow::clamp(Some(3), Some(50));
        assert_eq!(w.offset(), 100);
    }

    #[test]
    fn offset_survives_maximum_page_number() {
        let w = PageWindow::clamp(Some(u32::MAX), Some(100));
        assert_eq!(w.offset(), (u32::MAX as u64 - 1) * 100);
    }

    #[test]
    fn pagination_counts_partial_last_page() {
        let w = PageWindow::clamp(Some(1), Some(20));
        let p = w.pagination(41);
        assert_eq!(p.total_pages, 3);
        let p = w.pagination(0);
        assert_eq!(p.total_pages, 0);
    }
}
