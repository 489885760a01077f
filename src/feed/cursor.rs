use crate::traits::FeedQuery;

/// Offset into the server-ordered feed plus the page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    pub offset: usize,
    pub limit: usize,
}

impl PaginationCursor {
    pub fn new(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Move past a page appended by load-more.
    pub fn advance(&mut self, received: usize) {
        self.offset += received;
    }

    /// Point just past a page that replaced the whole collection.
    pub fn replace(&mut self, received: usize) {
        self.offset = received;
    }

    /// Query for the next page, or for the first page when not continuing.
    pub fn query(&self, continuing: bool, refresh: bool) -> FeedQuery {
        FeedQuery {
            limit: self.limit,
            offset: if continuing { self.offset } else { 0 },
            refresh,
        }
    }

    /// A full page means the server may have more.
    pub fn is_full_page(&self, received: usize) -> bool {
        received == self.limit
    }
}
