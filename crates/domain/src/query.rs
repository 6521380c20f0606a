//! List query surface for document headers.
//!
//! Raw parameters arrive as a [`ListRequest`] and are validated into a
//! [`ListQuery`] before any store is touched. Sorting is restricted to an
//! allow-list; an unknown column is an error, never a silent fallback.

use std::cmp::Ordering;

use chrono::NaiveDate;
use common::{BusinessId, CounterpartyId};
use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentStatus, PaymentStatus};
use crate::error::ValidationError;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Header columns a list can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Code,
    Date,
    Status,
    PaymentStatus,
    TotalAmount,
    CreatedAt,
    UpdatedAt,
}

impl SortColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::Code => "code",
            SortColumn::Date => "date",
            SortColumn::Status => "status",
            SortColumn::PaymentStatus => "payment_status",
            SortColumn::TotalAmount => "total_amount",
            SortColumn::CreatedAt => "created_at",
            SortColumn::UpdatedAt => "updated_at",
        }
    }

    /// Parses a column name against the allow-list.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        match name {
            "code" => Ok(SortColumn::Code),
            "date" => Ok(SortColumn::Date),
            "status" => Ok(SortColumn::Status),
            "payment_status" => Ok(SortColumn::PaymentStatus),
            "total_amount" => Ok(SortColumn::TotalAmount),
            "created_at" => Ok(SortColumn::CreatedAt),
            "updated_at" => Ok(SortColumn::UpdatedAt),
            other => Err(ValidationError::UnknownSortColumn(other.to_string())),
        }
    }

    /// Compares two headers on this column, ascending.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        match self {
            SortColumn::Code => a.code.cmp(&b.code),
            SortColumn::Date => a.date.cmp(&b.date),
            SortColumn::Status => a.status.as_str().cmp(b.status.as_str()),
            SortColumn::PaymentStatus => a.payment_status.as_str().cmp(b.payment_status.as_str()),
            SortColumn::TotalAmount => a.total_amount.cmp(&b.total_amount),
            SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
            SortColumn::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        match name.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(ValidationError::UnknownSortDirection(name.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Sort {
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ordering = self.column.compare(a, b);
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            column: SortColumn::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

/// Header filters, combined with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    /// Case-insensitive substring over code and notes.
    pub search: Option<String>,
    /// Inclusive lower bound on the document date.
    pub from_date: Option<NaiveDate>,
    /// Inclusive upper bound on the document date.
    pub to_date: Option<NaiveDate>,
    pub status: Option<DocumentStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub counterparty_id: Option<CounterpartyId>,
    pub business_id: Option<BusinessId>,
}

impl DocumentFilter {
    pub fn matches(&self, document: &Document) -> bool {
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let in_code = document.code.to_lowercase().contains(&term);
            let in_notes = document
                .notes
                .as_ref()
                .is_some_and(|n| n.to_lowercase().contains(&term));
            if !in_code && !in_notes {
                return false;
            }
        }
        if let Some(from) = self.from_date
            && document.date < from
        {
            return false;
        }
        if let Some(to) = self.to_date
            && document.date > to
        {
            return false;
        }
        if let Some(status) = self.status
            && document.status != status
        {
            return false;
        }
        if let Some(payment_status) = self.payment_status
            && document.payment_status != payment_status
        {
            return false;
        }
        if let Some(counterparty_id) = self.counterparty_id
            && document.counterparty_id != Some(counterparty_id)
        {
            return false;
        }
        if let Some(business_id) = self.business_id
            && document.business_id != business_id
        {
            return false;
        }
        true
    }
}

/// Unvalidated list parameters, as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListRequest {
    /// 1-based page number.
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
    pub search: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub counterparty_id: Option<CounterpartyId>,
    pub business_id: Option<BusinessId>,
}

impl ListRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    pub fn sort_by(mut self, column: impl Into<String>, direction: impl Into<String>) -> Self {
        self.sort_by = Some(column.into());
        self.sort_direction = Some(direction.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from_date = Some(from);
        self.to_date = Some(to);
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Validates the parameters and resolves defaults.
    pub fn validate(self) -> Result<ListQuery, ValidationError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(ValidationError::InvalidPage(page));
        }

        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ValidationError::InvalidPageSize {
                size: page_size,
                max: MAX_PAGE_SIZE,
            });
        }

        let default_sort = Sort::default();
        let column = match self.sort_by.as_deref() {
            Some(name) => SortColumn::parse(name)?,
            None => default_sort.column,
        };
        let direction = match self.sort_direction.as_deref() {
            Some(name) => SortDirection::parse(name)?,
            None => default_sort.direction,
        };

        if let (Some(from), Some(to)) = (self.from_date, self.to_date)
            && from > to
        {
            return Err(ValidationError::InvalidDateRange { from, to });
        }

        let status: Option<DocumentStatus> = self.status.as_deref().map(str::parse).transpose()?;
        let payment_status: Option<PaymentStatus> =
            self.payment_status.as_deref().map(str::parse).transpose()?;
        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(ListQuery {
            page,
            page_size,
            sort: Sort { column, direction },
            filter: DocumentFilter {
                search,
                from_date: self.from_date,
                to_date: self.to_date,
                status,
                payment_status,
                counterparty_id: self.counterparty_id,
                business_id: self.business_id,
            },
        })
    }
}

/// A validated list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    pub sort: Sort,
    pub filter: DocumentFilter,
}

impl ListQuery {
    /// Number of rows to skip.
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.page_size as usize
    }

    /// Maximum number of rows to return.
    pub fn limit(&self) -> usize {
        self.page_size as usize
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: Sort::default(),
            filter: DocumentFilter::default(),
        }
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.page_size.max(1) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_defaults() {
        let query = ListRequest::new().validate().unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(query.sort, Sort::default());
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_offset_and_limit() {
        let query = ListRequest::new().page(3, 25).validate().unwrap();
        assert_eq!(query.offset(), 50);
        assert_eq!(query.limit(), 25);
    }

    #[test]
    fn test_sort_column_outside_allow_list_rejected() {
        let result = ListRequest::new().sort_by("drop_table", "asc").validate();
        assert_eq!(
            result,
            Err(ValidationError::UnknownSortColumn("drop_table".to_string()))
        );
    }

    #[test]
    fn test_sort_direction_rejected() {
        let result = ListRequest::new().sort_by("date", "sideways").validate();
        assert!(matches!(result, Err(ValidationError::UnknownSortDirection(_))));
    }

    #[test]
    fn test_allow_listed_sort_accepted() {
        let query = ListRequest::new().sort_by("total_amount", "ASC").validate().unwrap();
        assert_eq!(query.sort.column, SortColumn::TotalAmount);
        assert_eq!(query.sort.direction, SortDirection::Asc);
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(
            ListRequest::new().page(0, 10).validate(),
            Err(ValidationError::InvalidPage(0))
        );
        assert!(matches!(
            ListRequest::new().page(1, 0).validate(),
            Err(ValidationError::InvalidPageSize { .. })
        ));
        assert!(matches!(
            ListRequest::new().page(1, MAX_PAGE_SIZE + 1).validate(),
            Err(ValidationError::InvalidPageSize { .. })
        ));
    }

    #[test]
    fn test_inverted_date_range_rejected() {
        let result = ListRequest::new().date_range(date(10), date(2)).validate();
        assert!(matches!(result, Err(ValidationError::InvalidDateRange { .. })));
    }

    #[test]
    fn test_status_filter_parsed() {
        let query = ListRequest::new().status("completed").validate().unwrap();
        assert_eq!(query.filter.status, Some(DocumentStatus::Completed));
        assert!(ListRequest::new().status("archived").validate().is_err());
    }

    #[test]
    fn test_blank_search_dropped() {
        let query = ListRequest::new().search("   ").validate().unwrap();
        assert!(query.filter.search.is_none());
    }

    #[test]
    fn test_total_pages() {
        let page: Page<u8> = Page {
            items: vec![],
            page: 1,
            page_size: 10,
            total: 21,
        };
        assert_eq!(page.total_pages(), 3);
    }
}
