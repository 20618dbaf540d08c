use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::FilterError;

/// Query-string keys that carry paging, sorting or date bounds instead of a field filter.
pub const RESERVED_KEYS: &[&str] = &[
    "page",
    "limit",
    "sort_by",
    "sortBy",
    "sort_order",
    "sortOrder",
    "fecha_inicio",
    "start_date",
    "fecha_fin",
    "end_date",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn parse(value: &str) -> Result<Self, FilterError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            _ => Err(FilterError::InvalidSortOrder(value.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Typed scalar used both as a SQL bind parameter and for in-memory comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Ordering between values of the same variant. Mixed variants compare equal.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => a.cmp(b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Case-insensitive substring match.
    Text,
    /// Exact match against one of the allowed values.
    Enum(&'static [&'static str]),
    Integer,
    Bool,
    Timestamp,
    Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub sortable: bool,
    pub filterable: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, sortable: true, filterable: true }
    }

    /// Sortable but never matched by value (timestamps, identifiers).
    pub const fn sort_only(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, sortable: true, filterable: false }
    }

    /// Neither filterable nor sortable; still a known column.
    pub const fn hidden(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, sortable: false, filterable: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals { field: String, value: FieldValue },
    NotEquals { field: String, value: FieldValue },
    /// Case-insensitive substring match; the needle is the raw user text.
    Contains { field: String, needle: String },
    /// Inclusive bounds on a timestamp field.
    Range {
        field: String,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

impl Condition {
    pub fn field(&self) -> &str {
        match self {
            Condition::Equals { field, .. }
            | Condition::NotEquals { field, .. }
            | Condition::Contains { field, .. }
            | Condition::Range { field, .. } => field,
        }
    }
}

/// Conjunction of conditions. Soft-deleted records are excluded unless `include_deleted`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    pub conditions: Vec<Condition>,
    pub include_deleted: bool,
}

impl Predicate {
    /// Matches every live record.
    pub fn live() -> Self {
        Self::default()
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn equals(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.with(Condition::Equals { field: field.into(), value })
    }

    pub fn not_equals(self, field: impl Into<String>, value: FieldValue) -> Self {
        self.with(Condition::NotEquals { field: field.into(), value })
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Resolved sort for a listing. Stores always break ties on `id` ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOrder {
    pub field: String,
    pub direction: SortDirection,
}

impl RecordOrder {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self { field: field.into(), direction }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub filters: BTreeMap<String, String>,
    pub date_range: DateRange,
    pub page: i64,
    pub limit: i64,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortDirection>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            filters: BTreeMap::new(),
            date_range: DateRange::default(),
            page: 1,
            limit: crate::config::CONFIG.pagination.default_limit,
            sort_by: None,
            sort_order: None,
        }
    }
}

impl SearchRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page, limit, ..Default::default() }
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: Option<SortDirection>) -> Self {
        self.sort_by = Some(field.into());
        self.sort_order = direction;
        self
    }

    /// Binds raw query-string pairs. Empty values are treated as absent.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, FilterError> {
        let mut request = SearchRequest::default();

        let get = |keys: &[&str]| -> Option<&str> {
            keys.iter()
                .filter_map(|k| params.get(*k))
                .map(|v| v.trim())
                .find(|v| !v.is_empty())
        };

        if let Some(page) = get(&["page"]) {
            request.page = page
                .parse()
                .map_err(|_| FilterError::InvalidPage(format!("'{}' is not a number", page)))?;
        }
        if let Some(limit) = get(&["limit"]) {
            request.limit = limit
                .parse()
                .map_err(|_| FilterError::InvalidLimit(format!("'{}' is not a number", limit)))?;
        }
        request.sort_by = get(&["sort_by", "sortBy"]).map(str::to_string);
        request.sort_order = get(&["sort_order", "sortOrder"])
            .map(SortDirection::parse)
            .transpose()?;

        if let Some(start) = get(&["fecha_inicio", "start_date"]) {
            request.date_range.start = Some(parse_date_bound(start, "fecha_inicio", false)?);
        }
        if let Some(end) = get(&["fecha_fin", "end_date"]) {
            request.date_range.end = Some(parse_date_bound(end, "fecha_fin", true)?);
        }

        for (key, value) in params {
            if RESERVED_KEYS.contains(&key.as_str()) || value.trim().is_empty() {
                continue;
            }
            request.filters.insert(key.clone(), value.trim().to_string());
        }

        Ok(request)
    }
}

/// Accepts RFC 3339 or `YYYY-MM-DD`. A plain end date covers the whole day.
pub fn parse_date_bound(value: &str, field: &str, end_of_day: bool) -> Result<DateTime<Utc>, FilterError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    let invalid = || FilterError::InvalidDate { field: field.to_string(), value: value.to_string() };
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    let naive = if end_of_day {
        date.and_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
    .ok_or_else(invalid)?;
    Ok(Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<FieldValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn binds_paging_sorting_and_filters() {
        let req = SearchRequest::from_query(&params(&[
            ("page", "3"),
            ("limit", "25"),
            ("sortBy", "orden"),
            ("sort_order", "DESC"),
            ("grado", "CAP"),
            ("cip", ""),
        ]))
        .unwrap();

        assert_eq!(req.page, 3);
        assert_eq!(req.limit, 25);
        assert_eq!(req.sort_by.as_deref(), Some("orden"));
        assert_eq!(req.sort_order, Some(SortDirection::Desc));
        assert_eq!(req.filters.get("grado").map(String::as_str), Some("CAP"));
        assert!(!req.filters.contains_key("cip"));
    }

    #[test]
    fn defaults_apply_when_absent() {
        let req = SearchRequest::from_query(&HashMap::new()).unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 10);
        assert!(req.sort_by.is_none());
        assert!(req.date_range.is_empty());
    }

    #[test]
    fn rejects_non_numeric_page() {
        let err = SearchRequest::from_query(&params(&[("page", "two")])).unwrap_err();
        assert!(matches!(err, FilterError::InvalidPage(_)));
    }

    #[test]
    fn rejects_unknown_sort_order() {
        let err = SearchRequest::from_query(&params(&[("sort_order", "sideways")])).unwrap_err();
        assert_eq!(err, FilterError::InvalidSortOrder("sideways".to_string()));
    }

    #[test]
    fn plain_end_date_is_inclusive_of_whole_day() {
        let req = SearchRequest::from_query(&params(&[
            ("fecha_inicio", "2024-01-01"),
            ("fecha_fin", "2024-01-31"),
        ]))
        .unwrap();
        let start = req.date_range.start.unwrap();
        let end = req.date_range.end.unwrap();
        assert_eq!(start.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(end.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-31 23:59:59");
    }

    #[test]
    fn accepts_rfc3339_dates() {
        let ts = parse_date_bound("2024-05-02T10:30:00Z", "fecha_inicio", false).unwrap();
        assert_eq!(ts.format("%H:%M").to_string(), "10:30");
        assert!(parse_date_bound("02/05/2024", "fecha_inicio", false).is_err());
    }
}
