use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{
    Condition, FieldKind, FieldSpec, FieldValue, Predicate, RecordOrder, SearchRequest, SqlResult,
};
use crate::database::entity::Entity;

/// Query translator and SQL assembler for one record type.
///
/// `translate` turns a caller's `SearchRequest` into a store-neutral
/// `Predicate` and `RecordOrder`; the `to_*_sql` methods render whatever
/// predicate, order and window were assigned into parameterised Postgres.
pub struct Filter {
    table_name: &'static str,
    fields: &'static [FieldSpec],
    date_field: &'static str,
    default_sort: &'static str,
    predicate: Predicate,
    order: Option<RecordOrder>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(
        table_name: &'static str,
        fields: &'static [FieldSpec],
        date_field: &'static str,
        default_sort: &'static str,
    ) -> Result<Self, FilterError> {
        Self::validate_table_name(table_name)?;
        Ok(Self {
            table_name,
            fields,
            date_field,
            default_sort,
            predicate: Predicate::live(),
            order: None,
            limit: None,
            offset: None,
        })
    }

    pub fn for_entity<T: Entity>() -> Result<Self, FilterError> {
        Self::new(T::TABLE, T::FIELDS, T::DATE_FIELD, T::DEFAULT_SORT)
    }

    /// Validates a search request against this record type's fields.
    /// Absent or empty filter values impose no constraint.
    pub fn translate(&self, request: &SearchRequest) -> Result<(Predicate, RecordOrder), FilterError> {
        let mut predicate = Predicate::live();

        for (name, raw) in &request.filters {
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }
            let spec = self.field(name)?;
            if !spec.filterable {
                return Err(FilterError::UnknownField(name.clone()));
            }
            predicate = predicate.with(Self::condition_for(spec, value)?);
        }

        let range = &request.date_range;
        if let (Some(start), Some(end)) = (range.start, range.end) {
            if start > end {
                return Err(FilterError::InvalidDateRange {
                    start: start.to_rfc3339(),
                    end: end.to_rfc3339(),
                });
            }
        }
        if !range.is_empty() {
            predicate = predicate.with(Condition::Range {
                field: self.date_field.to_string(),
                start: range.start,
                end: range.end,
            });
        }

        let order = FilterOrder::resolve(
            request.sort_by.as_deref(),
            request.sort_order,
            self.fields,
            self.default_sort,
        )?;

        Ok((predicate, order))
    }

    fn condition_for(spec: &FieldSpec, value: &str) -> Result<Condition, FilterError> {
        let field = spec.name.to_string();
        let invalid = |reason: &str| FilterError::InvalidValue {
            field: spec.name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let condition = match spec.kind {
            FieldKind::Text => Condition::Contains { field, needle: value.to_string() },
            FieldKind::Enum(allowed) => {
                let matched = allowed
                    .iter()
                    .find(|a| a.eq_ignore_ascii_case(value))
                    .ok_or_else(|| invalid(&format!("expected one of {}", allowed.join(", "))))?;
                Condition::Equals { field, value: FieldValue::Text(matched.to_string()) }
            }
            FieldKind::Integer => {
                let n: i64 = value.parse().map_err(|_| invalid("expected an integer"))?;
                Condition::Equals { field, value: FieldValue::Integer(n) }
            }
            FieldKind::Bool => {
                let b: bool = value.parse().map_err(|_| invalid("expected true or false"))?;
                Condition::Equals { field, value: FieldValue::Bool(b) }
            }
            FieldKind::Uuid => {
                let id = uuid::Uuid::parse_str(value).map_err(|_| invalid("expected a UUID"))?;
                Condition::Equals { field, value: FieldValue::Uuid(id) }
            }
            FieldKind::Timestamp => return Err(invalid("timestamps are filtered by date range")),
        };
        Ok(condition)
    }

    fn field(&self, name: &str) -> Result<&'static FieldSpec, FilterError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| FilterError::UnknownField(name.to_string()))
    }

    /// Assigns a predicate built by the caller. Every referenced field must exist.
    pub fn where_clause(&mut self, predicate: Predicate) -> Result<&mut Self, FilterError> {
        for condition in &predicate.conditions {
            self.field(condition.field())?;
        }
        self.predicate = predicate;
        Ok(self)
    }

    pub fn order(&mut self, order: RecordOrder) -> Result<&mut Self, FilterError> {
        let spec = self.field(&order.field)?;
        if !spec.sortable {
            return Err(FilterError::UnsortableField(order.field));
        }
        self.order = Some(order);
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
        }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.predicate, 0);
        let order_clause = match &self.order {
            Some(order) => FilterOrder::generate(order),
            None => String::new(),
        };
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (query, params) = FilterWhere::generate(&self.predicate, 0);
        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = format!(
            "SELECT COUNT(*) as count FROM \"{}\" WHERE {}",
            self.table_name, where_result.query
        );
        Ok(SqlResult { query, params: where_result.params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidTableName(name.to_string()));
        }
        Ok(())
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::{SortDirection, DateRange};
    use chrono::{TimeZone, Utc};

    static FIELDS: &[FieldSpec] = &[
        FieldSpec::sort_only("id", FieldKind::Uuid),
        FieldSpec::new("grado", FieldKind::Enum(&["CAP", "TTE"])),
        FieldSpec::new("apellidos_nombres", FieldKind::Text),
        FieldSpec::new("orden", FieldKind::Integer),
        FieldSpec::sort_only("fecha_registro", FieldKind::Timestamp),
        FieldSpec::sort_only("created_at", FieldKind::Timestamp),
        FieldSpec::hidden("deleted_at", FieldKind::Timestamp),
    ];

    fn filter() -> Filter {
        Filter::new("expedientes", FIELDS, "fecha_registro", "created_at").unwrap()
    }

    #[test]
    fn translates_filters_by_kind() {
        let req = SearchRequest::new(1, 10)
            .filter("grado", "cap")
            .filter("apellidos_nombres", "perez")
            .filter("orden", "7");
        let (predicate, order) = filter().translate(&req).unwrap();

        assert!(predicate.conditions.contains(&Condition::Equals {
            field: "grado".into(),
            value: FieldValue::Text("CAP".into())
        }));
        assert!(predicate.conditions.contains(&Condition::Contains {
            field: "apellidos_nombres".into(),
            needle: "perez".into()
        }));
        assert!(predicate.conditions.contains(&Condition::Equals {
            field: "orden".into(),
            value: FieldValue::Integer(7)
        }));
        assert!(!predicate.include_deleted);
        assert_eq!(order, RecordOrder::new("created_at", SortDirection::Asc));
    }

    #[test]
    fn empty_filter_values_impose_no_constraint() {
        let req = SearchRequest::new(1, 10).filter("grado", "  ");
        let (predicate, _) = filter().translate(&req).unwrap();
        assert!(predicate.is_empty());
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        let req = SearchRequest::new(1, 10).sort("foo", None);
        let err = filter().translate(&req).unwrap_err();
        assert_eq!(err, FilterError::UnsortableField("foo".into()));
    }

    #[test]
    fn unknown_and_hidden_filter_fields_are_rejected() {
        let req = SearchRequest::new(1, 10).filter("nope", "x");
        assert!(matches!(filter().translate(&req), Err(FilterError::UnknownField(_))));

        let req = SearchRequest::new(1, 10).filter("deleted_at", "x");
        assert!(matches!(filter().translate(&req), Err(FilterError::UnknownField(_))));
    }

    #[test]
    fn enum_values_outside_the_domain_are_rejected() {
        let req = SearchRequest::new(1, 10).filter("grado", "ALMIRANTE");
        assert!(matches!(filter().translate(&req), Err(FilterError::InvalidValue { .. })));
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let mut req = SearchRequest::new(1, 10);
        req.date_range = DateRange {
            start: Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        };
        assert!(matches!(filter().translate(&req), Err(FilterError::InvalidDateRange { .. })));
    }

    #[test]
    fn renders_select_with_params_order_and_window() {
        let mut f = filter();
        let req = SearchRequest::new(3, 10)
            .filter("grado", "CAP")
            .filter("apellidos_nombres", "50%")
            .sort("orden", Some(SortDirection::Desc));
        let (predicate, order) = f.translate(&req).unwrap();
        f.where_clause(predicate).unwrap();
        f.order(order).unwrap();
        f.limit(10, Some(20)).unwrap();

        let sql = f.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"expedientes\" WHERE \"deleted_at\" IS NULL AND \"apellidos_nombres\" ILIKE $1 AND \"grado\" = $2 ORDER BY \"orden\" DESC, \"id\" ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params[0], FieldValue::Text("%50\\%%".into()));
        assert_eq!(sql.params[1], FieldValue::Text("CAP".into()));
    }

    #[test]
    fn renders_count_without_window() {
        let mut f = filter();
        f.limit(10, Some(0)).unwrap();
        let sql = f.to_count_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT COUNT(*) as count FROM \"expedientes\" WHERE \"deleted_at\" IS NULL"
        );
        assert!(sql.params.is_empty());
    }

    #[test]
    fn rejects_bad_table_names() {
        assert!(Filter::new("expedientes; drop", FIELDS, "fecha_registro", "created_at").is_err());
        assert!(Filter::new("", FIELDS, "fecha_registro", "created_at").is_err());
    }
}
