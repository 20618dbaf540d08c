use super::error::FilterError;
use super::types::{FieldSpec, RecordOrder, SortDirection};

/// Column every ordering falls back to, keeping page boundaries stable.
pub const TIE_BREAKER: &str = "id";

pub struct FilterOrder;

impl FilterOrder {
    /// Resolves the requested sort against the known fields. Direction
    /// defaults to ascending, field defaults to `default_sort`.
    pub fn resolve(
        sort_by: Option<&str>,
        sort_order: Option<SortDirection>,
        fields: &[FieldSpec],
        default_sort: &str,
    ) -> Result<RecordOrder, FilterError> {
        let requested = sort_by.map(str::trim).filter(|s| !s.is_empty());
        let field = match requested {
            Some(name) => fields
                .iter()
                .find(|f| f.name == name && f.sortable)
                .map(|f| f.name)
                .ok_or_else(|| FilterError::UnsortableField(name.to_string()))?,
            None => default_sort,
        };
        Ok(RecordOrder::new(field, sort_order.unwrap_or_default()))
    }

    pub fn generate(order: &RecordOrder) -> String {
        if order.field == TIE_BREAKER {
            return format!("ORDER BY \"{}\" {}", TIE_BREAKER, order.direction.to_sql());
        }
        format!(
            "ORDER BY \"{}\" {}, \"{}\" ASC",
            order.field,
            order.direction.to_sql(),
            TIE_BREAKER
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::FieldKind;

    static FIELDS: &[FieldSpec] = &[
        FieldSpec::sort_only("id", FieldKind::Uuid),
        FieldSpec::new("orden", FieldKind::Integer),
        FieldSpec::hidden("deleted_at", FieldKind::Timestamp),
    ];

    #[test]
    fn defaults_to_ascending_on_default_field() {
        let order = FilterOrder::resolve(None, None, FIELDS, "orden").unwrap();
        assert_eq!(order, RecordOrder::new("orden", SortDirection::Asc));
    }

    #[test]
    fn rejects_hidden_or_unknown_fields() {
        assert!(FilterOrder::resolve(Some("deleted_at"), None, FIELDS, "orden").is_err());
        assert!(FilterOrder::resolve(Some("foo"), None, FIELDS, "orden").is_err());
    }

    #[test]
    fn appends_id_tie_breaker() {
        let sql = FilterOrder::generate(&RecordOrder::new("orden", SortDirection::Desc));
        assert_eq!(sql, "ORDER BY \"orden\" DESC, \"id\" ASC");
        let sql = FilterOrder::generate(&RecordOrder::new("id", SortDirection::Desc));
        assert_eq!(sql, "ORDER BY \"id\" DESC");
    }
}
