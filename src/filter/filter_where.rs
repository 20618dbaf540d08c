use super::types::{Condition, FieldValue, Predicate};

pub struct FilterWhere {
    param_values: Vec<FieldValue>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self { param_values: vec![], param_index: starting_param_index }
    }

    /// Renders a predicate into a WHERE body with `$n` placeholders numbered
    /// after `starting_param_index`.
    pub fn generate(predicate: &Predicate, starting_param_index: usize) -> (String, Vec<FieldValue>) {
        let mut filter_where = Self::new(starting_param_index);
        let clause = filter_where.build(predicate);
        (clause, filter_where.param_values)
    }

    fn build(&mut self, predicate: &Predicate) -> String {
        let mut sql_conditions = vec![];
        if !predicate.include_deleted {
            sql_conditions.push("\"deleted_at\" IS NULL".to_string());
        }
        for condition in &predicate.conditions {
            sql_conditions.extend(self.build_sql_condition(condition));
        }
        if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        }
    }

    fn build_sql_condition(&mut self, condition: &Condition) -> Vec<String> {
        match condition {
            Condition::Equals { field, value } => {
                let p = self.push_param(value.clone());
                vec![format!("\"{}\" = {}", field, p)]
            }
            Condition::NotEquals { field, value } => {
                let p = self.push_param(value.clone());
                vec![format!("\"{}\" <> {}", field, p)]
            }
            Condition::Contains { field, needle } => {
                let p = self.push_param(FieldValue::Text(format!("%{}%", escape_like(needle))));
                vec![format!("\"{}\" ILIKE {}", field, p)]
            }
            Condition::Range { field, start, end } => {
                let mut parts = vec![];
                if let Some(start) = start {
                    let p = self.push_param(FieldValue::Timestamp(*start));
                    parts.push(format!("\"{}\" >= {}", field, p));
                }
                if let Some(end) = end {
                    let p = self.push_param(FieldValue::Timestamp(*end));
                    parts.push(format!("\"{}\" <= {}", field, p));
                }
                parts
            }
        }
    }

    fn push_param(&mut self, value: FieldValue) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// Escapes LIKE wildcards so user text matches literally.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
