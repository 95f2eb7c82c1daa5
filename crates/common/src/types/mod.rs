use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row, column name to value, in select-list order.
pub type Row = Map<String, Value>;

/// Row data as the database gateway produced it, before normalisation.
#[derive(Debug, Clone, PartialEq)]
pub enum RowSet {
    /// The statement carried no row data at all.
    Empty,
    Many(Vec<Row>),
    Single(Row),
}

impl RowSet {
    /// Flatten into the array shape the HTTP layer returns.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            RowSet::Empty => Vec::new(),
            RowSet::Many(rows) => rows,
            RowSet::Single(row) => vec![row],
        }
    }
}

/// SQL text plus positional parameter values, as produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuery {
    pub sql: String,
    #[serde(rename = "paramValues", default)]
    pub param_values: Vec<Value>,
}

impl GeneratedQuery {
    pub fn new(sql: impl Into<String>, param_values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            param_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_row_set_flattens_to_nothing() {
        assert!(RowSet::Empty.into_rows().is_empty());
    }

    #[test]
    fn many_rows_pass_through() {
        let rows = vec![row(json!({"id": 1})), row(json!({"id": 2}))];
        assert_eq!(RowSet::Many(rows.clone()).into_rows(), rows);
    }

    #[test]
    fn single_row_is_wrapped() {
        let r = row(json!({"sum": "42.50"}));
        assert_eq!(RowSet::Single(r.clone()).into_rows(), vec![r]);
    }

    #[test]
    fn generated_query_uses_camel_case_params() {
        let q: GeneratedQuery =
            serde_json::from_value(json!({"sql": "SELECT 1", "paramValues": ["a", 2]})).unwrap();
        assert_eq!(q.param_values, vec![json!("a"), json!(2)]);
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({"sql": "SELECT 1", "paramValues": ["a", 2]})
        );
    }
}
