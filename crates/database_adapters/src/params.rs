use bytes::BytesMut;
use postgres_types::{to_sql_checked, Format, IsNull, ToSql, Type};
use serde_json::Value;
use std::error::Error;

/// A JSON value bound as a text-format parameter.
///
/// The server parses the text according to the parameter type it inferred
/// for the statement, so `"42"`, `42` and `42.0` all bind to an `int4`
/// placeholder the same way they would in `psql`. `null` binds SQL NULL.
#[derive(Debug)]
pub struct JsonParam<'a>(pub &'a Value);

impl JsonParam<'_> {
    pub fn as_text(&self) -> Option<String> {
        match self.0 {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            // arrays and objects only make sense for json/jsonb placeholders
            other => Some(other.to_string()),
        }
    }
}

impl ToSql for JsonParam<'_> {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self.as_text() {
            Some(text) => {
                out.extend_from_slice(text.as_bytes());
                Ok(IsNull::No)
            }
            None => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}
