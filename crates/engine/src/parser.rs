use crate::error::GenerateSqlError;
use common::types::GeneratedQuery;
use serde_json::Value;

/// Turn the model's raw answer into a [`GeneratedQuery`].
///
/// The answer must be a JSON object with a non-blank string `sql` and, if
/// present, a `paramValues` array of scalars. Anything else is reported as
/// malformed rather than quietly treated as "no rows".
pub fn parse_completion(text: &str) -> Result<GeneratedQuery, GenerateSqlError> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| GenerateSqlError::malformed_response(format!("not valid JSON: {e}")))?;

    let Value::Object(mut object) = value else {
        return Err(GenerateSqlError::malformed_response(
            "expected a JSON object with \"sql\" and \"paramValues\"",
        ));
    };

    let sql = match object.remove("sql") {
        Some(Value::String(sql)) if !sql.trim().is_empty() => sql,
        Some(Value::String(_)) => {
            return Err(GenerateSqlError::malformed_response("\"sql\" is empty"))
        }
        Some(other) => {
            return Err(GenerateSqlError::malformed_response(format!(
                "\"sql\" must be a string, got {}",
                type_name(&other)
            )))
        }
        None => return Err(GenerateSqlError::malformed_response("missing \"sql\"")),
    };

    let param_values = match object.remove("paramValues") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(values)) => {
            if let Some((idx, bad)) = values
                .iter()
                .enumerate()
                .find(|(_, v)| matches!(v, Value::Array(_) | Value::Object(_)))
            {
                return Err(GenerateSqlError::malformed_response(format!(
                    "paramValues[{}] must be a scalar, got {}",
                    idx,
                    type_name(bad)
                )));
            }
            values
        }
        Some(other) => {
            return Err(GenerateSqlError::malformed_response(format!(
                "\"paramValues\" must be an array, got {}",
                type_name(&other)
            )))
        }
    };

    Ok(GeneratedQuery::new(sql, param_values))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
