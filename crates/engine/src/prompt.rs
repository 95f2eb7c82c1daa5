use crate::error::GenerateSqlError;

/// Tables the model may query. Fixed at build time; the database bootstrap
/// creates exactly these.
pub const SCHEMA_DESCRIPTION: &str = "\
# customers (id, company, city, email)
# orders (id, customer_id, date, total)
# order_items (id, order_id, product_id, quantity, price)
# reviews (id, customer_id, review, date, comment)";

pub const SELECT_ONLY_RULE: &str =
    "# Only allow SELECT queries. UPDATE, INSERT, DELETE are not allowed.";

pub const PARAMETERIZE_RULE: &str =
    "# Convert any strings to a Postgresql parameterized query value to avoid SQL injection attacks";

pub const RESPONSE_SHAPE_RULE: &str = "\
Return a JSON object with the SQL query and the parameter values in it.
Example: { \"sql\": \"\", \"paramValues\": [] }";

/// Reject absent or whitespace-only questions before anything else runs.
pub fn validate_query(query: Option<&str>) -> Result<&str, GenerateSqlError> {
    match query {
        Some(q) if !q.trim().is_empty() => Ok(q),
        _ => Err(GenerateSqlError::invalid_request("missing parameter \"query\"")),
    }
}

/// Build the text sent to the model for `query`.
pub fn build_prompt(query: &str) -> Result<String, GenerateSqlError> {
    let query = validate_query(Some(query))?;
    Ok(format!(
        "### Postgres SQL tables, with their properties:\n\
         #\n\
         {SCHEMA_DESCRIPTION}\n\
         #\n\
         ### {query}\n\
         #\n\
         {SELECT_ONLY_RULE}\n\
         {PARAMETERIZE_RULE}\n\
         \n\
         {RESPONSE_SHAPE_RULE}\n"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn embeds_schema_and_question_verbatim() {
        for question in [
            "total revenue",
            "Which customers in Seattle left a review below 3?",
            "orders with \"quotes\" and 'apostrophes' and {braces}",
        ] {
            let prompt = build_prompt(question).unwrap();
            assert!(prompt.contains(SCHEMA_DESCRIPTION));
            assert!(prompt.contains(question));
        }
    }

    #[test]
    fn carries_the_select_only_and_shape_instructions() {
        let prompt = build_prompt("list customers").unwrap();
        assert!(prompt.contains("Only allow SELECT queries"));
        assert!(prompt.contains("parameterized"));
        assert!(prompt.contains("{ \"sql\": \"\", \"paramValues\": [] }"));
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(build_prompt("top cities").unwrap(), build_prompt("top cities").unwrap());
    }

    #[test]
    fn blank_questions_are_invalid_requests() {
        for blank in ["", "   ", "\n\t"] {
            let err = build_prompt(blank).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        }
        assert_eq!(validate_query(None).unwrap_err().kind(), ErrorKind::InvalidRequest);
    }
}
