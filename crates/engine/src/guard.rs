use crate::error::GenerateSqlError;
use sqlparser::ast::{Query, SetExpr, Statement, Visit, Visitor};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::ops::ControlFlow;

/// Admits exactly one read-only query. Runs before the database sees the
/// text, so a model that ignores the prompt's SELECT-only rule cannot write.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatementGuard;

impl StatementGuard {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, sql: &str) -> Result<(), GenerateSqlError> {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
            .map_err(|e| GenerateSqlError::rejected_statement(format!("unparsable SQL: {e}")))?;

        let statement = match statements.as_slice() {
            [single] => single,
            [] => return Err(GenerateSqlError::rejected_statement("no statement found")),
            many => {
                return Err(GenerateSqlError::rejected_statement(format!(
                    "expected one statement, found {}",
                    many.len()
                )))
            }
        };

        if !matches!(statement, Statement::Query(_)) {
            return Err(GenerateSqlError::rejected_statement(format!(
                "only SELECT is allowed, got: {}",
                leading_keyword(&statement.to_string())
            )));
        }

        match statement.visit(&mut ReadOnlyQueries) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(reason) => Err(GenerateSqlError::rejected_statement(reason)),
        }
    }
}

/// Visits every query in the tree: CTEs, derived tables and subqueries in
/// expressions alike.
struct ReadOnlyQueries;

impl Visitor for ReadOnlyQueries {
    type Break = String;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if !query.locks.is_empty() {
            return ControlFlow::Break("row locking clauses are not allowed".to_string());
        }
        check_set_expr(&query.body)
    }
}

// nested `Query` nodes are reached by the visitor itself
fn check_set_expr(expr: &SetExpr) -> ControlFlow<String> {
    match expr {
        SetExpr::Select(select) if select.into.is_some() => {
            ControlFlow::Break("SELECT INTO creates a table".to_string())
        }
        SetExpr::Select(_) | SetExpr::Values(_) | SetExpr::Table(_) | SetExpr::Query(_) => {
            ControlFlow::Continue(())
        }
        SetExpr::SetOperation { left, right, .. } => {
            check_set_expr(left)?;
            check_set_expr(right)
        }
        _ => ControlFlow::Break("data-modifying statements are not allowed".to_string()),
    }
}

fn leading_keyword(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}
