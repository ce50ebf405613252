//! SQL syntax tree and printer
//!
//! Printing is dialect-neutral: every dialect-specific decision is made while lowering, so
//! the tree already holds the final function names, type names and literal text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A SQL value expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlExpr {
    Star,
    Column(String),
    /// Literal text exactly as it appears in the statement (`42`, `'abc'`, `NULL`).
    Literal(String),
    /// Bare keyword such as `CURRENT_TIMESTAMP`.
    Keyword(String),
    Cast {
        expr: Box<SqlExpr>,
        to: String,
    },
    Binary {
        left: Box<SqlExpr>,
        op: String,
        right: Box<SqlExpr>,
    },
    Not(Box<SqlExpr>),
    Negate(Box<SqlExpr>),
    IsNull {
        expr: Box<SqlExpr>,
        negated: bool,
    },
    Function(Function),
    Case {
        operand: Option<Box<SqlExpr>>,
        branches: Vec<CaseBranch>,
        default: Option<Box<SqlExpr>>,
    },
    Interval {
        value: Box<SqlExpr>,
        unit: String,
    },
    /// One-based array element access.
    Subscript {
        expr: Box<SqlExpr>,
        index: i64,
    },
    /// Scalar subquery: `(SELECT ...)`.
    Subquery(Box<Select>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseBranch {
    pub when: SqlExpr,
    pub then: SqlExpr,
}

/// Function or aggregate call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub args: Vec<SqlExpr>,
    /// Ordering inside the argument list: `F(x ORDER BY y)`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderByExpr>,
    /// `F() WITHIN GROUP (ORDER BY y)`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub within_group: Vec<OrderByExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Box<SqlExpr>>,
}

impl Function {
    pub fn new(name: impl Into<String>, args: Vec<SqlExpr>) -> Self {
        Self {
            name: name.into(),
            args,
            order_by: Vec::new(),
            within_group: Vec::new(),
            filter: None,
        }
    }

    pub fn order_by(mut self, order_by: Vec<OrderByExpr>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn within_group(mut self, order_by: Vec<OrderByExpr>) -> Self {
        self.within_group = order_by;
        self
    }

    pub fn filter(mut self, predicate: Option<SqlExpr>) -> Self {
        self.filter = predicate.map(Box::new);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByExpr {
    pub expr: SqlExpr,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectItem {
    pub expr: SqlExpr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableRef {
    Table(String),
    Subquery { query: Box<Select>, alias: String },
}

/// A single `SELECT` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Select {
    pub projection: Vec<SelectItem>,
    pub from: TableRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SqlExpr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<SqlExpr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderByExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl Select {
    /// `SELECT * FROM "name"`
    pub fn from_table(name: impl Into<String>) -> Self {
        Self::star(TableRef::Table(name.into()))
    }

    /// `SELECT * FROM (inner) AS tN`
    pub fn wrap(inner: Select) -> Self {
        let alias = format!("t{}", inner.depth());
        Self::star(TableRef::Subquery {
            query: Box::new(inner),
            alias,
        })
    }

    fn star(from: TableRef) -> Self {
        Self {
            projection: vec![SelectItem {
                expr: SqlExpr::Star,
                alias: None,
            }],
            from,
            selection: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Projection is exactly `*`.
    pub fn is_star(&self) -> bool {
        matches!(self.projection.as_slice(), [SelectItem { expr: SqlExpr::Star, alias: None }])
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    pub fn is_limited(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    /// Number of subqueries nested below this statement.
    pub fn depth(&self) -> usize {
        match &self.from {
            TableRef::Table(_) => 0,
            TableRef::Subquery { query, .. } => query.depth() + 1,
        }
    }
}

/// Result of compiling one IR root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlFragment {
    Expr(SqlExpr),
    Query(Select),
}

impl SqlFragment {
    pub fn to_sql(&self) -> String {
        self.to_string()
    }
}

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for SqlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlExpr::Star => f.write_str("*"),
            SqlExpr::Column(name) => f.write_str(&quote_ident(name)),
            SqlExpr::Literal(text) | SqlExpr::Keyword(text) => f.write_str(text),
            SqlExpr::Cast { expr, to } => write!(f, "CAST({} AS {})", expr, to),
            SqlExpr::Binary { left, op, right } => write!(f, "({} {} {})", left, op, right),
            SqlExpr::Not(expr) => write!(f, "(NOT {})", expr),
            SqlExpr::Negate(expr) => write!(f, "(-{})", expr),
            SqlExpr::IsNull { expr, negated } => {
                let not = if *negated { " NOT" } else { "" };
                write!(f, "({} IS{} NULL)", expr, not)
            }
            SqlExpr::Function(function) => function.fmt(f),
            SqlExpr::Case {
                operand,
                branches,
                default,
            } => {
                f.write_str("CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {}", operand)?;
                }
                for branch in branches {
                    write!(f, " WHEN {} THEN {}", branch.when, branch.then)?;
                }
                if let Some(default) = default {
                    write!(f, " ELSE {}", default)?;
                }
                f.write_str(" END")
            }
            SqlExpr::Interval { value, unit } => match value.as_ref() {
                SqlExpr::Literal(text) => write!(f, "INTERVAL {} {}", quote_string(text), unit),
                other => write!(f, "INTERVAL ({}) {}", other, unit),
            },
            SqlExpr::Subscript { expr, index } => write!(f, "({})[{}]", expr, index),
            SqlExpr::Subquery(query) => write!(f, "({})", query),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.name, join(&self.args))?;
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY {}", join(&self.order_by))?;
        }
        f.write_str(")")?;
        if !self.within_group.is_empty() {
            write!(f, " WITHIN GROUP (ORDER BY {})", join(&self.within_group))?;
        }
        if let Some(filter) = &self.filter {
            write!(f, " FILTER (WHERE {})", filter)?;
        }
        Ok(())
    }
}

impl fmt::Display for OrderByExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.ascending { "ASC" } else { "DESC" };
        write!(f, "{} {}", self.expr, direction)
    }
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.expr, &self.alias) {
            (SqlExpr::Column(name), Some(alias)) if name == alias => self.expr.fmt(f),
            (expr, Some(alias)) => write!(f, "{} AS {}", expr, quote_ident(alias)),
            (expr, None) => expr.fmt(f),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableRef::Table(name) => f.write_str(&quote_ident(name)),
            TableRef::Subquery { query, alias } => write!(f, "({}) AS {}", query, alias),
        }
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT {} FROM {}", join(&self.projection), self.from)?;
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {}", selection)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY {}", join(&self.group_by))?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY {}", join(&self.order_by))?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlFragment::Expr(expr) => expr.fmt(f),
            SqlFragment::Query(select) => select.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> SqlExpr {
        SqlExpr::Column(name.to_string())
    }

    #[test]
    fn test_quote_ident_injection() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(
            quote_ident("users; DROP TABLE users;--"),
            "\"users; DROP TABLE users;--\""
        );
    }

    #[test]
    fn test_quote_string_injection() {
        assert_eq!(quote_string("'; DROP TABLE users;--"), "'''; DROP TABLE users;--'");
    }

    #[test]
    fn test_case_without_else() {
        let expr = SqlExpr::Case {
            operand: None,
            branches: vec![CaseBranch {
                when: SqlExpr::Binary {
                    left: Box::new(col("x")),
                    op: ">".to_string(),
                    right: Box::new(SqlExpr::Literal("0".to_string())),
                },
                then: SqlExpr::Literal("'positive'".to_string()),
            }],
            default: None,
        };
        assert_eq!(expr.to_string(), "CASE WHEN (\"x\" > 0) THEN 'positive' END");
    }

    #[test]
    fn test_aggregate_clauses() {
        let call = Function::new("MODE", vec![])
            .within_group(vec![OrderByExpr {
                expr: col("x"),
                ascending: true,
            }])
            .filter(Some(col("keep")));
        assert_eq!(
            SqlExpr::Function(call).to_string(),
            "MODE() WITHIN GROUP (ORDER BY \"x\" ASC) FILTER (WHERE \"keep\")"
        );
    }

    #[test]
    fn test_nested_select_aliases() {
        let inner = Select::from_table("orders");
        let mut outer = Select::wrap(Select::wrap(inner));
        outer.limit = Some(5);
        assert_eq!(
            outer.to_string(),
            "SELECT * FROM (SELECT * FROM (SELECT * FROM \"orders\") AS t0) AS t1 LIMIT 5"
        );
        assert_eq!(outer.depth(), 2);
    }

    #[test]
    fn test_scalar_subquery() {
        let mut inner = Select::from_table("t");
        inner.projection = vec![SelectItem {
            expr: SqlExpr::Function(Function::new("MAX", vec![col("x")])),
            alias: None,
        }];
        let expr = SqlExpr::Binary {
            left: Box::new(col("x")),
            op: "=".to_string(),
            right: Box::new(SqlExpr::Subquery(Box::new(inner))),
        };
        assert_eq!(expr.to_string(), "(\"x\" = (SELECT MAX(\"x\") FROM \"t\"))");
    }

    #[test]
    fn test_projection_alias_elided_for_same_column() {
        let item = SelectItem {
            expr: col("id"),
            alias: Some("id".to_string()),
        };
        assert_eq!(item.to_string(), "\"id\"");
    }
}
