//! SQL lowering of compiled method queries using sea-query.
//!
//! An execution engine backed by a relational store can hand a
//! [`QueryRequest`] to [`SqlCompiler`] to get a dialect-specific SQL
//! statement with the bound arguments as values. Entities map to tables
//! through the [`TableMapping`]; attribute paths map to snake_case columns
//! (`address.zipCode` becomes `address_zip_code`).

use convert_case::{Case, Casing};
use sea_query::{
    Asterisk, BinOper, Cond, Expr, Func, Iden, MysqlQueryBuilder, Order, PostgresQueryBuilder,
    Query, SelectStatement, SimpleExpr, SqliteQueryBuilder, Value, Values,
};
use thiserror::Error;

use crate::ast::{Condition, Direction, OrGroup, OrderSpec};
use crate::config::TableMapping;
use crate::generator::CompiledQuery;
use crate::operator::Operator;
use crate::result::{Argument, QueryRequest};

/// Table identifier for sea-query
#[derive(Debug, Clone)]
pub struct TableName(pub String);

impl Iden for TableName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

/// Column identifier wrapper
#[derive(Debug, Clone)]
pub struct ColumnName(pub String);

impl Iden for ColumnName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    /// Renders a statement with this dialect's query builder.
    pub fn build(self, select: &SelectStatement) -> SqlStatement {
        let (sql, values) = match self {
            Dialect::Postgres => select.build(PostgresQueryBuilder),
            Dialect::MySql => select.build(MysqlQueryBuilder),
            Dialect::Sqlite => select.build(SqliteQueryBuilder),
        };
        SqlStatement { sql, values }
    }
}

impl std::str::FromStr for Dialect {
    type Err = LoweringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(LoweringError::UnknownDialect(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoweringError {
    #[error("query expects {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("argument ?{position} for '{attribute}' must be a {expected}")]
    ArgumentShape {
        position: usize,
        attribute: String,
        expected: &'static str,
    },

    #[error("argument ?{position} for '{attribute}' must be a string to build a pattern")]
    PatternValue { position: usize, attribute: String },

    #[error("unknown SQL dialect '{0}'")]
    UnknownDialect(String),
}

/// A rendered SQL statement and its bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub values: Values,
}

/// Row window applied to the select statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub first_result: Option<u64>,
    pub max_results: Option<u64>,
}

/// Lowers compiled method queries to SQL.
pub struct SqlCompiler {
    /// Maps entity names to table names for schema resolution
    table_mapping: TableMapping,
}

impl Default for SqlCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlCompiler {
    pub fn new() -> Self {
        Self {
            table_mapping: TableMapping::default(),
        }
    }

    pub fn with_mapping(table_mapping: TableMapping) -> Self {
        Self { table_mapping }
    }

    /// Lowers the select query of an engine request.
    pub fn compile(&self, request: &QueryRequest<'_>, dialect: Dialect) -> Result<SqlStatement, LoweringError> {
        let window = Window {
            first_result: request.first_result,
            max_results: request.max_results,
        };
        let select = self.select_statement(request.compiled, request.arguments, request.order, window)?;
        Ok(dialect.build(&select))
    }

    /// Lowers the count query of an engine request.
    pub fn compile_count(
        &self,
        request: &QueryRequest<'_>,
        dialect: Dialect,
    ) -> Result<SqlStatement, LoweringError> {
        let select = self.count_statement(request.compiled, request.arguments)?;
        Ok(dialect.build(&select))
    }

    /// Builds the select statement for a compiled query and its arguments.
    pub fn select_statement(
        &self,
        compiled: &CompiledQuery,
        arguments: &[Argument],
        order: &[OrderSpec],
        window: Window,
    ) -> Result<SelectStatement, LoweringError> {
        let table = self.table_mapping.table_name(&compiled.entity);

        let mut select = Query::select();
        select.column(Asterisk).from(TableName(table.clone()));
        self.apply_predicate(&mut select, &table, compiled, arguments)?;

        for spec in order {
            let direction = match spec.direction {
                Direction::Asc => Order::Asc,
                Direction::Desc => Order::Desc,
            };
            select.order_by((TableName(table.clone()), column_name(spec)), direction);
        }
        if let Some(max) = window.max_results {
            select.limit(max);
        }
        if let Some(first) = window.first_result {
            select.offset(first);
        }

        Ok(select)
    }

    /// Builds the `count(*)` statement for a compiled query and its arguments.
    pub fn count_statement(
        &self,
        compiled: &CompiledQuery,
        arguments: &[Argument],
    ) -> Result<SelectStatement, LoweringError> {
        let table = self.table_mapping.table_name(&compiled.entity);

        let mut select = Query::select();
        select
            .expr(Func::count(Expr::col(Asterisk)))
            .from(TableName(table.clone()));
        self.apply_predicate(&mut select, &table, compiled, arguments)?;
        Ok(select)
    }

    fn apply_predicate(
        &self,
        select: &mut SelectStatement,
        table: &str,
        compiled: &CompiledQuery,
        arguments: &[Argument],
    ) -> Result<(), LoweringError> {
        let expected = compiled.parameter_count();
        if arguments.len() != expected {
            return Err(LoweringError::ArgumentCount {
                expected,
                actual: arguments.len(),
            });
        }

        let root = &compiled.tree.predicate;
        if !root.is_empty() {
            select.cond_where(self.lower_predicate(root, table, arguments)?);
        }
        Ok(())
    }

    /// OR of ANDs, consuming arguments left to right.
    fn lower_predicate(&self, root: &OrGroup, table: &str, arguments: &[Argument]) -> Result<Cond, LoweringError> {
        let mut bound = BoundArguments::new(arguments);
        let mut any = Cond::any();
        for group in &root.groups {
            let mut all = Cond::all();
            for condition in &group.conditions {
                all = all.add(self.lower_condition(condition, table, &mut bound)?);
            }
            any = any.add(all);
        }
        Ok(any)
    }

    fn lower_condition(
        &self,
        condition: &Condition,
        table: &str,
        bound: &mut BoundArguments<'_>,
    ) -> Result<SimpleExpr, LoweringError> {
        let column = Expr::col((
            TableName(table.to_string()),
            ColumnName(column_for_path(condition.path.segments())),
        ));
        let target = if condition.ignore_case {
            Expr::expr(Func::upper(column))
        } else {
            column
        };
        let attribute = condition.path.to_string();

        let expr = match condition.operator {
            Operator::IsNull => target.is_null(),
            Operator::IsNotNull => target.is_not_null(),
            Operator::Between => {
                let (_, low) = bound.single(&attribute)?;
                let (_, high) = bound.single(&attribute)?;
                target.between(Expr::val(low), Expr::val(high))
            }
            Operator::In => target.is_in(bound.list(&attribute)?.into_iter().map(Expr::val)),
            Operator::NotIn => target.is_not_in(bound.list(&attribute)?.into_iter().map(Expr::val)),
            operator => {
                let (position, value) = bound.single(&attribute)?;
                let value = match operator {
                    Operator::StartingWith => pattern(value, position, &attribute, |s| format!("{s}%"))?,
                    Operator::EndingWith => pattern(value, position, &attribute, |s| format!("%{s}"))?,
                    Operator::Containing => pattern(value, position, &attribute, |s| format!("%{s}%"))?,
                    _ => value,
                };
                let value: SimpleExpr = if condition.ignore_case {
                    Func::upper(Expr::val(value)).into()
                } else {
                    Expr::val(value).into()
                };
                lower_comparison(target, operator, value)
            }
        };

        Ok(if condition.negated { expr.not() } else { expr })
    }
}

fn lower_comparison(target: Expr, operator: Operator, value: SimpleExpr) -> SimpleExpr {
    match operator {
        Operator::NotEqual => target.ne(value),
        Operator::LessThan => target.lt(value),
        Operator::LessThanEquals => target.lte(value),
        Operator::GreaterThan => target.gt(value),
        Operator::GreaterThanEquals => target.gte(value),
        Operator::Like | Operator::StartingWith | Operator::EndingWith | Operator::Containing => {
            target.binary(BinOper::Like, value)
        }
        Operator::NotLike => target.binary(BinOper::NotLike, value),
        _ => target.eq(value),
    }
}

/// Turns a string argument into a `like` pattern. A NULL string stays NULL.
fn pattern(
    value: Value,
    position: usize,
    attribute: &str,
    wrap: impl Fn(&str) -> String,
) -> Result<Value, LoweringError> {
    match value {
        Value::String(Some(s)) => Ok(Value::from(wrap(s.as_str()))),
        Value::String(None) => Ok(Value::String(None)),
        _ => Err(LoweringError::PatternValue {
            position,
            attribute: attribute.to_string(),
        }),
    }
}

/// Walks the argument list in placeholder order.
struct BoundArguments<'a> {
    arguments: std::slice::Iter<'a, Argument>,
    position: usize,
}

impl<'a> BoundArguments<'a> {
    fn new(arguments: &'a [Argument]) -> Self {
        Self {
            arguments: arguments.iter(),
            position: 0,
        }
    }

    fn next(&mut self) -> (usize, Option<&'a Argument>) {
        self.position += 1;
        (self.position, self.arguments.next())
    }

    fn single(&mut self, attribute: &str) -> Result<(usize, Value), LoweringError> {
        match self.next() {
            (position, Some(Argument::Single(value))) => Ok((position, value.clone())),
            (position, _) => Err(LoweringError::ArgumentShape {
                position,
                attribute: attribute.to_string(),
                expected: "single value",
            }),
        }
    }

    fn list(&mut self, attribute: &str) -> Result<Vec<Value>, LoweringError> {
        match self.next() {
            (_, Some(Argument::List(values))) => Ok(values.clone()),
            (position, _) => Err(LoweringError::ArgumentShape {
                position,
                attribute: attribute.to_string(),
                expected: "list",
            }),
        }
    }
}

fn column_name(spec: &OrderSpec) -> ColumnName {
    ColumnName(column_for_path(spec.path.segments()))
}

/// `["address", "zipCode"]` becomes `address_zip_code`.
fn column_for_path(segments: &[String]) -> String {
    segments
        .iter()
        .map(|segment| segment.to_case(Case::Snake))
        .collect::<Vec<_>>()
        .join("_")
}
