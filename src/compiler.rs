//! Entry point tying the parser, the generator and the result cursor together.

use tracing::{debug, info_span};

use crate::config::RepositoryConfig;
use crate::error::CompileError;
use crate::generator::{CompiledQuery, QueryGenerator};
use crate::parser::Parser;
use crate::result::{Argument, ExecutionEngine, QueryResult};
use crate::sql_compiler::SqlCompiler;

/// Compiles repository method names into queries for one repository
/// configuration.
#[derive(Debug, Clone)]
pub struct MethodCompiler {
    config: RepositoryConfig,
    parser: Parser,
    generator: QueryGenerator,
}

impl Default for MethodCompiler {
    fn default() -> Self {
        Self::from_config(RepositoryConfig::default())
    }
}

impl MethodCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: RepositoryConfig) -> Self {
        let parser = Parser::new(config.method_prefix.as_str(), config.find_all_method.as_str());
        let generator = QueryGenerator::new(config.root_alias.as_str());
        Self {
            config,
            parser,
            generator,
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Compiles `method` against `entity`.
    pub fn compile(&self, method: &str, entity: &str) -> Result<CompiledQuery, CompileError> {
        let _span = info_span!("compile", method, entity).entered();

        let tree = self.parser.parse(method)?;
        let compiled = CompiledQuery::new(method, entity, tree, &self.generator);
        debug!(
            query = %compiled.query,
            parameters = compiled.parameter_count(),
            "compiled method"
        );
        Ok(compiled)
    }

    /// Opens a result cursor for a compiled query and its arguments. Nothing
    /// runs until the cursor is executed.
    pub fn query<'q, E, X>(
        &self,
        engine: &'q X,
        compiled: &'q CompiledQuery,
        arguments: Vec<Argument>,
    ) -> QueryResult<'q, E, X>
    where
        X: ExecutionEngine<E> + ?Sized,
    {
        let mut cursor = QueryResult::new(engine, compiled, arguments);
        cursor.set_default_page_size(self.config.default_page_size);
        cursor
    }

    /// SQL lowering using this repository's table mapping.
    pub fn sql_compiler(&self) -> SqlCompiler {
        SqlCompiler::with_mapping(self.config.table_mapping.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::QueryRequest;
    use crate::sql_compiler::Dialect;
    use std::convert::Infallible;

    struct Ticket;

    /// Answers every query with an empty result and a fixed count.
    struct CountingEngine(u64);

    impl ExecutionEngine<Ticket> for CountingEngine {
        type Error = Infallible;

        fn fetch(&self, _request: &QueryRequest<'_>) -> Result<Vec<Ticket>, Infallible> {
            Ok(Vec::new())
        }

        fn count(&self, _request: &QueryRequest<'_>) -> Result<u64, Infallible> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_compile_with_defaults() {
        let compiled = MethodCompiler::new().compile("findByStatusOrderByCreatedDesc", "Ticket").unwrap();
        assert_eq!(
            compiled.query,
            "select e from Ticket e where e.status = ?1 order by e.created desc"
        );
        assert_eq!(compiled.count_query, "select count(e) from Ticket e where e.status = ?1");
        assert_eq!(compiled.parameter_count(), 1);
    }

    #[test]
    fn test_compile_error_is_reported() {
        let err = MethodCompiler::new().compile("findByStatusOr", "Ticket").unwrap_err();
        assert_eq!(
            err,
            CompileError::malformed("findByStatusOr", "Or without a condition on both sides")
        );
    }

    #[test]
    fn test_config_drives_parser_and_generator() {
        let config = RepositoryConfig {
            method_prefix: "queryBy".to_string(),
            root_alias: "t".to_string(),
            default_page_size: 3,
            ..RepositoryConfig::default()
        };
        let compiler = MethodCompiler::from_config(config);

        let compiled = compiler.compile("queryByStatus", "Ticket").unwrap();
        assert_eq!(compiled.query, "select t from Ticket t where t.status = ?1");
        assert!(compiler.compile("findByStatus", "Ticket").is_err());

        let engine = CountingEngine(10);
        let cursor = compiler.query(&engine, &compiled, vec![Argument::value("open")]);
        assert_eq!(cursor.page_size(), 3);
        assert_eq!(cursor.count_pages().unwrap(), 4);
    }

    #[test]
    fn test_sql_compiler_uses_table_mapping() {
        let mut config = RepositoryConfig::default();
        config.table_mapping.insert("Ticket", "support_tickets");
        let compiler = MethodCompiler::from_config(config);
        let compiled = compiler.compile("findAll", "Ticket").unwrap();

        let engine = CountingEngine(0);
        let cursor = compiler.query(&engine, &compiled, vec![]);
        let statement = compiler
            .sql_compiler()
            .compile(&cursor.request(), Dialect::Sqlite)
            .unwrap();
        assert_eq!(statement.sql, r#"SELECT * FROM "support_tickets""#);
    }
}
