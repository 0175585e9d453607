//! Lazily executed query result with ordering, paging, locking and hints.
//!
//! A [`QueryResult`] wraps a [`CompiledQuery`] and its bound arguments. All
//! configuration calls mutate the cursor in place and return it for
//! chaining. Nothing is executed until [`QueryResult::result_list`],
//! [`QueryResult::single_result`] or [`QueryResult::count`] is called; those
//! consume the cursor, so an executed cursor cannot be configured again.
//!
//! A cursor is meant for one logical query invocation on one thread.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use sea_query::Value;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::ast::{AttributePath, Direction, OrderSpec};
use crate::config::DEFAULT_PAGE_SIZE;
use crate::generator::CompiledQuery;

/// A value bound to a positional placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Single(Value),
    /// Collection argument of `In` / `NotIn`
    List(Vec<Value>),
}

impl Argument {
    pub fn value(value: impl Into<Value>) -> Self {
        Argument::Single(value.into())
    }

    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Argument::List(values.into_iter().map(Into::into).collect())
    }
}

/// A reference to an attribute of entity `E` usable for ordering.
pub trait Attribute<E> {
    /// Dotted attribute path, e.g. `address.city`
    fn path(&self) -> Cow<'_, str>;
}

impl<E> Attribute<E> for &str {
    fn path(&self) -> Cow<'_, str> {
        Cow::Borrowed(*self)
    }
}

impl<E> Attribute<E> for String {
    fn path(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

/// Attribute of entity `E` holding values of type `T`.
///
/// ```
/// use method_query::result::TypedAttribute;
///
/// struct Person;
/// const AGE: TypedAttribute<Person, u32> = TypedAttribute::new("age");
/// ```
pub struct TypedAttribute<E, T> {
    path: &'static str,
    _marker: PhantomData<fn(E) -> T>,
}

impl<E, T> TypedAttribute<E, T> {
    pub const fn new(path: &'static str) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }
}

impl<E, T> Clone for TypedAttribute<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for TypedAttribute<E, T> {}

impl<E, T> std::fmt::Debug for TypedAttribute<E, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TypedAttribute").field(&self.path).finish()
    }
}

impl<E, T> Attribute<E> for TypedAttribute<E, T> {
    fn path(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.path)
    }
}

/// Lock mode passed through to the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LockMode {
    None,
    Read,
    Write,
    Optimistic,
    OptimisticForceIncrement,
    PessimisticRead,
    PessimisticWrite,
    PessimisticForceIncrement,
}

/// Flush mode passed through to the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlushMode {
    Auto,
    Commit,
}

/// Everything the execution engine needs to run one query.
#[derive(Debug, Clone)]
pub struct QueryRequest<'q> {
    pub compiled: &'q CompiledQuery,
    /// Select query with the runtime ordering applied
    pub query: String,
    pub count_query: &'q str,
    pub arguments: &'q [Argument],
    pub order: &'q [OrderSpec],
    pub first_result: Option<u64>,
    pub max_results: Option<u64>,
    pub lock_mode: Option<LockMode>,
    pub flush_mode: Option<FlushMode>,
    pub hints: &'q BTreeMap<String, serde_json::Value>,
}

/// The persistence engine that actually runs queries.
///
/// Binding arguments, executing, transactions, locking and flushing are all
/// the engine's business. Its errors are passed to the caller untouched.
pub trait ExecutionEngine<E> {
    type Error: std::error::Error + 'static;

    fn fetch(&self, request: &QueryRequest<'_>) -> Result<Vec<E>, Self::Error>;

    fn count(&self, request: &QueryRequest<'_>) -> Result<u64, Self::Error>;
}

#[derive(Debug, Error)]
pub enum ResultError<X: std::error::Error + 'static> {
    #[error("query returned no result")]
    NoResult,

    #[error("query returned {count} results where one was expected")]
    NonUniqueResult { count: usize },

    #[error(transparent)]
    Engine(X),
}

/// Configuration state of a cursor. Execution consumes the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Unconfigured,
    Configured,
}

pub struct QueryResult<'q, E, X: ?Sized> {
    engine: &'q X,
    compiled: &'q CompiledQuery,
    arguments: Vec<Argument>,
    state: CursorState,
    order: Vec<OrderSpec>,
    first_result: Option<u64>,
    max_results: Option<u64>,
    page_size: Option<u64>,
    default_page_size: u64,
    lock_mode: Option<LockMode>,
    flush_mode: Option<FlushMode>,
    hints: BTreeMap<String, serde_json::Value>,
    _entity: PhantomData<fn() -> E>,
}

impl<'q, E, X> QueryResult<'q, E, X>
where
    X: ExecutionEngine<E> + ?Sized,
{
    pub fn new(engine: &'q X, compiled: &'q CompiledQuery, arguments: Vec<Argument>) -> Self {
        Self {
            engine,
            compiled,
            arguments,
            state: CursorState::Unconfigured,
            order: compiled.tree.order.clone(),
            first_result: None,
            max_results: None,
            page_size: None,
            default_page_size: DEFAULT_PAGE_SIZE,
            lock_mode: None,
            flush_mode: None,
            hints: BTreeMap::new(),
            _entity: PhantomData,
        }
    }

    pub(crate) fn set_default_page_size(&mut self, page_size: u64) {
        self.default_page_size = page_size;
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    fn configure(&mut self) -> &mut Self {
        self.state = CursorState::Configured;
        self
    }

    fn set_order<A: Attribute<E>>(&mut self, attribute: A, direction: Direction) -> &mut Self {
        let path = AttributePath::from_dotted(&attribute.path());
        match self.order.iter_mut().find(|spec| spec.path == path) {
            Some(spec) => spec.direction = direction,
            None => self.order.push(OrderSpec::new(path, direction)),
        }
        self.configure()
    }

    /// Sort ascending by the attribute.
    pub fn order_asc<A: Attribute<E>>(&mut self, attribute: A) -> &mut Self {
        self.set_order(attribute, Direction::Asc)
    }

    /// Sort descending by the attribute.
    pub fn order_desc<A: Attribute<E>>(&mut self, attribute: A) -> &mut Self {
        self.set_order(attribute, Direction::Desc)
    }

    /// Reverts the direction of an existing order attribute, or sorts
    /// ascending if the attribute was not used before.
    pub fn change_order<A: Attribute<E>>(&mut self, attribute: A) -> &mut Self {
        let path = AttributePath::from_dotted(&attribute.path());
        match self.order.iter_mut().find(|spec| spec.path == path) {
            Some(spec) => spec.direction = spec.direction.reversed(),
            None => self.order.push(OrderSpec::new(path, Direction::Asc)),
        }
        self.configure()
    }

    /// Removes any ordering, including the one declared in the method name.
    pub fn clear_order(&mut self) -> &mut Self {
        self.order.clear();
        self.configure()
    }

    pub fn max_results(&mut self, max: u64) -> &mut Self {
        self.max_results = Some(max);
        self.configure()
    }

    pub fn first_result(&mut self, first: u64) -> &mut Self {
        self.first_result = Some(first);
        self.configure()
    }

    pub fn lock_mode(&mut self, lock_mode: LockMode) -> &mut Self {
        self.lock_mode = Some(lock_mode);
        self.configure()
    }

    pub fn flush_mode(&mut self, flush_mode: FlushMode) -> &mut Self {
        self.flush_mode = Some(flush_mode);
        self.configure()
    }

    /// Query hint handed to the engine verbatim.
    pub fn hint(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> &mut Self {
        self.hints.insert(name.into(), value.into());
        self.configure()
    }

    /// Sets the page size for further paging; also limits the result size.
    pub fn with_page_size(&mut self, page_size: u64) -> &mut Self {
        self.page_size = Some(page_size);
        self.max_results = Some(page_size);
        self.configure()
    }

    /// Moves to a 0-based page.
    pub fn to_page(&mut self, page: u64) -> &mut Self {
        let size = self.page_size();
        self.first_result = Some(page.saturating_mul(size));
        self.max_results.get_or_insert(size);
        self.configure()
    }

    pub fn next_page(&mut self) -> &mut Self {
        let size = self.page_size();
        self.first_result = Some(self.first_result.unwrap_or(0).saturating_add(size));
        self.max_results.get_or_insert(size);
        self.configure()
    }

    pub fn previous_page(&mut self) -> &mut Self {
        let size = self.page_size();
        let first = self.first_result.unwrap_or(0);
        if first < size {
            warn!(first, page_size = size, "previous page before the first one, staying at 0");
        }
        self.first_result = Some(first.saturating_sub(size));
        self.max_results.get_or_insert(size);
        self.configure()
    }

    /// Page size: explicit page size, else max results, else the default. Never 0.
    pub fn page_size(&self) -> u64 {
        self.page_size
            .or(self.max_results)
            .unwrap_or(self.default_page_size)
            .max(1)
    }

    /// 0-based page the cursor is on.
    pub fn current_page(&self) -> u64 {
        self.first_result.unwrap_or(0) / self.page_size()
    }

    /// Number of pages, from a count query.
    pub fn count_pages(&self) -> Result<u64, ResultError<X::Error>> {
        let total = self.run_count()?;
        Ok(total.div_ceil(self.page_size()))
    }

    pub fn order(&self) -> &[OrderSpec] {
        &self.order
    }

    /// Builds the request handed to the engine.
    pub fn request(&self) -> QueryRequest<'_> {
        QueryRequest {
            compiled: self.compiled,
            query: self.compiled.query_with_order(&self.order),
            count_query: &self.compiled.count_query,
            arguments: &self.arguments,
            order: &self.order,
            first_result: self.first_result,
            max_results: self.max_results,
            lock_mode: self.lock_mode,
            flush_mode: self.flush_mode,
            hints: &self.hints,
        }
    }

    fn run_count(&self) -> Result<u64, ResultError<X::Error>> {
        let request = self.request();
        debug!(query = request.count_query, "executing count query");
        self.engine.count(&request).map_err(ResultError::Engine)
    }

    /// Fetches the result list.
    pub fn result_list(self) -> Result<Vec<E>, ResultError<X::Error>> {
        let request = self.request();
        debug!(query = %request.query, first = ?request.first_result, max = ?request.max_results, "executing query");
        self.engine.fetch(&request).map_err(ResultError::Engine)
    }

    /// Fetches exactly one entity.
    pub fn single_result(self) -> Result<E, ResultError<X::Error>> {
        let mut results = self.result_list()?;
        match results.len() {
            0 => Err(ResultError::NoResult),
            1 => results.pop().ok_or(ResultError::NoResult),
            count => Err(ResultError::NonUniqueResult { count }),
        }
    }

    /// Counts the result set.
    pub fn count(self) -> Result<u64, ResultError<X::Error>> {
        self.run_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::QueryGenerator;
    use crate::parser::Parser;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    struct Person {
        name: &'static str,
    }

    const AGE: TypedAttribute<Person, u32> = TypedAttribute::new("age");

    #[derive(Debug, Error)]
    #[error("engine failure: {0}")]
    struct EngineFailure(String);

    /// Records requests and answers from a fixed row set.
    struct FakeEngine {
        rows: Vec<Person>,
        fail: bool,
        queries: RefCell<Vec<String>>,
    }

    impl FakeEngine {
        fn with_rows(names: &[&'static str]) -> Self {
            Self {
                rows: names.iter().map(|&name| Person { name }).collect(),
                fail: false,
                queries: RefCell::new(Vec::new()),
            }
        }
    }

    impl ExecutionEngine<Person> for FakeEngine {
        type Error = EngineFailure;

        fn fetch(&self, request: &QueryRequest<'_>) -> Result<Vec<Person>, EngineFailure> {
            if self.fail {
                return Err(EngineFailure("connection refused".to_string()));
            }
            self.queries.borrow_mut().push(request.query.clone());
            let first = request.first_result.unwrap_or(0) as usize;
            let max = request.max_results.map(|m| m as usize).unwrap_or(usize::MAX);
            Ok(self.rows.iter().skip(first).take(max).cloned().collect())
        }

        fn count(&self, request: &QueryRequest<'_>) -> Result<u64, EngineFailure> {
            self.queries.borrow_mut().push(request.count_query.to_string());
            Ok(self.rows.len() as u64)
        }
    }

    fn compiled(method: &str) -> CompiledQuery {
        let tree = Parser::default().parse(method).unwrap();
        CompiledQuery::new(method, "Person", tree, &QueryGenerator::default())
    }

    fn cursor<'q>(
        engine: &'q FakeEngine,
        query: &'q CompiledQuery,
        arguments: Vec<Argument>,
    ) -> QueryResult<'q, Person, FakeEngine> {
        QueryResult::new(engine, query, arguments)
    }

    #[test]
    fn test_default_page_size() {
        let engine = FakeEngine::with_rows(&[]);
        let query = compiled("findAll");
        let cursor = cursor(&engine, &query, vec![]);
        assert_eq!(cursor.page_size(), 10);
        assert_eq!(cursor.current_page(), 0);
        assert_eq!(cursor.state(), CursorState::Unconfigured);
    }

    #[test]
    fn test_pagination_arithmetic() {
        let engine = FakeEngine::with_rows(&[]);
        let query = compiled("findAll");
        let mut cursor = cursor(&engine, &query, vec![]);

        cursor.to_page(2);
        assert_eq!(cursor.request().first_result, Some(20));
        assert_eq!(cursor.current_page(), 2);

        cursor.next_page();
        assert_eq!(cursor.request().first_result, Some(30));
        assert_eq!(cursor.current_page(), 3);
        assert_eq!(cursor.state(), CursorState::Configured);
    }

    #[test]
    fn test_previous_page_clamps_at_zero() {
        let engine = FakeEngine::with_rows(&[]);
        let query = compiled("findAll");
        let mut cursor = cursor(&engine, &query, vec![]);

        cursor.to_page(0).previous_page();
        assert_eq!(cursor.request().first_result, Some(0));

        cursor.first_result(5).previous_page();
        assert_eq!(cursor.request().first_result, Some(0));
    }

    #[test]
    fn test_page_size_from_max_results() {
        let engine = FakeEngine::with_rows(&[]);
        let query = compiled("findAll");
        let mut cursor = cursor(&engine, &query, vec![]);

        cursor.max_results(4).to_page(3);
        assert_eq!(cursor.page_size(), 4);
        assert_eq!(cursor.request().first_result, Some(12));

        cursor.with_page_size(5);
        assert_eq!(cursor.page_size(), 5);
        assert_eq!(cursor.request().max_results, Some(5));

        cursor.with_page_size(0);
        assert_eq!(cursor.page_size(), 1);
    }

    #[test]
    fn test_paging_through_rows() {
        let engine = FakeEngine::with_rows(&["a", "b", "c", "d", "e"]);
        let query = compiled("findAll");
        let mut cursor = cursor(&engine, &query, vec![]);
        cursor.with_page_size(2).to_page(1);

        let names: Vec<_> = cursor.result_list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["c", "d"]);
    }

    #[test]
    fn test_count_pages() {
        let engine = FakeEngine::with_rows(&["a"; 21]);
        let query = compiled("findAll");
        let mut cursor = cursor(&engine, &query, vec![]);
        assert_eq!(cursor.count_pages().unwrap(), 3);

        cursor.with_page_size(7);
        assert_eq!(cursor.count_pages().unwrap(), 3);
        assert_eq!(cursor.count().unwrap(), 21);
        assert_eq!(engine.queries.borrow()[0], "select count(e) from Person e");
    }

    #[test]
    fn test_single_result_contract() {
        let query = compiled("findByName");
        let args = vec![Argument::value("Trap")];

        let engine = FakeEngine::with_rows(&[]);
        let result = cursor(&engine, &query, args.clone()).single_result();
        assert!(matches!(result, Err(ResultError::NoResult)));

        let engine = FakeEngine::with_rows(&["Trap", "Trap"]);
        let result = cursor(&engine, &query, args.clone()).single_result();
        assert!(matches!(result, Err(ResultError::NonUniqueResult { count: 2 })));

        let engine = FakeEngine::with_rows(&["Trap"]);
        let result = cursor(&engine, &query, args).single_result();
        assert_eq!(result.unwrap(), Person { name: "Trap" });
    }

    #[test]
    fn test_engine_errors_pass_through() {
        let mut engine = FakeEngine::with_rows(&[]);
        engine.fail = true;
        let query = compiled("findAll");
        let err = cursor(&engine, &query, vec![]).result_list().unwrap_err();
        assert!(matches!(err, ResultError::Engine(_)));
        assert_eq!(err.to_string(), "engine failure: connection refused");
    }

    #[test]
    fn test_ordering() {
        let engine = FakeEngine::with_rows(&["a"]);
        let query = compiled("findByNameOrderByTitle");
        let mut cursor = cursor(&engine, &query, vec![Argument::value("x")]);

        cursor.order_desc(AGE).change_order("title").change_order("address.city");
        assert_eq!(
            cursor.request().query,
            "select e from Person e where e.name = ?1 order by e.title desc, e.age desc, e.address.city asc"
        );

        cursor.order_asc(AGE);
        assert_eq!(cursor.order()[1].direction, Direction::Asc);

        cursor.clear_order();
        assert_eq!(cursor.request().query, "select e from Person e where e.name = ?1");

        cursor.result_list().unwrap();
        assert_eq!(
            engine.queries.borrow().as_slice(),
            ["select e from Person e where e.name = ?1"]
        );
    }

    #[test]
    fn test_passthrough_configuration() {
        let engine = FakeEngine::with_rows(&[]);
        let query = compiled("findAll");
        let mut cursor = cursor(&engine, &query, vec![]);
        cursor
            .lock_mode(LockMode::PessimisticWrite)
            .flush_mode(FlushMode::Commit)
            .hint("org.hibernate.fetchSize", 50);

        let request = cursor.request();
        assert_eq!(request.lock_mode, Some(LockMode::PessimisticWrite));
        assert_eq!(request.flush_mode, Some(FlushMode::Commit));
        assert_eq!(request.hints["org.hibernate.fetchSize"], serde_json::json!(50));
    }

    #[test]
    fn test_argument_constructors() {
        assert_eq!(Argument::value(3i32), Argument::Single(Value::Int(Some(3))));
        assert_eq!(
            Argument::list(["a", "b"]),
            Argument::List(vec![Value::from("a"), Value::from("b")])
        );
    }
}
