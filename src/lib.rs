//! Derived queries from repository method names.
//!
//! A method name such as `findByNameOrTitleAndAgeOrderByAgeDesc` is cut into
//! an OR-of-ANDs predicate tree, rendered as query text with positional
//! placeholders, and wrapped in a lazily executed result cursor:
//!
//! ```
//! use method_query::MethodCompiler;
//!
//! let compiled = MethodCompiler::new()
//!     .compile("findByNameOrTitleAndAgeOrderByAgeDesc", "Person")
//!     .unwrap();
//! assert_eq!(
//!     compiled.query,
//!     "select e from Person e where e.name = ?1 or (e.title = ?2 and e.age = ?3) order by e.age desc"
//! );
//! ```

pub mod ast;
pub mod compiler;
pub mod config;
pub mod error;
pub mod generator;
pub mod lexer;
pub mod operator;
pub mod parser;
pub mod result;
pub mod sql_compiler;
pub mod token;

pub use compiler::MethodCompiler;
pub use config::{ConfigError, RepositoryConfig, TableMapping};
pub use error::CompileError;
pub use generator::{CompiledQuery, Parameter, QueryGenerator};
pub use result::{Argument, Attribute, ExecutionEngine, QueryRequest, QueryResult, ResultError, TypedAttribute};
pub use sql_compiler::{Dialect, SqlCompiler};
