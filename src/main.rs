use std::path::Path;

use anyhow::{bail, Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use method_query::result::Argument;
use method_query::sql_compiler::Window;
use method_query::{ConfigError, Dialect, MethodCompiler, RepositoryConfig};

const CONFIG_FILE: &str = "repository.json";

/// Loads `repository.json` when present, defaults otherwise.
fn load_config() -> Result<RepositoryConfig> {
    match RepositoryConfig::from_json_file(CONFIG_FILE) {
        Ok(config) => {
            info!(path = CONFIG_FILE, "loaded repository config");
            Ok(config)
        }
        Err(ConfigError::NotFound(_)) => {
            warn!(path = CONFIG_FILE, "no repository config, using defaults");
            Ok(RepositoryConfig::default())
        }
        Err(e) => Err(e).context("invalid repository config"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let compiler = MethodCompiler::from_config(load_config()?);
    let mut rl = DefaultEditor::new().context("failed to initialize line editor")?;

    println!("method-query: type `<Entity> <method>`, `:help` for commands");

    loop {
        match rl.readline("query> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Err(e) = rl.add_history_entry(line) {
                    debug!(error = %e, "failed to record history entry");
                }

                if matches!(line, ":quit" | ":q" | ":exit") {
                    break;
                }
                if let Err(e) = run_line(&compiler, line) {
                    eprintln!("error: {e:#}");
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err).context("readline failed"),
        }
    }

    Ok(())
}

fn run_line(compiler: &MethodCompiler, line: &str) -> Result<()> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [":help"] => show_help(),
        [":config"] => println!("{}", serde_json::to_string_pretty(compiler.config())?),
        [":json", entity, method] => {
            let compiled = compiler.compile(method, entity)?;
            println!("{}", serde_json::to_string_pretty(&compiled)?);
        }
        [":sql", dialect, entity, method] => {
            let dialect: Dialect = dialect.parse()?;
            let compiled = compiler.compile(method, entity)?;
            // Placeholder arguments, only the statement shape matters here.
            let arguments: Vec<Argument> = compiled
                .parameters
                .iter()
                .map(|p| {
                    if p.collection {
                        Argument::List(vec![sea_query::Value::String(None)])
                    } else {
                        Argument::Single(sea_query::Value::String(None))
                    }
                })
                .collect();
            let sql = compiler.sql_compiler();
            let select = sql.select_statement(&compiled, &arguments, &compiled.tree.order, Window::default())?;
            let count = sql.count_statement(&compiled, &arguments)?;
            println!("select: {}", dialect.build(&select).sql);
            println!("count:  {}", dialect.build(&count).sql);
        }
        [entity, method] if !entity.starts_with(':') => {
            let compiled = compiler.compile(method, entity)?;
            println!("query:       {}", compiled.query);
            println!("count query: {}", compiled.count_query);
            for parameter in &compiled.parameters {
                println!(
                    "  ?{} {} ({:?}{})",
                    parameter.position,
                    parameter.attribute,
                    parameter.operator,
                    if parameter.collection { ", collection" } else { "" }
                );
            }
        }
        _ => bail!("unrecognized input '{line}', try :help"),
    }
    Ok(())
}

fn show_help() {
    println!("  <Entity> <method>               compile a method name, e.g. Person findByNameOrderByAgeDesc");
    println!("  :json <Entity> <method>         print the compiled query as JSON");
    println!("  :sql <dialect> <Entity> <method> lower to SQL (postgres, mysql, sqlite)");
    println!("  :config                         show the repository config");
    println!("  :quit                           exit");
    if !Path::new(CONFIG_FILE).exists() {
        println!("  (create {CONFIG_FILE} to change the prefix, alias, page size or table names)");
    }
}
