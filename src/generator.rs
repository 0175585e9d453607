//! Query text generation from a predicate tree.
//!
//! Output follows a JPQL-like dialect:
//!
//! ```text
//! select e from Person e where e.name = ?1 or (e.title = ?2 and e.age between ?3 and ?4) order by e.age desc
//! ```
//!
//! Placeholders are numbered in traversal order, which is the left-to-right
//! source order of the method name. Callers bind arguments by that position.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::{AndGroup, Condition, MethodQuery, OrGroup, OrderSpec};
use crate::operator::Operator;

pub const DEFAULT_ALIAS: &str = "e";

/// Single-use accumulator threaded through one generation pass.
#[derive(Debug)]
pub struct BuilderContext {
    alias: String,
    counter: usize,
    parameters: Vec<Parameter>,
}

impl BuilderContext {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            counter: 0,
            parameters: Vec::new(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Allocates the next positional placeholder for `condition`.
    fn next_placeholder(&mut self, condition: &Condition) -> String {
        self.counter += 1;
        self.parameters.push(Parameter {
            position: self.counter,
            attribute: condition.path.to_string(),
            operator: condition.operator,
            collection: condition.operator.is_collection(),
        });
        format!("?{}", self.counter)
    }

    fn into_parameters(self) -> Vec<Parameter> {
        self.parameters
    }
}

/// A positional placeholder and the condition it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// 1-based placeholder number
    pub position: usize,
    pub attribute: String,
    pub operator: Operator,
    /// Whether the bound value must be a collection
    pub collection: bool,
}

/// Generated text plus the parameters it expects.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuery {
    pub text: String,
    pub parameters: Vec<Parameter>,
}

impl GeneratedQuery {
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }
}

/// What the `select` clause returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Entity,
    Count,
}

#[derive(Debug, Clone)]
pub struct QueryGenerator {
    alias: String,
}

impl Default for QueryGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ALIAS)
    }
}

impl QueryGenerator {
    pub fn new(alias: impl Into<String>) -> Self {
        Self { alias: alias.into() }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Renders the select query, with an optional trailing `order by`.
    pub fn generate(&self, root: &OrGroup, entity: &str, order: Option<&[OrderSpec]>) -> GeneratedQuery {
        let generated = self.render(root, entity, order, Projection::Entity);
        debug!(query = %generated.text, "generated query");
        generated
    }

    /// Renders the count query for the same predicate. Ordering is dropped.
    pub fn generate_count(&self, root: &OrGroup, entity: &str) -> GeneratedQuery {
        let generated = self.render(root, entity, None, Projection::Count);
        debug!(query = %generated.text, "generated count query");
        generated
    }

    fn render(
        &self,
        root: &OrGroup,
        entity: &str,
        order: Option<&[OrderSpec]>,
        projection: Projection,
    ) -> GeneratedQuery {
        let mut ctx = BuilderContext::new(self.alias.as_str());
        let mut text = select_clause(ctx.alias(), entity, projection);

        if !root.is_empty() {
            text.push_str(" where ");
            render_or_group(root, &mut ctx, &mut text);
        }

        if let Some(order) = order.filter(|o| !o.is_empty()) {
            text.push_str(" order by ");
            render_order(order, ctx.alias(), &mut text);
        }

        GeneratedQuery {
            text,
            parameters: ctx.into_parameters(),
        }
    }
}

/// Renders a query with the default alias; returns the text and the
/// number of positional parameters.
pub fn generate(root: &OrGroup, entity: &str, order: Option<&[OrderSpec]>) -> (String, usize) {
    let generated = QueryGenerator::default().generate(root, entity, order);
    let count = generated.parameter_count();
    (generated.text, count)
}

fn select_clause(alias: &str, entity: &str, projection: Projection) -> String {
    match projection {
        Projection::Entity => format!("select {alias} from {entity} {alias}"),
        Projection::Count => format!("select count({alias}) from {entity} {alias}"),
    }
}

fn render_or_group(root: &OrGroup, ctx: &mut BuilderContext, out: &mut String) {
    let parenthesize = root.groups.len() > 1;
    for group in &root.groups {
        if !group.first {
            out.push_str(" or ");
        }
        render_and_group(group, parenthesize && group.conditions.len() > 1, ctx, out);
    }
}

fn render_and_group(group: &AndGroup, parenthesize: bool, ctx: &mut BuilderContext, out: &mut String) {
    if parenthesize {
        out.push('(');
    }
    for (index, condition) in group.conditions.iter().enumerate() {
        if index > 0 {
            out.push_str(" and ");
        }
        render_condition(condition, ctx, out);
    }
    if parenthesize {
        out.push(')');
    }
}

fn render_condition(condition: &Condition, ctx: &mut BuilderContext, out: &mut String) {
    let mut attribute = format!("{}.{}", ctx.alias(), condition.path);
    if condition.ignore_case {
        attribute = format!("upper({attribute})");
    }

    let operator = condition.operator;
    let body = match operator {
        Operator::IsNull | Operator::IsNotNull => format!("{attribute} {}", operator.symbol()),
        Operator::Between => {
            let low = ctx.next_placeholder(condition);
            let high = ctx.next_placeholder(condition);
            format!("{attribute} between {low} and {high}")
        }
        _ => {
            let mut argument = ctx.next_placeholder(condition);
            if condition.ignore_case {
                argument = format!("upper({argument})");
            }
            let argument = match operator {
                Operator::StartingWith => format!("concat({argument}, '%')"),
                Operator::EndingWith => format!("concat('%', {argument})"),
                Operator::Containing => format!("concat('%', {argument}, '%')"),
                _ => argument,
            };
            format!("{attribute} {} {argument}", operator.symbol())
        }
    };

    if condition.negated {
        out.push_str(&format!("not ({body})"));
    } else {
        out.push_str(&body);
    }
}

fn render_order(order: &[OrderSpec], alias: &str, out: &mut String) {
    let rendered: Vec<String> = order
        .iter()
        .map(|spec| format!("{alias}.{} {}", spec.path, spec.direction.as_str()))
        .collect();
    out.push_str(&rendered.join(", "));
}

/// A method name compiled against an entity.
///
/// This is what gets handed to the execution engine: the query text, the
/// matching count query and the ordered placeholder list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub entity: String,
    pub method: String,
    pub alias: String,
    pub tree: MethodQuery,
    pub query: String,
    pub count_query: String,
    pub parameters: Vec<Parameter>,
}

impl CompiledQuery {
    pub fn new(method: &str, entity: &str, tree: MethodQuery, generator: &QueryGenerator) -> Self {
        let generated = generator.generate(&tree.predicate, entity, Some(&tree.order));
        let count = generator.generate_count(&tree.predicate, entity);
        Self {
            entity: entity.to_string(),
            method: method.to_string(),
            alias: generator.alias().to_string(),
            query: generated.text,
            count_query: count.text,
            parameters: generated.parameters,
            tree,
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Re-renders the select query with a different ordering.
    pub fn query_with_order(&self, order: &[OrderSpec]) -> String {
        QueryGenerator::new(self.alias.as_str())
            .generate(&self.tree.predicate, &self.entity, Some(order))
            .text
    }
}
