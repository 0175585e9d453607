use serde::{Deserialize, Serialize};

use crate::operator::Operator;

/// A parsed method name: the predicate tree plus the `OrderBy` clause.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MethodQuery {
    pub predicate: OrGroup,
    /// Ordering declared in the method name, e.g. `...OrderByAgeDesc`
    pub order: Vec<OrderSpec>,
}

impl MethodQuery {
    pub fn parameter_count(&self) -> usize {
        self.predicate.parameter_count()
    }
}

/// Root of the predicate tree: a disjunction of conjunctions.
///
/// An empty group means the method selects everything (`findAll`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrGroup {
    pub groups: Vec<AndGroup>,
}

impl OrGroup {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Conditions in source order, left to right
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.groups.iter().flat_map(|g| g.conditions.iter())
    }

    pub fn parameter_count(&self) -> usize {
        self.conditions().map(Condition::parameter_count).sum()
    }
}

/// A conjunction of conditions, e.g. `TitleAndAge`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AndGroup {
    pub conditions: Vec<Condition>,
    /// Set on the first group of the tree
    pub first: bool,
}

/// A leaf of the tree: one attribute compared by one operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub path: AttributePath,
    pub operator: Operator,
    pub negated: bool,
    pub ignore_case: bool,
}

impl Condition {
    pub fn new(path: AttributePath, operator: Operator) -> Self {
        Self {
            path,
            operator,
            negated: false,
            ignore_case: false,
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.operator.arity()
    }
}

/// Dotted attribute path, e.g. `address.zipCode`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributePath(pub Vec<String>);

impl AttributePath {
    /// Builds a path from a dotted string. No validation is done here; an
    /// invalid path is reported by the execution engine at first use.
    pub fn from_dotted(path: &str) -> Self {
        Self(path.split('.').map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Sort direction of an order entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub path: AttributePath,
    pub direction: Direction,
}

impl OrderSpec {
    pub fn new(path: AttributePath, direction: Direction) -> Self {
        Self { path, direction }
    }
}
