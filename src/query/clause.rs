// ============================================================================
//                  MARS BUILD PROCESSOR • CYPHER CLAUSE ASSEMBLY
//        A Small DSL For Building Parameterized Graph Query Pipelines
// ----------------------------------------------------------------------------
//   Architectural Role:
//       This is the query-builder's contract boundary named in spec §1: it
//       assembles Cypher query strings from structured descriptors. It does
//       not execute them — that's the `GraphClient` seam in `crate::data`.
//       Ported from `processor/db/queries/components.py`.
//
//   File:        /src/query/clause.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

/// AND/OR logic used to join clauses in a `LogicList`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOperator {
    And,
    Or,
}

impl LogicOperator {
    fn joiner(self) -> &'static str {
        match self {
            LogicOperator::And => " and ",
            LogicOperator::Or => " or ",
        }
    }
}

fn collapse_whitespace(definition: &str) -> String {
    definition.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A node in a boolean expression tree: either a raw clause string or a
/// nested, parenthesized sub-list.
#[derive(Debug, Clone)]
pub enum LogicNode {
    Leaf(String),
    Nested(LogicList),
}

/// An AND/OR-joined list of logic nodes.
#[derive(Debug, Clone)]
pub struct LogicList {
    operator: LogicOperator,
    nodes: Vec<LogicNode>,
}

impl LogicList {
    pub fn new(operator: LogicOperator) -> Self {
        LogicList {
            operator,
            nodes: Vec::new(),
        }
    }

    pub fn add(&mut self, definition: impl Into<String>) -> &mut Self {
        self.nodes.push(LogicNode::Leaf(collapse_whitespace(&definition.into())));
        self
    }

    pub fn add_nested(&mut self, nested: LogicList) -> &mut Self {
        self.nodes.push(LogicNode::Nested(nested));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn build(&self) -> Option<String> {
        if self.nodes.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .nodes
            .iter()
            .map(|node| match node {
                LogicNode::Leaf(text) => text.clone(),
                LogicNode::Nested(list) => format!("({})", list.build().unwrap_or_default()),
            })
            .collect();
        Some(parts.join(self.operator.joiner()))
    }
}

/// A single-keyword-prefixed, comma-joined clause (`match ...`, `return ...`).
#[derive(Debug, Clone, Default)]
pub struct Clause {
    prefix: &'static str,
    items: Vec<String>,
}

impl Clause {
    pub fn new(prefix: &'static str) -> Self {
        Clause {
            prefix,
            items: Vec::new(),
        }
    }

    pub fn add(&mut self, definition: impl Into<String>) -> &mut Self {
        self.items.push(collapse_whitespace(&definition.into()));
        self
    }

    pub fn build(&self) -> Option<String> {
        if self.items.is_empty() {
            return None;
        }
        Some(format!("{} {}", self.prefix, self.items.join(",")))
    }
}

/// A `where`-prefixed `LogicList`, defaulting to AND.
#[derive(Debug, Clone)]
pub struct LogicClause {
    prefix: &'static str,
    list: LogicList,
}

impl LogicClause {
    pub fn new(prefix: &'static str) -> Self {
        LogicClause {
            prefix,
            list: LogicList::new(LogicOperator::And),
        }
    }

    pub fn add(&mut self, definition: impl Into<String>) -> &mut Self {
        self.list.add(definition);
        self
    }

    pub fn add_nested(&mut self, nested: LogicList) -> &mut Self {
        self.list.add_nested(nested);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn build(&self) -> Option<String> {
        self.list.build().map(|body| format!("{} {body}", self.prefix))
    }
}

/// `with`-prefixed `<expr> as <alias>` list, alias optional.
#[derive(Debug, Clone, Default)]
pub struct AliasClause {
    items: Vec<(String, Option<String>)>,
}

impl AliasClause {
    pub fn new() -> Self {
        AliasClause::default()
    }

    pub fn add(&mut self, definition: impl Into<String>, alias: Option<&str>) -> &mut Self {
        self.items
            .push((collapse_whitespace(&definition.into()), alias.map(str::to_string)));
        self
    }

    pub fn build(&self) -> Option<String> {
        if self.items.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .items
            .iter()
            .map(|(expr, alias)| match alias {
                Some(a) => format!("{expr} as {a}"),
                None => expr.clone(),
            })
            .collect();
        Some(format!("with {}", parts.join(",")))
    }
}

/// One `with`/`match`/`where`/`with`/`return` query stage.
#[derive(Debug, Clone)]
pub struct DbQuery {
    pub input_clause: Clause,
    pub match_clause: Clause,
    pub where_clause: LogicClause,
    pub with_clause: AliasClause,
    pub return_clause: Clause,
}

impl Default for DbQuery {
    fn default() -> Self {
        DbQuery {
            input_clause: Clause::new("with"),
            match_clause: Clause::new("match"),
            where_clause: LogicClause::new("where"),
            with_clause: AliasClause::new(),
            return_clause: Clause::new("return"),
        }
    }
}

impl DbQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(&self) -> String {
        let parts = [
            self.input_clause.build(),
            self.match_clause.build(),
            self.where_clause.build(),
            self.with_clause.build(),
            self.return_clause.build(),
        ];
        parts.into_iter().flatten().collect::<Vec<_>>().join(" ")
    }
}

/// A sequence of `DbQuery` stages, each wrapped in a Cypher `call { ... }`
/// subquery, re-projected by a trailing `with`/`return`.
#[derive(Debug, Clone, Default)]
pub struct DbPipeline {
    queries: Vec<DbQuery>,
    pub with_clause: AliasClause,
    pub return_clause: Clause,
}

impl DbPipeline {
    pub fn new() -> Self {
        DbPipeline {
            queries: Vec::new(),
            with_clause: AliasClause::new(),
            return_clause: Clause::new("return"),
        }
    }

    pub fn add(&mut self, query: DbQuery) -> &mut Self {
        self.queries.push(query);
        self
    }

    pub fn build(&self) -> String {
        let calls: Vec<String> = self
            .queries
            .iter()
            .map(|q| format!("call {{{}}}", q.build()))
            .collect();
        let parts = [
            Some(calls.join(" ")),
            self.with_clause.build(),
            self.return_clause.build(),
        ];
        parts.into_iter().flatten().collect::<Vec<_>>().join(" ")
    }
}
