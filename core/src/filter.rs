//! WHERE-clause logic as a binary tree.
//!
//! A [`Filter`] starts empty. The first appended expression becomes the root;
//! every later one wraps the current root and itself in a new
//! [`FilterNode::Logical`], so `a AND b AND c` nests as `((a AND b) AND c)`.
//!
//! The transport form is JSON shaped `{"<op>": [operand, ...]}`, base64 encoded
//! by [`Filter::serialize`] so it survives a query string.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use compact_str::{CompactString, format_compact};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TuskError};
use crate::value::Value;

/// Boolean connective of a [`FilterNode::Logical`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "AND" => Some(Logic::And),
            "OR" => Some(Logic::Or),
            _ => None,
        }
    }
}

/// Comparison operators accepted from the transport form.
const TRANSPORT_OPERATORS: &[&str] = &[
    "=", "!=", "<>", "<", "<=", ">", ">=", "LIKE", "NOT LIKE", "IN", "NOT IN", "IS NULL",
    "IS NOT NULL",
];

fn transport_operator(key: &str) -> Option<&'static str> {
    let key = key.trim();
    TRANSPORT_OPERATORS
        .iter()
        .copied()
        .find(|op| op.eq_ignore_ascii_case(key))
}

/// One node of a filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// `field operator operand`; `operand` is absent for unary operators like `IS NULL`
    Comparison {
        field: CompactString,
        operator: CompactString,
        operand: Option<Value>,
    },
    Logical {
        op: Logic,
        left: Box<FilterNode>,
        right: Box<FilterNode>,
    },
}

impl FilterNode {
    /// Creates a binary comparison: `field operator :value`.
    pub fn binary(
        field: impl Into<CompactString>,
        operator: impl Into<CompactString>,
        operand: impl Into<Value>,
    ) -> Self {
        FilterNode::Comparison {
            field: field.into(),
            operator: operator.into(),
            operand: Some(operand.into()),
        }
    }

    /// Creates a unary comparison: `field operator`.
    pub fn unary(field: impl Into<CompactString>, operator: impl Into<CompactString>) -> Self {
        FilterNode::Comparison {
            field: field.into(),
            operator: operator.into(),
            operand: None,
        }
    }

    pub fn logical(op: Logic, left: FilterNode, right: FilterNode) -> Self {
        FilterNode::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Prefixes every unqualified field in the subtree with `table.`.
    pub fn qualify(&mut self, table: &str) {
        match self {
            FilterNode::Comparison { field, .. } => {
                if !field.contains('.') {
                    *field = format_compact!("{table}.{field}");
                }
            }
            FilterNode::Logical { left, right, .. } => {
                left.qualify(table);
                right.qualify(table);
            }
        }
    }

    /// Returns the first non-finite float operand in the subtree; JSON cannot carry it.
    fn non_finite(&self) -> Option<(&str, f64)> {
        match self {
            FilterNode::Comparison { field, operand, .. } => {
                operand.as_ref()?.non_finite().map(|f| (field.as_str(), f))
            }
            FilterNode::Logical { left, right, .. } => {
                left.non_finite().or_else(|| right.non_finite())
            }
        }
    }

    /// Encodes the node as `{"<op>": [operand, ...]}`.
    pub fn to_json(&self) -> serde_json::Value {
        let (key, operands) = match self {
            FilterNode::Comparison {
                field,
                operator,
                operand,
            } => {
                let mut operands = vec![serde_json::Value::String(field.to_string())];
                if let Some(operand) = operand {
                    operands.push(operand.to_json());
                }
                (operator.to_string(), operands)
            }
            FilterNode::Logical { op, left, right } => {
                (op.as_str().to_string(), vec![left.to_json(), right.to_json()])
            }
        };
        let mut map = serde_json::Map::with_capacity(1);
        map.insert(key, serde_json::Value::Array(operands));
        serde_json::Value::Object(map)
    }

    /// Decodes the `{"<op>": [operand, ...]}` form.
    ///
    /// Groups carrying more than two operands are folded left, matching the
    /// nesting that [`Filter::where`](Filter::r#where) produces.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let map = json
            .as_object()
            .ok_or_else(|| TuskError::Transport(format!("expected filter object, got {json}")))?;
        let mut entries = map.iter();
        let (key, operands) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(TuskError::Transport(format!(
                    "filter object must have exactly one operator, got {}",
                    map.len()
                )));
            }
        };
        let operands = operands
            .as_array()
            .ok_or_else(|| TuskError::Transport(format!("operands of `{key}` must be an array")))?;

        if let Some(op) = Logic::parse(key) {
            let mut nodes = operands.iter().map(FilterNode::from_json);
            let first = nodes
                .next()
                .ok_or_else(|| TuskError::Transport(format!("`{key}` group has no operands")))??;
            return nodes.try_fold(first, |acc, node| Ok(FilterNode::logical(op, acc, node?)));
        }

        let operator = transport_operator(key)
            .ok_or_else(|| TuskError::Transport(format!("unsupported operator `{key}`")))?;
        let field = match operands.first() {
            Some(serde_json::Value::String(field)) => field,
            _ => {
                return Err(TuskError::Transport(format!(
                    "`{key}` comparison must start with a field name"
                )));
            }
        };
        let operand = match operands.get(1) {
            None => None,
            Some(json) => Some(Value::from_json(json).ok_or_else(|| {
                TuskError::Transport(format!("unsupported operand for `{field}`: {json}"))
            })?),
        };
        Ok(FilterNode::Comparison {
            field: field.into(),
            operator: operator.into(),
            operand,
        })
    }
}

impl Serialize for FilterNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FilterNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        FilterNode::from_json(&json).map_err(serde::de::Error::custom)
    }
}

/// Anything that can be appended to a [`Filter`].
///
/// `None` means "nothing to append" and leaves the filter untouched.
pub trait IntoFilter {
    fn into_filter(self) -> Option<FilterNode>;
}

impl IntoFilter for FilterNode {
    fn into_filter(self) -> Option<FilterNode> {
        Some(self)
    }
}

impl IntoFilter for Option<FilterNode> {
    fn into_filter(self) -> Option<FilterNode> {
        self
    }
}

impl IntoFilter for Filter {
    fn into_filter(self) -> Option<FilterNode> {
        self.root
    }
}

impl IntoFilter for &Filter {
    fn into_filter(self) -> Option<FilterNode> {
        self.root.clone()
    }
}

impl<V: Into<Value>> IntoFilter for (&str, &str, V) {
    fn into_filter(self) -> Option<FilterNode> {
        let (field, operator, operand) = self;
        if field.is_empty() {
            return None;
        }
        Some(FilterNode::binary(field, operator, operand))
    }
}

impl IntoFilter for (&str, &str) {
    fn into_filter(self) -> Option<FilterNode> {
        let (field, operator) = self;
        if field.is_empty() {
            return None;
        }
        Some(FilterNode::unary(field, operator))
    }
}

/// A possibly empty filter tree with fluent `where`/`or_where` composition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    root: Option<FilterNode>,
}

impl Filter {
    pub const fn new() -> Self {
        Self { root: None }
    }

    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub const fn root(&self) -> Option<&FilterNode> {
        self.root.as_ref()
    }

    /// Appends `expr` under AND.
    pub fn r#where(mut self, expr: impl IntoFilter) -> Self {
        if let Some(node) = expr.into_filter() {
            self.push(Logic::And, node);
        }
        self
    }

    /// Appends `expr` under OR.
    pub fn or_where(mut self, expr: impl IntoFilter) -> Self {
        if let Some(node) = expr.into_filter() {
            self.push(Logic::Or, node);
        }
        self
    }

    /// Appends `node`: it replaces an empty root, otherwise it is joined to
    /// the current root by `op`.
    pub fn push(&mut self, op: Logic, node: FilterNode) {
        self.root = Some(match self.root.take() {
            None => node,
            Some(root) => FilterNode::logical(op, root, node),
        });
    }

    /// Prefixes every unqualified field with `table.`.
    pub fn qualify(&mut self, table: &str) {
        if let Some(root) = self.root.as_mut() {
            root.qualify(table);
        }
    }

    /// Returns the tree as plain nested JSON; an empty filter is `{}`.
    pub fn build(&self) -> serde_json::Value {
        match &self.root {
            Some(root) => root.to_json(),
            None => serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Encodes the filter as base64 JSON for transport across a request boundary.
    ///
    /// NaN and infinite operands have no JSON form and are rejected.
    pub fn serialize(&self) -> Result<String> {
        if let Some((field, value)) = self.root.as_ref().and_then(FilterNode::non_finite) {
            return Err(TuskError::Transport(format!(
                "operand of `{field}` is not a finite number: {value}"
            )));
        }
        Ok(STANDARD.encode(self.build().to_string()))
    }

    /// Decodes the output of [`Filter::serialize`].
    ///
    /// `null`, `[]` and `{}` all decode to the empty filter.
    pub fn deserialize(encoded: &str) -> Result<Filter> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| TuskError::Transport(format!("invalid base64: {e}")))?;
        let json: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| TuskError::Transport(format!("invalid JSON: {e}")))?;

        let empty = match &json {
            serde_json::Value::Null => true,
            serde_json::Value::Array(items) => items.is_empty(),
            serde_json::Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if empty {
            return Ok(Filter::new());
        }
        Ok(Filter {
            root: Some(FilterNode::from_json(&json)?),
        })
    }
}

impl From<FilterNode> for Filter {
    fn from(root: FilterNode) -> Self {
        Self { root: Some(root) }
    }
}
