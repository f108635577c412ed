//! SELECT compilation.
//!
//! A [`QueryCompiler`] accumulates a target table, selected fields, joins, a
//! [`Filter`], ordering and pagination bounds, then renders them into
//! parameterized SQL text. Values are never inlined: each comparison operand is
//! bound to a generated `:valueN` placeholder and returned alongside the text in
//! a [`CompiledQuery`]. Escaping is the engine's job, see [`CompiledQuery::to_sql`].

use core::fmt;
use core::str::FromStr;

use compact_str::{CompactString, format_compact};
use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use crate::collection::ResultSet;
use crate::engine::Engine;
use crate::error::{Result, TuskError};
use crate::filter::{Filter, FilterNode, IntoFilter, Logic};
use crate::paginate::Pagination;
use crate::record::{Entity, Fields, ModelInfo, Record};
use crate::value::Value;

/// Sort direction for ORDER BY clauses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderBy {
    Asc,
    Desc,
}

impl OrderBy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderBy::Asc => "ASC",
            OrderBy::Desc => "DESC",
        }
    }

    /// Parses a direction token case-insensitively; anything but ASC/DESC is rejected.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("asc") {
            Ok(OrderBy::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(OrderBy::Desc)
        } else {
            Err(TuskError::InvalidOrder(s.to_string()))
        }
    }
}

impl FromStr for OrderBy {
    type Err = TuskError;

    fn from_str(s: &str) -> Result<Self> {
        OrderBy::parse(s)
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `INNER JOIN table ON table.local_key = base.foreign_key`
#[derive(Debug, Clone, PartialEq, Eq)]
struct JoinClause {
    table: CompactString,
    local_key: CompactString,
    foreign_key: CompactString,
    /// Table the join key is resolved against; differs from the compiler's own
    /// table for joins absorbed from a joined compiler.
    base: CompactString,
}

/// What a JOIN attaches: a bare table, or another compiler whose fields,
/// filter and joins are merged into the joining one.
#[derive(Debug, Clone)]
pub enum JoinTarget {
    Table(CompactString),
    Compiler(Box<QueryCompiler>),
}

impl From<&str> for JoinTarget {
    fn from(table: &str) -> Self {
        JoinTarget::Table(table.into())
    }
}

impl From<String> for JoinTarget {
    fn from(table: String) -> Self {
        JoinTarget::Table(table.into())
    }
}

impl From<QueryCompiler> for JoinTarget {
    fn from(compiler: QueryCompiler) -> Self {
        JoinTarget::Compiler(Box::new(compiler))
    }
}

/// Output of [`QueryCompiler::build`]: SQL text with `:valueN` placeholders and
/// the values they stand for, in binding order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub values: IndexMap<CompactString, Value>,
}

impl CompiledQuery {
    /// Substitutes every placeholder with its escaped value.
    ///
    /// Scalars are quoted around `engine.escape(value)`, `NULL` stays bare and
    /// lists become a parenthesized comma list, `(FALSE)` when empty so that
    /// `IN ()` is never produced.
    pub fn to_sql(&self, engine: &dyn Engine) -> String {
        let mut out = String::with_capacity(self.sql.len() + self.values.len() * 8);
        let mut rest = self.sql.as_str();

        while let Some(pos) = rest.find(':') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let name_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());

            match self.values.get(&after[..name_len]) {
                Some(value) if name_len > 0 => {
                    out.push_str(&render_value(engine, value));
                    rest = &after[name_len..];
                }
                _ => {
                    out.push(':');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn render_value(engine: &dyn Engine, value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::List(items) if items.is_empty() => "(FALSE)".to_string(),
        Value::List(items) => {
            let rendered: Vec<String> = items.iter().map(|v| render_value(engine, v)).collect();
            format!("({})", rendered.join(", "))
        }
        scalar => format!("'{}'", engine.escape(scalar)),
    }
}

/// Back-quotes an identifier per dotted segment: `a.b` becomes `` `a`.`b` ``.
pub fn quote_ident(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, segment) in ident.split('.').enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push('`');
        out.push_str(&segment.replace('`', "``"));
        out.push('`');
    }
    out
}

/// Numbers bound values in visitation order within one `build()` call.
#[derive(Default)]
struct Bindings {
    values: IndexMap<CompactString, Value>,
}

impl Bindings {
    fn bind(&mut self, value: &Value) -> CompactString {
        let name = format_compact!("value{}", self.values.len() + 1);
        let placeholder = format_compact!(":{name}");
        self.values.insert(name, value.clone());
        placeholder
    }
}

/// Fluent SELECT builder for one table, optionally bound to a record type.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    table: CompactString,
    model: Option<&'static ModelInfo>,
    fields: IndexSet<CompactString>,
    joins: SmallVec<[JoinClause; 2]>,
    filter: Filter,
    orders: IndexMap<CompactString, OrderBy>,
    offset: u64,
    limit: Option<u64>,
}

impl QueryCompiler {
    /// Creates a compiler for a raw table name with no record type bound.
    pub fn new(table: impl Into<CompactString>) -> Self {
        Self {
            table: table.into(),
            model: None,
            fields: IndexSet::new(),
            joins: SmallVec::new(),
            filter: Filter::new(),
            orders: IndexMap::new(),
            offset: 0,
            limit: None,
        }
    }

    /// Creates a compiler bound to a record type.
    ///
    /// The descriptor is validated here, and an inheritance parent is joined
    /// once (recursively for its own parent) with its declared columns selected.
    pub fn for_model(model: &'static ModelInfo) -> Result<Self> {
        model.validate()?;
        let mut compiler = QueryCompiler::new(model.table);
        compiler.model = Some(model);

        if let Some(inherit) = &model.parent {
            let parent_model = (inherit.model)();
            let parent = QueryCompiler::for_model(parent_model)?
                .select(parent_model.columns.iter().copied());
            compiler = compiler.join_on(parent, inherit.local_key, inherit.foreign_key);
        }
        Ok(compiler)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub const fn model(&self) -> Option<&'static ModelInfo> {
        self.model
    }

    pub const fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Adds output fields, qualified with this compiler's table unless already dotted.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for field in fields {
            let field = field.as_ref();
            if field.is_empty() {
                continue;
            }
            let qualified = if field.contains('.') {
                CompactString::from(field)
            } else {
                format_compact!("{}.{field}", self.table)
            };
            self.fields.insert(qualified);
        }
        self
    }

    /// Appends `expr` under AND, qualifying bare field names with this table.
    pub fn r#where(mut self, expr: impl IntoFilter) -> Self {
        self.append(Logic::And, expr);
        self
    }

    /// Appends `expr` under OR, qualifying bare field names with this table.
    pub fn or_where(mut self, expr: impl IntoFilter) -> Self {
        self.append(Logic::Or, expr);
        self
    }

    fn append(&mut self, op: Logic, expr: impl IntoFilter) {
        if let Some(mut node) = expr.into_filter() {
            node.qualify(&self.table);
            self.filter.push(op, node);
        }
    }

    /// Joins `target` on `target.key = table.key`.
    pub fn join(self, target: impl Into<JoinTarget>, key: &str) -> Self {
        self.join_on(target, key, key)
    }

    /// Joins `target` on `target.local_key = table.foreign_key`.
    ///
    /// A joined compiler is merged: its selected fields, filter and own joins
    /// become part of this statement.
    pub fn join_on(
        mut self,
        target: impl Into<JoinTarget>,
        local_key: &str,
        foreign_key: &str,
    ) -> Self {
        let other = match target.into() {
            JoinTarget::Table(table) => {
                self.push_join(table, local_key, foreign_key);
                return self;
            }
            JoinTarget::Compiler(other) => *other,
        };

        self.push_join(other.table, local_key, foreign_key);
        self.fields.extend(other.fields);
        self.joins.extend(other.joins);
        if let Some(root) = other.filter.into_filter() {
            self.filter.push(Logic::And, root);
        }
        self
    }

    fn push_join(&mut self, table: CompactString, local_key: &str, foreign_key: &str) {
        self.joins.push(JoinClause {
            table,
            local_key: local_key.into(),
            foreign_key: foreign_key.into(),
            base: self.table.clone(),
        });
    }

    /// Orders by `field`; ordering the same field again replaces its direction in place.
    pub fn order(mut self, field: impl Into<CompactString>, direction: OrderBy) -> Self {
        self.orders.insert(field.into(), direction);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the row limit; a negative limit means unbounded and drops the LIMIT clause.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = u64::try_from(limit).ok();
        self
    }

    /// Applies parsed request pagination: filter, ordering and bounds.
    pub fn paginate(mut self, pagination: &Pagination) -> Self {
        self.append(Logic::And, &pagination.filter);
        for (field, direction) in &pagination.orders {
            self.orders.insert(field.clone(), *direction);
        }
        self.offset = pagination.offset;
        self.limit = pagination.limit;
        self
    }

    /// Renders the statement and its bound values.
    pub fn build(&self) -> CompiledQuery {
        let mut bindings = Bindings::default();
        let mut sql = String::with_capacity(128);

        self.write_select(&mut sql);
        self.write_joins(&mut sql);

        if let Some(root) = self.filter.root() {
            sql.push_str(" WHERE ");
            write_filter(root, &mut bindings, &mut sql);
        }

        self.write_orders(&mut sql);

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}, {limit}", self.offset));
        }

        CompiledQuery {
            sql,
            values: bindings.values,
        }
    }

    fn write_select(&self, sql: &mut String) {
        let table_prefix = format_compact!("{}.", self.table);
        let from_table = self.fields.iter().any(|f| f.starts_with(table_prefix.as_str()));

        let mut fields: Vec<String> = Vec::with_capacity(self.fields.len() + 1);
        if !from_table {
            fields.push(format!("{}.*", quote_ident(&self.table)));
        }
        fields.extend(self.fields.iter().map(|f| quote_ident(f)));

        sql.push_str("SELECT SQL_CALC_FOUND_ROWS ");
        sql.push_str(&fields.join(", "));
        sql.push_str(" FROM ");
        sql.push_str(&quote_ident(&self.table));
    }

    fn write_joins(&self, sql: &mut String) {
        for join in &self.joins {
            sql.push_str(" INNER JOIN ");
            sql.push_str(&quote_ident(&join.table));
            sql.push_str(" ON ");
            sql.push_str(&quote_ident(&format!("{}.{}", join.table, join.local_key)));
            sql.push_str(" = ");
            sql.push_str(&quote_ident(&format!("{}.{}", join.base, join.foreign_key)));
        }
    }

    fn write_orders(&self, sql: &mut String) {
        if self.orders.is_empty() {
            return;
        }
        let orders: Vec<String> = self
            .orders
            .iter()
            .map(|(field, direction)| format!("{} {direction}", quote_ident(field)))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&orders.join(", "));
    }

    /// Runs the compiled statement and returns the rows plus the unrestricted row count.
    pub fn execute(&self, engine: &dyn Engine) -> Result<(Vec<Fields>, u64)> {
        let compiled = self.build();
        crate::tusk_trace_query!(&compiled.sql, compiled.values.len());
        let rows = engine.query(&compiled.to_sql(engine))?;
        let total = engine.found_rows()?;
        Ok((rows, total))
    }

    fn bound_model(&self) -> Result<&'static ModelInfo> {
        self.model.ok_or_else(|| {
            TuskError::BuilderMisuse(format!(
                "cannot execute a query on `{}` without a bound record type",
                self.table
            ))
        })
    }

    /// Executes through the bound record type's query hook.
    pub fn get<M: Record>(&self, engine: &dyn Engine) -> Result<ResultSet<M>> {
        let model = self.bound_model()?;
        let wanted = M::descriptor();
        if model.name != wanted.name {
            return Err(TuskError::BuilderMisuse(format!(
                "query is bound to `{}` but `{}` was requested",
                model.name, wanted.name
            )));
        }
        M::query(self, engine)
    }

    /// `offset(0).limit(1).get().first()`
    pub fn first<M: Record>(&self, engine: &dyn Engine) -> Result<Option<M>> {
        Ok(self.clone().offset(0).limit(1).get::<M>(engine)?.into_first())
    }

    /// Executes and loads rows through the bound descriptor without naming the
    /// record type; used when resolving deferred relations.
    pub fn get_dynamic(&self, engine: &dyn Engine) -> Result<ResultSet<Box<dyn Entity>>> {
        let model = self.bound_model()?;
        let (rows, total) = self.execute(engine)?;
        let mut set = ResultSet::for_model(model).with_total(total);
        for row in rows {
            set.add((model.load)(row)?)?;
        }
        Ok(set)
    }
}

/// Renders one filter node; groups are parenthesized, unary comparisons bind nothing.
fn write_filter(node: &FilterNode, bindings: &mut Bindings, sql: &mut String) {
    match node {
        FilterNode::Logical { op, left, right } => {
            sql.push('(');
            write_filter(left, bindings, sql);
            sql.push(' ');
            sql.push_str(op.as_str());
            sql.push(' ');
            write_filter(right, bindings, sql);
            sql.push(')');
        }
        FilterNode::Comparison {
            field,
            operator,
            operand,
        } => {
            sql.push_str(&quote_ident(field));
            sql.push(' ');
            sql.push_str(operator);
            if let Some(operand) = operand {
                sql.push(' ');
                sql.push_str(&bindings.bind(operand));
            }
        }
    }
}
