//! Records: typed views over an ordered field map.
//!
//! Every record type has a static [`ModelInfo`] descriptor (table, primary key,
//! declared columns, optional inheritance parent). [`Entity`] is the object-safe
//! face used by hydration and result sets; [`Record`] adds construction, the
//! query hook, lifecycle hooks and CRUD helpers. Most types are declared with
//! [`record!`](crate::record!), which generates typed accessors and both impls.

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::collection::ResultSet;
use crate::compiler::QueryCompiler;
use crate::engine::Engine;
use crate::error::{Result, TuskError};
use crate::filter::{FilterNode, IntoFilter, Logic};
use crate::paginate::Pagination;
use crate::value::Value;

/// Ordered column name to value map backing every record.
pub type Fields = IndexMap<CompactString, Value>;

/// Single-table inheritance link to a parent record type.
///
/// The parent's table is joined on `parent.local_key = child.foreign_key`
/// and its declared columns are selected alongside the child's.
#[derive(Debug, Clone, Copy)]
pub struct Inheritance {
    pub model: fn() -> &'static ModelInfo,
    pub local_key: &'static str,
    pub foreign_key: &'static str,
}

/// Static descriptor of a record type.
#[derive(Debug)]
pub struct ModelInfo {
    pub name: &'static str,
    pub table: &'static str,
    pub primary_key: &'static [&'static str],
    /// Declared scalar columns, selected when this type is joined as a parent.
    pub columns: &'static [&'static str],
    pub parent: Option<Inheritance>,
    /// Builds a type-erased record from a row.
    pub load: fn(Fields) -> Result<Box<dyn Entity>>,
}

impl ModelInfo {
    /// Fails when the table or primary key descriptor is missing.
    pub fn validate(&self) -> Result<()> {
        if self.table.is_empty() {
            return Err(TuskError::ConfigurationMissing(format!(
                "record type `{}` has no table",
                self.name
            )));
        }
        if self.primary_key.is_empty() || self.primary_key.iter().any(|k| k.is_empty()) {
            return Err(TuskError::ConfigurationMissing(format!(
                "record type `{}` has no primary key",
                self.name
            )));
        }
        Ok(())
    }

    /// Equality filter on the primary key; composite keys expect a list of the same length.
    pub fn key_filter(&self, id: &Value) -> Result<FilterNode> {
        self.validate()?;
        match (self.primary_key, id) {
            ([key], id) => Ok(FilterNode::binary(*key, "=", id.clone())),
            ([first, rest @ ..], Value::List(values)) if values.len() == rest.len() + 1 => {
                let mut node = FilterNode::binary(*first, "=", values[0].clone());
                for (key, value) in rest.iter().zip(&values[1..]) {
                    node = FilterNode::logical(
                        Logic::And,
                        node,
                        FilterNode::binary(*key, "=", value.clone()),
                    );
                }
                Ok(node)
            }
            (keys, id) => Err(TuskError::BuilderMisuse(format!(
                "`{}` has a {}-column primary key, got id {id:?}",
                self.name,
                keys.len()
            ))),
        }
    }
}

/// Object-safe view of a record.
pub trait Entity {
    fn model(&self) -> &'static ModelInfo;

    fn fields(&self) -> &Fields;

    /// Names of the relation accessors expanded during hydration.
    fn relations(&self) -> &'static [&'static str] {
        &[]
    }

    /// Resolves one declared relation.
    fn resolve(&self, relation: &str, engine: &dyn Engine) -> Result<Relation> {
        let _ = (relation, engine);
        Ok(Relation::None)
    }

    /// Lightweight reference form used in place of full expansion, if any.
    fn reference(&self) -> Option<serde_json::Value> {
        None
    }

    fn get(&self, field: &str) -> Option<&Value> {
        self.fields().get(field)
    }

    /// Primary key value; a list for composite keys. `None` if any part is missing.
    fn id(&self) -> Option<Value> {
        let keys = self.model().primary_key;
        let mut parts = Vec::with_capacity(keys.len());
        for key in keys {
            match self.fields().get(*key) {
                Some(value) if !value.is_null() => parts.push(value.clone()),
                _ => return None,
            }
        }
        match parts.len() {
            1 => parts.pop(),
            _ => Some(Value::List(parts)),
        }
    }
}

impl Entity for Box<dyn Entity> {
    fn model(&self) -> &'static ModelInfo {
        (**self).model()
    }

    fn fields(&self) -> &Fields {
        (**self).fields()
    }

    fn relations(&self) -> &'static [&'static str] {
        (**self).relations()
    }

    fn resolve(&self, relation: &str, engine: &dyn Engine) -> Result<Relation> {
        (**self).resolve(relation, engine)
    }

    fn reference(&self) -> Option<serde_json::Value> {
        (**self).reference()
    }
}

/// Value produced by a relation accessor.
pub enum Relation {
    None,
    Scalar(Value),
    One(Box<dyn Entity>),
    Many(Vec<Box<dyn Entity>>),
    List(Vec<Relation>),
    /// A query executed only when the relation is hydrated
    Deferred(QueryCompiler),
}

impl Relation {
    pub fn one(record: impl Entity + 'static) -> Self {
        Relation::One(Box::new(record))
    }

    pub fn optional<E: Entity + 'static>(record: Option<E>) -> Self {
        record.map_or(Relation::None, Relation::one)
    }

    pub fn many<E: Entity + 'static>(records: ResultSet<E>) -> Self {
        Relation::Many(
            records
                .into_iter()
                .map(|record| Box::new(record) as Box<dyn Entity>)
                .collect(),
        )
    }
}

/// Loads a type-erased record; the `load` entry of generated descriptors.
pub fn load_boxed<R: Record>(fields: Fields) -> Result<Box<dyn Entity>> {
    Ok(Box::new(R::from_fields(fields)?))
}

/// A concrete record type.
pub trait Record: Entity + Sized + 'static {
    fn descriptor() -> &'static ModelInfo;

    fn from_fields(fields: Fields) -> Result<Self>;

    fn fields_mut(&mut self) -> &mut Fields;

    /// Merges `data` into the record, overwriting existing fields.
    fn merge(&mut self, data: Fields) {
        self.fields_mut().extend(data);
    }

    fn before_create(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_create(&mut self) -> Result<()> {
        Ok(())
    }

    fn before_update(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_update(&mut self) -> Result<()> {
        Ok(())
    }

    fn before_delete(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_delete(&mut self) -> Result<()> {
        Ok(())
    }

    /// A compiler bound to this type, parent tables already joined.
    fn compiler() -> Result<QueryCompiler> {
        QueryCompiler::for_model(Self::descriptor())
    }

    /// Static query hook: executes `compiler` and maps rows to records.
    fn query(compiler: &QueryCompiler, engine: &dyn Engine) -> Result<ResultSet<Self>> {
        let (rows, total) = compiler.execute(engine)?;
        let mut set = ResultSet::for_model(Self::descriptor()).with_total(total);
        for row in rows {
            set.add(Self::from_fields(row)?)?;
        }
        Ok(set)
    }

    fn find(engine: &dyn Engine, id: impl Into<Value>) -> Result<Self> {
        let model = Self::descriptor();
        let id = id.into();
        let not_found =
            || TuskError::NotFound(format!("{} with id={} not found", model.name, id.key()));

        if id.is_null() || id.as_str() == Some("") {
            return Err(not_found());
        }
        let filter = model.key_filter(&id)?;
        Self::compiler()?
            .r#where(filter)
            .first::<Self>(engine)?
            .ok_or_else(not_found)
    }

    fn find_first(engine: &dyn Engine, filter: impl IntoFilter) -> Result<Option<Self>> {
        Self::compiler()?.r#where(filter).first::<Self>(engine)
    }

    fn find_all(engine: &dyn Engine, filter: impl IntoFilter) -> Result<ResultSet<Self>> {
        Self::compiler()?.r#where(filter).get::<Self>(engine)
    }

    fn paginate(engine: &dyn Engine, pagination: &Pagination) -> Result<ResultSet<Self>> {
        Self::compiler()?.paginate(pagination).get::<Self>(engine)
    }

    /// Inserts `fields` and reloads the stored row.
    ///
    /// `created_at` is left to the database, as is a single-column primary key.
    fn create(engine: &dyn Engine, fields: Fields) -> Result<Self> {
        let model = Self::descriptor();
        let mut record = Self::from_fields(fields)?;
        record.before_create()?;

        let mut data = record.fields().clone();
        data.shift_remove("created_at");
        if let [key] = model.primary_key {
            data.shift_remove(*key);
        }

        let generated = engine.insert(model.table, &data)?;
        let id = match model.primary_key {
            [_] => generated,
            keys => Value::List(
                keys.iter()
                    .map(|key| data.get(*key).cloned().unwrap_or_default())
                    .collect(),
            ),
        };
        if id.is_null() {
            return Err(TuskError::Engine(format!(
                "unable to create `{}`: no identifier returned",
                model.name
            )));
        }

        let mut created = Self::find(engine, id)?;
        created.after_create()?;
        Ok(created)
    }

    /// Writes every field back to the row identified by the primary key.
    fn save(&mut self, engine: &dyn Engine) -> Result<u64> {
        let model = Self::descriptor();
        self.before_update()?;
        let id = self.id().ok_or_else(|| {
            TuskError::BuilderMisuse(format!("cannot save `{}` without a primary key", model.name))
        })?;
        let affected = engine.update(model.table, self.fields(), &model.key_filter(&id)?)?;
        self.after_update()?;
        Ok(affected)
    }

    fn delete(&mut self, engine: &dyn Engine) -> Result<u64> {
        let model = Self::descriptor();
        self.before_delete()?;
        let values = match self.id() {
            Some(Value::List(values)) if model.primary_key.len() > 1 => values,
            Some(value) => vec![value],
            None => {
                return Err(TuskError::BuilderMisuse(format!(
                    "cannot delete `{}` without a primary key",
                    model.name
                )));
            }
        };
        let affected = engine.delete(model.table, model.primary_key, &values)?;
        self.after_delete()?;
        Ok(affected)
    }
}

/// Declares a record type backed by a [`Fields`] map.
///
/// Generates `fn field(&self) -> Option<T>` and `fn set_field(&mut self, v)` for
/// every declared field, the [`Record`] and [`Entity`] impls, and dispatch to
/// relation accessor methods (`fn name(&self, engine: &dyn Engine) -> Result<Relation>`)
/// that the caller implements in its own `impl` block.
///
/// ```ignore
/// tusk::record! {
///     pub struct Post {
///         table: "post",
///         primary_key: ["post_id"],
///         fields: { post_id: i64, author_id: i64, title: String },
///         relations: [author],
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            table: $table:literal,
            primary_key: [$($pk:literal),+ $(,)?],
            $(inherits: $parent:ty => ($local:literal, $foreign:literal),)?
            fields: { $($field:ident : $ty:ty),* $(,)? }
            $(, relations: [$($rel:ident),* $(,)?])?
            $(, reference: $reference:ident)?
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            fields: $crate::Fields,
        }

        $crate::paste::paste! {
            #[allow(dead_code)]
            impl $name {
                pub fn new() -> Self {
                    Self::default()
                }

                $(
                    pub fn $field(&self) -> Option<$ty> {
                        self.fields
                            .get(stringify!($field))
                            .and_then(<$ty as $crate::FromValue>::from_value)
                    }

                    pub fn [<set_ $field>](&mut self, value: impl Into<$crate::Value>) -> &mut Self {
                        self.fields.insert(stringify!($field).into(), value.into());
                        self
                    }
                )*
            }
        }

        impl $crate::Entity for $name {
            fn model(&self) -> &'static $crate::ModelInfo {
                <$name as $crate::Record>::descriptor()
            }

            fn fields(&self) -> &$crate::Fields {
                &self.fields
            }

            fn relations(&self) -> &'static [&'static str] {
                &[$($(stringify!($rel)),*)?]
            }

            #[allow(unused_variables)]
            fn resolve(
                &self,
                relation: &str,
                engine: &dyn $crate::Engine,
            ) -> $crate::Result<$crate::Relation> {
                $($(
                    if relation == stringify!($rel) {
                        return self.$rel(engine);
                    }
                )*)?
                Ok($crate::Relation::None)
            }

            $(
                fn reference(&self) -> Option<$crate::serde_json::Value> {
                    self.$reference()
                }
            )?
        }

        impl $crate::Record for $name {
            fn descriptor() -> &'static $crate::ModelInfo {
                static INFO: $crate::ModelInfo = $crate::ModelInfo {
                    name: stringify!($name),
                    table: $table,
                    primary_key: &[$($pk),+],
                    columns: &[$(stringify!($field)),*],
                    parent: $crate::__record_parent!($($parent => ($local, $foreign))?),
                    load: $crate::load_boxed::<$name>,
                };
                &INFO
            }

            fn from_fields(fields: $crate::Fields) -> $crate::Result<Self> {
                Ok(Self { fields })
            }

            fn fields_mut(&mut self) -> &mut $crate::Fields {
                &mut self.fields
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_parent {
    () => {
        None
    };
    ($parent:ty => ($local:literal, $foreign:literal)) => {
        Some($crate::Inheritance {
            model: <$parent as $crate::Record>::descriptor,
            local_key: $local,
            foreign_key: $foreign,
        })
    };
}
