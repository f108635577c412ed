//! Relation hydration.
//!
//! A [`HydrationPass`] expands a record's declared relations into nested JSON.
//! Depth and the relation memo live in the pass itself, so two passes never
//! observe each other's state. Recursion stops at `max_depth`: a record at the
//! last level is emitted with its scalar fields only and none of its relation
//! accessors are invoked.

use hashbrown::HashMap;
use serde_json::{Map, Value as Json};
use smallvec::SmallVec;

use crate::collection::ResultSet;
use crate::config::HydrationConfig;
use crate::engine::Engine;
use crate::error::Result;
use crate::record::{Entity, Relation};

/// (record type, relation name, record id)
type MemoKey = (&'static str, &'static str, String);

/// State of one top-level hydration call.
pub struct HydrationPass<'e> {
    engine: &'e dyn Engine,
    max_depth: usize,
    depth: usize,
    memo: HashMap<MemoKey, Json>,
    with: SmallVec<[&'static str; 4]>,
    without: SmallVec<[&'static str; 4]>,
}

impl<'e> HydrationPass<'e> {
    pub fn new(engine: &'e dyn Engine, max_depth: usize) -> Self {
        Self {
            engine,
            max_depth,
            depth: 0,
            memo: HashMap::new(),
            with: SmallVec::new(),
            without: SmallVec::new(),
        }
    }

    /// Also expands `relation` on every record of this pass; a name that is
    /// already a stored field keeps the field value.
    pub fn with(mut self, relation: &'static str) -> Self {
        self.with.push(relation);
        self
    }

    /// Skips `relation` on every record of this pass.
    pub fn without(mut self, relation: &'static str) -> Self {
        self.without.push(relation);
        self
    }

    pub fn with_config(engine: &'e dyn Engine, config: &HydrationConfig) -> Self {
        Self::new(engine, config.max_depth)
    }

    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Serializes `record` with its relations expanded down to the depth limit.
    pub fn serialize(&mut self, record: &dyn Entity) -> Result<Json> {
        let model = record.model();
        let mut object: Map<String, Json> = record
            .fields()
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect();

        if self.depth + 1 >= self.max_depth {
            crate::tusk_trace_hydrate!("leaf", model.name, self.depth);
            return Ok(Json::Object(object));
        }

        let id = record.id().map(|id| id.key());
        let declared = record.relations();
        let fields = record.fields();
        let extra = self
            .with
            .iter()
            .filter(|name| !declared.contains(*name) && !fields.contains_key(**name));
        let relations: SmallVec<[&'static str; 8]> = declared
            .iter()
            .chain(extra)
            .copied()
            .filter(|name| !self.without.contains(name))
            .collect();

        for relation in relations {
            let key = id.as_ref().map(|id| (model.name, relation, id.clone()));
            if let Some(hit) = key.as_ref().and_then(|key| self.memo.get(key)) {
                crate::tusk_trace_hydrate!("memo_hit", model.name, relation);
                object.insert(relation.to_string(), hit.clone());
                continue;
            }

            let resolved = record.resolve(relation, self.engine)?;
            self.depth += 1;
            let normalized = self.normalize(resolved);
            self.depth -= 1;
            let normalized = normalized?;

            if let Some(key) = key {
                self.memo.insert(key, normalized.clone());
            }
            object.insert(relation.to_string(), normalized);
        }
        Ok(Json::Object(object))
    }

    /// Serializes every record of a set within this pass, sharing its memo.
    pub fn serialize_all<E: Entity>(&mut self, records: &ResultSet<E>) -> Result<Json> {
        records
            .iter()
            .map(|record| self.serialize(record))
            .collect::<Result<Vec<_>>>()
            .map(Json::Array)
    }

    fn normalize(&mut self, relation: Relation) -> Result<Json> {
        match relation {
            Relation::None => Ok(Json::Null),
            Relation::Scalar(value) => Ok(value.to_json()),
            Relation::One(record) => self.normalize_record(&*record),
            Relation::Many(records) => records
                .iter()
                .map(|record| self.normalize_record(&**record))
                .collect::<Result<Vec<_>>>()
                .map(Json::Array),
            Relation::List(items) => items
                .into_iter()
                .map(|item| self.normalize(item))
                .collect::<Result<Vec<_>>>()
                .map(Json::Array),
            Relation::Deferred(compiler) => {
                let records = compiler.get_dynamic(self.engine)?;
                records
                    .iter()
                    .map(|record| self.normalize_record(&**record))
                    .collect::<Result<Vec<_>>>()
                    .map(Json::Array)
            }
        }
    }

    fn normalize_record(&mut self, record: &dyn Entity) -> Result<Json> {
        match record.reference() {
            Some(reference) => Ok(reference),
            None => self.serialize(record),
        }
    }
}

/// Hydrates one record in a fresh pass.
pub fn hydrate(record: &dyn Entity, engine: &dyn Engine, config: &HydrationConfig) -> Result<Json> {
    HydrationPass::with_config(engine, config).serialize(record)
}

/// Hydrates a whole result set in one pass, so siblings share resolved relations.
pub fn hydrate_all<E: Entity>(
    records: &ResultSet<E>,
    engine: &dyn Engine,
    config: &HydrationConfig,
) -> Result<Json> {
    HydrationPass::with_config(engine, config).serialize_all(records)
}
