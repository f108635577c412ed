//! Homogeneous record collections.

use std::ops::Index;

use indexmap::IndexMap;

use crate::engine::Engine;
use crate::error::{Result, TuskError};
use crate::record::{Entity, ModelInfo, Record};

/// Records of one type plus the row count the query would return without LIMIT.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet<E> {
    items: Vec<E>,
    total: u64,
    model: Option<&'static str>,
}

impl<E> Default for ResultSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ResultSet<E> {
    /// An empty set that adopts the type of its first record.
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            model: None,
        }
    }

    /// An empty set that only accepts records of `model`.
    pub const fn for_model(model: &ModelInfo) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            model: Some(model.name),
        }
    }

    pub const fn with_total(mut self, total: u64) -> Self {
        self.total = total;
        self
    }

    /// Row count reported by the engine, independent of LIMIT.
    pub const fn total_records(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&E> {
        self.items.first()
    }

    pub fn into_first(self) -> Option<E> {
        self.items.into_iter().next()
    }

    pub fn get(&self, index: usize) -> Option<&E> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<E> {
        self.items
    }
}

impl<E: Entity> ResultSet<E> {
    /// Builds a set from records, which must all share one type.
    pub fn from_records(records: impl IntoIterator<Item = E>) -> Result<Self> {
        let mut set = Self::new();
        for record in records {
            set.add(record)?;
        }
        set.total = set.items.len() as u64;
        Ok(set)
    }

    /// Appends a record; a record of another type is rejected.
    pub fn add(&mut self, record: E) -> Result<()> {
        let name = record.model().name;
        match self.model {
            Some(expected) if expected != name => {
                return Err(TuskError::BuilderMisuse(format!(
                    "cannot add `{name}` to a collection of `{expected}`"
                )));
            }
            Some(_) => {}
            None => self.model = Some(name),
        }
        self.items.push(record);
        Ok(())
    }

    /// Keys records by `field`, or by primary key when `field` is `None`.
    ///
    /// Records missing the key are skipped; on duplicate keys the last record wins.
    pub fn to_object(&self, field: Option<&str>) -> IndexMap<String, &E> {
        let mut keyed = IndexMap::with_capacity(self.items.len());
        for record in &self.items {
            let key = match field {
                Some(field) => record.get(field).filter(|v| !v.is_null()).map(|v| v.key()),
                None => record.id().map(|v| v.key()),
            };
            if let Some(key) = key {
                keyed.insert(key, record);
            }
        }
        keyed
    }
}

impl<R: Record> ResultSet<R> {
    /// Saves every record, returning the affected count of each.
    pub fn save_all(&mut self, engine: &dyn Engine) -> Result<Vec<u64>> {
        self.items.iter_mut().map(|record| record.save(engine)).collect()
    }

    /// Deletes every record; stops at the first failure.
    pub fn delete_all(&mut self, engine: &dyn Engine) -> Result<u64> {
        let mut affected = 0;
        for record in &mut self.items {
            affected += record.delete(engine)?;
        }
        Ok(affected)
    }
}

impl<E> Index<usize> for ResultSet<E> {
    type Output = E;

    fn index(&self, index: usize) -> &E {
        &self.items[index]
    }
}

impl<E> IntoIterator for ResultSet<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a ResultSet<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
