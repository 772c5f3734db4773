//! Entity identity allocation.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{Result, TableError};
use crate::table::Table;

/// One registered entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    pub id: i64,
    pub name: String,
    pub code: String,
    /// Aggregates such as continents; never observed directly.
    pub synthetic: bool,
}

/// Hands out entity ids from one monotonic id space.
///
/// Real entities are registered first, keyed by name (first seen wins).
/// The first call to [`allocate_synthetic`](Self::allocate_synthetic) seals
/// the registry: from then on only synthetic entities can be added, so
/// synthetic ids always sort after every real id. Synthetic ids depend on
/// what was registered before them and are not stable across runs.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: Vec<EntityInfo>,
    by_name: HashMap<String, usize>,
    next_id: i64,
    sealed: bool,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from the identity columns of `table`.
    ///
    /// Integral `entityId` cells are kept; entities without one get the
    /// next free id.
    pub fn from_table(table: &Table) -> Self {
        let mut registry = Self::new();
        let mut pending = Vec::new();
        let mut pending_names = HashSet::new();
        for row in table.iter_rows() {
            let name = row.entity_name();
            if registry.by_name.contains_key(name) || pending_names.contains(name) {
                continue;
            }
            let code = row.entity_code().unwrap_or_default().to_string();
            match row.entity_id() {
                Some(id) => registry.insert(id, name.to_string(), code, false),
                None => {
                    pending_names.insert(name);
                    pending.push((name.to_string(), code));
                }
            }
        }
        for (name, code) in pending {
            let id = registry.next_id;
            registry.insert(id, name, code, false);
        }
        debug!(entities = registry.len(), "rebuilt entity registry");
        registry
    }

    /// Id for a real entity, allocating one on first sight.
    pub fn register(&mut self, name: &str, code: &str) -> Result<i64> {
        if let Some(info) = self.get(name) {
            return Ok(info.id);
        }
        if self.sealed {
            return Err(TableError::RegistrySealed {
                entity: name.to_string(),
            });
        }
        let id = self.next_id;
        self.insert(id, name.to_string(), code.to_string(), false);
        Ok(id)
    }

    /// Register a real entity whose id comes from the input data.
    ///
    /// An already known name keeps its first id.
    pub fn register_with_id(&mut self, id: i64, name: &str, code: &str) -> Result<i64> {
        if let Some(info) = self.get(name) {
            return Ok(info.id);
        }
        if self.sealed {
            return Err(TableError::RegistrySealed {
                entity: name.to_string(),
            });
        }
        self.insert(id, name.to_string(), code.to_string(), false);
        Ok(id)
    }

    /// Id for a synthetic entity. Seals the registry.
    pub fn allocate_synthetic(&mut self, name: &str, code: &str) -> Result<i64> {
        if self.by_name.contains_key(name) {
            return Err(TableError::DuplicateEntity {
                entity: name.to_string(),
            });
        }
        self.sealed = true;
        let id = self.next_id;
        self.insert(id, name.to_string(), code.to_string(), true);
        Ok(id)
    }

    fn insert(&mut self, id: i64, name: String, code: String, synthetic: bool) {
        self.next_id = self.next_id.max(id.saturating_add(1));
        self.by_name.insert(name.clone(), self.entities.len());
        self.entities.push(EntityInfo {
            id,
            name,
            code,
            synthetic,
        });
    }

    pub fn get(&self, name: &str) -> Option<&EntityInfo> {
        self.by_name.get(name).map(|&index| &self.entities[index])
    }

    pub fn id_of(&self, name: &str) -> Option<i64> {
        self.get(name).map(|info| info.id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Entities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityInfo> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;

    #[test]
    fn first_seen_wins() {
        let mut registry = EntityRegistry::new();
        assert_eq!(registry.register("France", "FRA").unwrap(), 0);
        assert_eq!(registry.register("Chad", "TCD").unwrap(), 1);
        assert_eq!(registry.register("France", "XXX").unwrap(), 0);
        assert_eq!(registry.get("France").unwrap().code, "FRA");
    }

    #[test]
    fn explicit_ids_advance_the_counter() {
        let mut registry = EntityRegistry::new();
        registry.register_with_id(13, "Iceland", "ISL").unwrap();
        assert_eq!(registry.register("Peru", "PER").unwrap(), 14);
    }

    #[test]
    fn synthetic_allocation_seals() {
        let mut registry = EntityRegistry::new();
        registry.register("France", "FRA").unwrap();
        let europe = registry.allocate_synthetic("Europe", "Europe").unwrap();
        assert_eq!(europe, 1);
        assert!(registry.is_sealed());
        assert!(registry.get("Europe").unwrap().synthetic);

        // known names still resolve
        assert_eq!(registry.register("France", "FRA").unwrap(), 0);
        assert_eq!(
            registry.register("Spain", "ESP"),
            Err(TableError::RegistrySealed {
                entity: "Spain".to_string()
            })
        );
        assert_eq!(
            registry.allocate_synthetic("France", "France"),
            Err(TableError::DuplicateEntity {
                entity: "France".to_string()
            })
        );
    }

    #[test]
    fn rebuilds_from_table() {
        let table = Table::new(vec![
            Row::new()
                .with("entityName", "France")
                .with("entityId", 7)
                .with("entityCode", "FRA")
                .with("year", 2000),
            Row::new()
                .with("entityName", "Atlantis")
                .with("year", 2000),
            Row::new()
                .with("entityName", "France")
                .with("entityId", 7)
                .with("entityCode", "FRA")
                .with("year", 2001),
        ])
        .unwrap();
        let registry = EntityRegistry::from_table(&table);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.id_of("France"), Some(7));
        assert_eq!(registry.id_of("Atlantis"), Some(8));
    }

    #[test]
    fn rebuild_numbers_id_less_entities_in_row_order() {
        let rows = (0..500)
            .flat_map(|entity| {
                [2000, 2001].map(|year| {
                    Row::new()
                        .with("entityName", format!("Place {entity}"))
                        .with("year", year)
                })
            })
            .collect();
        let registry = EntityRegistry::from_table(&Table::new(rows).unwrap());
        assert_eq!(registry.len(), 500);
        assert_eq!(registry.id_of("Place 0"), Some(0));
        assert_eq!(registry.id_of("Place 499"), Some(499));
    }
}
