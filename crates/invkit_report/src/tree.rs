//! Organizational forest index and traversal.
//!
//! The flat unit tables are indexed once into a [`UnitForest`]; every walk
//! afterwards is a map lookup. Walks carry a visited set, so a corrupt parent
//! reference loop surfaces as [`ReportError::HierarchyCycle`] instead of
//! recursing forever.

use std::collections::{HashMap, HashSet};

use crate::spec::{EnumUnitKind, ReportError, SpecAncestorChain, SpecUnit, SpecUnitKey};

/// Adjacency index over one or more unit tables.
#[derive(Debug, Clone, Default)]
pub struct UnitForest {
    l_units: Vec<SpecUnit>,
    dict_idx_by_key: HashMap<SpecUnitKey, usize>,
    /// Children per parent key, sorted by name then id.
    dict_children: HashMap<SpecUnitKey, Vec<usize>>,
}

impl UnitForest {
    /// Index `units`, keeping their order as the load order.
    ///
    /// A later duplicate key replaces the earlier entry in lookups.
    pub fn from_units(units: Vec<SpecUnit>) -> Self {
        let mut dict_idx_by_key = HashMap::with_capacity(units.len());
        for (n_idx, unit) in units.iter().enumerate() {
            dict_idx_by_key.insert(unit.key, n_idx);
        }

        let mut dict_children: HashMap<SpecUnitKey, Vec<usize>> = HashMap::new();
        for (n_idx, unit) in units.iter().enumerate() {
            if dict_idx_by_key.get(&unit.key) != Some(&n_idx) {
                continue;
            }
            if let Some(key_parent) = unit.parent {
                dict_children.entry(key_parent).or_default().push(n_idx);
            }
        }
        for l_idx_children in dict_children.values_mut() {
            l_idx_children.sort_by(|a, b| {
                units[*a]
                    .name
                    .cmp(&units[*b].name)
                    .then(units[*a].key.id.cmp(&units[*b].key.id))
            });
        }

        Self {
            l_units: units,
            dict_idx_by_key,
            dict_children,
        }
    }

    pub fn len(&self) -> usize {
        self.dict_idx_by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict_idx_by_key.is_empty()
    }

    pub fn get(&self, key: &SpecUnitKey) -> Option<&SpecUnit> {
        self.dict_idx_by_key.get(key).map(|n_idx| &self.l_units[*n_idx])
    }

    /// Units of one kind in load order.
    pub fn units_of_kind(&self, kind: EnumUnitKind) -> Vec<&SpecUnit> {
        self.l_units
            .iter()
            .enumerate()
            .filter(|(n_idx, unit)| {
                unit.key.kind == kind && self.dict_idx_by_key.get(&unit.key) == Some(n_idx)
            })
            .map(|(_, unit)| unit)
            .collect()
    }

    /// Units of one kind whose parent is absent or unresolved, in load order.
    pub fn roots_of_kind(&self, kind: EnumUnitKind) -> Vec<&SpecUnit> {
        self.units_of_kind(kind)
            .into_iter()
            .filter(|unit| unit.parent.is_none_or(|key_parent| self.get(&key_parent).is_none()))
            .collect()
    }

    /// Immediate children (any kind), sorted by name.
    pub fn children(&self, key: &SpecUnitKey) -> Vec<&SpecUnit> {
        self.dict_children
            .get(key)
            .map(|l_idx| l_idx.iter().map(|n_idx| &self.l_units[*n_idx]).collect())
            .unwrap_or_default()
    }

    /// Immediate children of one kind, sorted by name.
    pub fn children_of_kind(&self, key: &SpecUnitKey, kind: EnumUnitKind) -> Vec<&SpecUnit> {
        self.children(key)
            .into_iter()
            .filter(|unit| unit.key.kind == kind)
            .collect()
    }
}

/// Names from the root down to `key`.
///
/// A parent reference missing from the forest stops the walk; the partial chain
/// comes back with `key_missing` set. `key` itself must exist.
pub fn derive_ancestor_chain(
    key: &SpecUnitKey,
    forest: &UnitForest,
) -> Result<SpecAncestorChain, ReportError> {
    let mut l_names = Vec::new();
    let mut l_keys_visited: Vec<SpecUnitKey> = Vec::new();
    let mut set_visited = HashSet::new();
    let mut key_missing = None;

    let mut key_current = Some(*key);
    while let Some(key_cursor) = key_current {
        if !set_visited.insert(key_cursor) {
            return Err(derive_cycle_error(key_cursor, &l_keys_visited));
        }
        let Some(unit) = forest.get(&key_cursor) else {
            if l_keys_visited.is_empty() {
                return Err(ReportError::UnknownUnit(key_cursor));
            }
            key_missing = Some(key_cursor);
            break;
        };
        l_names.push(unit.name.clone());
        l_keys_visited.push(key_cursor);
        key_current = unit.parent;
    }

    l_names.reverse();
    Ok(SpecAncestorChain {
        names: l_names,
        key_missing,
    })
}

/// All units below `key`, depth-first pre-order, siblings sorted by name.
pub fn derive_descendants<'a>(
    key: &SpecUnitKey,
    forest: &'a UnitForest,
) -> Result<Vec<&'a SpecUnit>, ReportError> {
    if forest.get(key).is_none() {
        return Err(ReportError::UnknownUnit(*key));
    }

    let mut l_out = Vec::new();
    let mut l_path = vec![*key];
    let mut set_visited = HashSet::from([*key]);
    walk_descendants(key, forest, &mut l_path, &mut set_visited, &mut l_out)?;
    Ok(l_out)
}

fn walk_descendants<'a>(
    key: &SpecUnitKey,
    forest: &'a UnitForest,
    l_path: &mut Vec<SpecUnitKey>,
    set_visited: &mut HashSet<SpecUnitKey>,
    l_out: &mut Vec<&'a SpecUnit>,
) -> Result<(), ReportError> {
    for child in forest.children(key) {
        if !set_visited.insert(child.key) {
            return Err(derive_cycle_error(child.key, l_path));
        }
        l_out.push(child);
        l_path.push(child.key);
        walk_descendants(&child.key, forest, l_path, set_visited, l_out)?;
        l_path.pop();
    }
    Ok(())
}

fn derive_cycle_error(key: SpecUnitKey, l_path: &[SpecUnitKey]) -> ReportError {
    let c_path = l_path
        .iter()
        .map(ToString::to_string)
        .chain(std::iter::once(key.to_string()))
        .collect::<Vec<_>>()
        .join(" -> ");
    ReportError::HierarchyCycle { key, path: c_path }
}
