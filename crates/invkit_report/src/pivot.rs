//! Sparse count rows to dense `[group][item][unit]` grid.

use std::collections::{HashMap, HashSet};

use crate::spec::{
    SpecConditionCount, SpecCountRow, SpecGridGroup, SpecGridRow, SpecGridUnit, SpecItemType,
    SpecReportGrid, SpecUnit, SpecUnitKey,
};

/// Order item types for display: group, explicit order, then id.
///
/// Deleted entries are dropped.
pub fn derive_item_order(item_types: &[SpecItemType]) -> Vec<&SpecItemType> {
    let mut l_items: Vec<&SpecItemType> = item_types.iter().filter(|t| !t.if_deleted).collect();
    l_items.sort_by_key(|t| (t.group_id, t.order, t.id));
    l_items
}

/// Pivot sparse rows into a dense grid.
///
/// Columns follow `units` exactly. Rows referencing an item type or unit outside
/// the grid are ignored; duplicate `(item, unit)` rows are summed.
pub fn build_report_grid(
    item_types: &[SpecItemType],
    units: &[&SpecUnit],
    rows: &[SpecCountRow],
) -> SpecReportGrid {
    let set_unit_keys: HashSet<SpecUnitKey> = units.iter().map(|u| u.key).collect();

    let mut dict_counts: HashMap<(i64, SpecUnitKey), SpecConditionCount> =
        HashMap::with_capacity(rows.len());
    for row in rows {
        if !set_unit_keys.contains(&row.owner) {
            continue;
        }
        dict_counts
            .entry((row.item_type_id, row.owner))
            .or_default()
            .absorb(&row.counts);
    }

    let l_grid_units: Vec<SpecGridUnit> = units
        .iter()
        .map(|u| SpecGridUnit {
            key: u.key,
            name: u.name.clone(),
        })
        .collect();

    let mut l_groups: Vec<SpecGridGroup> = Vec::new();
    for item in derive_item_order(item_types) {
        let l_cells = l_grid_units
            .iter()
            .map(|u| {
                dict_counts
                    .get(&(item.id, u.key))
                    .copied()
                    .unwrap_or(SpecConditionCount::ZERO)
            })
            .collect();
        let row = SpecGridRow {
            item_type_id: item.id,
            item_name: item.name.clone(),
            cells: l_cells,
        };

        match l_groups.last_mut() {
            Some(group) if group.group_id == item.group_id => group.rows.push(row),
            _ => l_groups.push(SpecGridGroup {
                group_id: item.group_id,
                group_name: item.group_name.clone(),
                rows: vec![row],
            }),
        }
    }

    SpecReportGrid {
        units: l_grid_units,
        groups: l_groups,
    }
}
