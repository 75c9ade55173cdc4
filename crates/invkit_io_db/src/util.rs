//! Row-shaping helpers shared by the PostgreSQL and snapshot sources.

use std::collections::BTreeMap;

use invkit_report::{EnumUnitKind, SpecConditionCount, SpecCountRow, SpecUnit, SpecUnitKey};

use crate::spec::DbError;

/// Kind referenced by a unit table's parent column.
pub fn derive_parent_kind(kind: EnumUnitKind) -> Option<EnumUnitKind> {
    match kind {
        EnumUnitKind::HeadquartersUnit => Some(EnumUnitKind::HeadquartersUnit),
        EnumUnitKind::Province => None,
        EnumUnitKind::ProvinceSubunit | EnumUnitKind::District => Some(EnumUnitKind::Province),
        EnumUnitKind::SubDistrictPost => Some(EnumUnitKind::District),
    }
}

/// Parent column name of a unit table.
pub fn derive_parent_column(kind: EnumUnitKind) -> Option<&'static str> {
    match kind {
        EnumUnitKind::HeadquartersUnit => Some("parent_id"),
        EnumUnitKind::Province => None,
        EnumUnitKind::ProvinceSubunit | EnumUnitKind::District => Some("polda_id"),
        EnumUnitKind::SubDistrictPost => Some("polres_id"),
    }
}

/// Build a unit from raw table columns. Null names become empty.
pub fn build_unit(
    kind: EnumUnitKind,
    id: i64,
    name: Option<String>,
    level: Option<i64>,
    parent_id: Option<i64>,
) -> SpecUnit {
    let mut unit = SpecUnit::new(kind, id, name.unwrap_or_default());
    unit.level = level;
    if let (Some(n_parent), Some(kind_parent)) = (parent_id, derive_parent_kind(kind)) {
        unit = unit.with_parent(SpecUnitKey::new(kind_parent, n_parent));
    }
    unit
}

/// Sort units the way each table is presented: headquarters by level then
/// name, provinces by id, the rest by name.
pub fn sort_units(kind: EnumUnitKind, l_units: &mut [SpecUnit]) {
    match kind {
        EnumUnitKind::HeadquartersUnit => l_units.sort_by(|a, b| {
            a.level
                .cmp(&b.level)
                .then_with(|| a.name.cmp(&b.name))
                .then(a.key.id.cmp(&b.key.id))
        }),
        EnumUnitKind::Province => l_units.sort_by_key(|u| u.key.id),
        _ => l_units.sort_by(|a, b| a.name.cmp(&b.name).then(a.key.id.cmp(&b.key.id))),
    }
}

/// Convert a stored count; negative values are rejected.
pub fn cast_count(value: i64, context: &str) -> Result<u64, DbError> {
    u64::try_from(value)
        .map_err(|_| DbError::InvalidData(format!("negative count {value} in {context}")))
}

/// Signed per-bucket sums for one `(item, owner)` pair before validation.
pub type DictSignedCounts = BTreeMap<(i64, SpecUnitKey), [i64; 3]>;

/// Validate summed counts and emit sparse rows in key order.
pub fn derive_count_rows(dict_sums: DictSignedCounts) -> Result<Vec<SpecCountRow>, DbError> {
    dict_sums
        .into_iter()
        .map(|((item_type_id, owner), l_counts)| build_count_row(item_type_id, owner, l_counts))
        .collect()
}

fn build_count_row(
    item_type_id: i64,
    owner: SpecUnitKey,
    [n_good, n_light, n_heavy]: [i64; 3],
) -> Result<SpecCountRow, DbError> {
    let c_context = format!("item {item_type_id} owner {owner}");
    Ok(SpecCountRow {
        item_type_id,
        owner,
        counts: SpecConditionCount::new(
            cast_count(n_good, &c_context)?,
            cast_count(n_light, &c_context)?,
            cast_count(n_heavy, &c_context)?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_unit_resolves_parent_kind() {
        let c_name = Some("POLSEK".to_string());
        let unit = build_unit(EnumUnitKind::SubDistrictPost, 4, c_name, None, Some(9));
        assert_eq!(unit.parent, Some(SpecUnitKey::new(EnumUnitKind::District, 9)));

        let unit = build_unit(EnumUnitKind::Province, 1, None, None, Some(3));
        assert_eq!(unit.parent, None);
        assert_eq!(unit.name, "");
    }

    #[test]
    fn sort_units_per_kind() {
        let mut l_units = vec![
            SpecUnit::new(EnumUnitKind::HeadquartersUnit, 1, "B").with_level(2),
            SpecUnit::new(EnumUnitKind::HeadquartersUnit, 2, "Z").with_level(1),
            SpecUnit::new(EnumUnitKind::HeadquartersUnit, 3, "A").with_level(2),
        ];
        sort_units(EnumUnitKind::HeadquartersUnit, &mut l_units);
        let l_ids: Vec<i64> = l_units.iter().map(|u| u.key.id).collect();
        assert_eq!(l_ids, vec![2, 3, 1]);
    }

    #[test]
    fn derive_count_rows_rejects_negative_sums() {
        let key = SpecUnitKey::new(EnumUnitKind::District, 1);
        let mut dict_sums = DictSignedCounts::new();
        dict_sums.insert((1, key), [3, 1, 0]);
        let l_rows = derive_count_rows(dict_sums.clone()).expect("rows");
        assert_eq!(l_rows[0].counts.total(), 4);

        dict_sums.insert((2, key), [1, -1, 0]);
        assert!(matches!(derive_count_rows(dict_sums), Err(DbError::InvalidData(_))));
    }
}
