//! Offline inventory source reading Arrow IPC table dumps.
//!
//! Each table lives in `<dir>/<table>.ipc` with the same column names as the
//! database. Tables are read once at open; queries run in memory with the same
//! semantics as the PostgreSQL source.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use invkit_report::{
    EnumUnitKind, InventorySource, ReportError, SpecCountRow, SpecCountScope, SpecItemType,
    SpecUnit, SpecUnitKey,
};
use polars::prelude::{Column, DataFrame, DataType, IpcReader, SerReader};
use tracing::{debug, info};

use crate::conf::{
    C_EXT_SNAPSHOT, C_TABLE_EQUIPMENT_INVENTORIES, C_TABLE_EQUIPMENT_TYPES, C_TABLE_EQUIPMENTS,
};
use crate::spec::DbError;
use crate::util::{
    DictSignedCounts, build_unit, derive_count_rows, derive_parent_column, sort_units,
};

#[derive(Debug, Clone)]
struct SpecInventoryRecord {
    equipment_id: i64,
    owner: SpecUnitKey,
    counts: [i64; 3],
}

/// Inventory source over an in-memory snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotInventorySource {
    path_dir: PathBuf,
    dict_units: BTreeMap<EnumUnitKind, Vec<SpecUnit>>,
    l_item_types: Vec<SpecItemType>,
    l_records: Vec<SpecInventoryRecord>,
}

impl SnapshotInventorySource {
    /// Read every table under `path_dir`.
    ///
    /// Unit tables may be absent (treated as empty); the item catalog tables are
    /// required. The inventory table may be absent (no counts).
    pub fn open(path_dir: impl Into<PathBuf>) -> Result<Self, DbError> {
        let path_dir = path_dir.into();

        let mut dict_units = BTreeMap::new();
        for kind in EnumUnitKind::ALL {
            let l_units = match read_table(&path_dir, kind.table_name())? {
                Some(df) => derive_units(kind, &df)?,
                None => Vec::new(),
            };
            debug!("{}: {} rows", kind.table_name(), l_units.len());
            dict_units.insert(kind, l_units);
        }

        let df_equipments = read_table(&path_dir, C_TABLE_EQUIPMENTS)?
            .ok_or_else(|| DbError::MissingTable(C_TABLE_EQUIPMENTS.to_string()))?;
        let df_types = read_table(&path_dir, C_TABLE_EQUIPMENT_TYPES)?
            .ok_or_else(|| DbError::MissingTable(C_TABLE_EQUIPMENT_TYPES.to_string()))?;
        let l_item_types = derive_item_types(&df_equipments, &df_types)?;

        let l_records = match read_table(&path_dir, C_TABLE_EQUIPMENT_INVENTORIES)? {
            Some(df) => derive_inventory_records(&df)?,
            None => Vec::new(),
        };

        info!(
            "snapshot `{}`: {} item types, {} inventory records",
            path_dir.display(),
            l_item_types.len(),
            l_records.len()
        );
        Ok(Self {
            path_dir,
            dict_units,
            l_item_types,
            l_records,
        })
    }

    pub fn path_dir(&self) -> &Path {
        &self.path_dir
    }

    fn fetch_counts_scope(&self, scope: &SpecCountScope) -> Result<Vec<SpecCountRow>, DbError> {
        let set_owner_ids: HashSet<i64> = scope.owner_ids.iter().copied().collect();
        let set_items_live: HashSet<i64> = self.l_item_types.iter().map(|t| t.id).collect();

        let mut dict_sums = DictSignedCounts::new();
        for record in &self.l_records {
            if record.owner.kind != scope.owner_kind
                || !set_owner_ids.contains(&record.owner.id)
                || !set_items_live.contains(&record.equipment_id)
            {
                continue;
            }
            let l_sums = dict_sums
                .entry((record.equipment_id, record.owner))
                .or_insert([0; 3]);
            for (n_sum, n_value) in l_sums.iter_mut().zip(record.counts) {
                *n_sum = n_sum.saturating_add(n_value);
            }
        }
        derive_count_rows(dict_sums)
    }
}

impl InventorySource for SnapshotInventorySource {
    fn load_units(&self, kind: EnumUnitKind) -> Result<Vec<SpecUnit>, ReportError> {
        Ok(self.dict_units.get(&kind).cloned().unwrap_or_default())
    }

    fn load_item_types(&self) -> Result<Vec<SpecItemType>, ReportError> {
        Ok(self.l_item_types.clone())
    }

    fn fetch_counts(&self, scope: &SpecCountScope) -> Result<Vec<SpecCountRow>, ReportError> {
        Ok(self.fetch_counts_scope(scope)?)
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region TableDecoding

fn read_table(path_dir: &Path, table: &str) -> Result<Option<DataFrame>, DbError> {
    let path_file = path_dir.join(format!("{table}.{C_EXT_SNAPSHOT}"));
    if !path_file.exists() {
        return Ok(None);
    }
    let to_error = |message: String| DbError::Snapshot {
        table: table.to_string(),
        message,
    };
    let file = File::open(&path_file).map_err(|e| to_error(e.to_string()))?;
    IpcReader::new(file)
        .finish()
        .map(Some)
        .map_err(|e| to_error(format!("failed to read IPC: {e}")))
}

fn derive_column<'a>(df: &'a DataFrame, table: &str, name: &str) -> Result<&'a Column, DbError> {
    df.column(name).map_err(|_| DbError::Snapshot {
        table: table.to_string(),
        message: format!("missing column `{name}`"),
    })
}

fn derive_i64_values(df: &DataFrame, table: &str, name: &str) -> Result<Vec<Option<i64>>, DbError> {
    let to_error = |message: String| DbError::Snapshot {
        table: table.to_string(),
        message: format!("column `{name}`: {message}"),
    };
    let col = derive_column(df, table, name)?
        .cast(&DataType::Int64)
        .map_err(|e| to_error(e.to_string()))?;
    let values = col.i64().map_err(|e| to_error(e.to_string()))?;
    Ok(values.into_iter().collect())
}

fn derive_str_values(
    df: &DataFrame,
    table: &str,
    name: &str,
) -> Result<Vec<Option<String>>, DbError> {
    let to_error = |message: String| DbError::Snapshot {
        table: table.to_string(),
        message: format!("column `{name}`: {message}"),
    };
    let col = derive_column(df, table, name)?
        .cast(&DataType::String)
        .map_err(|e| to_error(e.to_string()))?;
    let values = col.str().map_err(|e| to_error(e.to_string()))?;
    Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
}

fn derive_required_ids(
    l_values: Vec<Option<i64>>,
    table: &str,
    name: &str,
) -> Result<Vec<i64>, DbError> {
    l_values
        .into_iter()
        .enumerate()
        .map(|(n_idx, v)| {
            v.ok_or_else(|| DbError::Snapshot {
                table: table.to_string(),
                message: format!("null `{name}` at row {n_idx}"),
            })
        })
        .collect()
}

fn derive_units(kind: EnumUnitKind, df: &DataFrame) -> Result<Vec<SpecUnit>, DbError> {
    let table = kind.table_name();
    let l_ids = derive_required_ids(derive_i64_values(df, table, "id")?, table, "id")?;
    let l_names = derive_str_values(df, table, "name")?;
    let l_parents = match derive_parent_column(kind) {
        Some(c_col) => derive_i64_values(df, table, c_col)?,
        None => vec![None; df.height()],
    };
    let l_levels = match kind {
        EnumUnitKind::HeadquartersUnit => derive_i64_values(df, table, "level")?,
        _ => vec![None; df.height()],
    };

    let mut l_units: Vec<SpecUnit> = l_ids
        .into_iter()
        .zip(l_names)
        .zip(l_parents.into_iter().zip(l_levels))
        .map(|((n_id, name), (parent_id, level))| build_unit(kind, n_id, name, level, parent_id))
        .collect();
    sort_units(kind, &mut l_units);
    Ok(l_units)
}

fn derive_item_types(
    df_equipments: &DataFrame,
    df_types: &DataFrame,
) -> Result<Vec<SpecItemType>, DbError> {
    let l_type_ids = derive_required_ids(
        derive_i64_values(df_types, C_TABLE_EQUIPMENT_TYPES, "id")?,
        C_TABLE_EQUIPMENT_TYPES,
        "id",
    )?;
    let l_type_names = derive_str_values(df_types, C_TABLE_EQUIPMENT_TYPES, "name")?;
    let dict_type_names: BTreeMap<i64, String> = l_type_ids
        .into_iter()
        .zip(l_type_names)
        .map(|(n_id, name)| (n_id, name.unwrap_or_default()))
        .collect();

    let table = C_TABLE_EQUIPMENTS;
    let l_ids = derive_required_ids(derive_i64_values(df_equipments, table, "id")?, table, "id")?;
    let l_names = derive_str_values(df_equipments, table, "name")?;
    let l_orders = derive_i64_values(df_equipments, table, "order")?;
    let l_group_ids = derive_i64_values(df_equipments, table, "id_equipment_type")?;
    let l_deleted: Vec<bool> = match df_equipments.column("deleted_at") {
        Ok(col) => col.is_null().into_iter().map(|v| !v.unwrap_or(true)).collect(),
        Err(_) => vec![false; df_equipments.height()],
    };

    let mut l_items = Vec::new();
    for (n_idx, n_id) in l_ids.into_iter().enumerate() {
        // Inner join on the type table, as the catalog query does.
        let Some(n_group_id) = l_group_ids[n_idx] else {
            continue;
        };
        let Some(c_group_name) = dict_type_names.get(&n_group_id) else {
            continue;
        };
        if l_deleted[n_idx] {
            continue;
        }
        l_items.push(SpecItemType {
            id: n_id,
            name: l_names[n_idx].clone().unwrap_or_default(),
            order: l_orders[n_idx].unwrap_or(0),
            group_id: n_group_id,
            group_name: c_group_name.clone(),
            if_deleted: false,
        });
    }
    l_items.sort_by_key(|t| (t.group_id, t.order, t.id));
    Ok(l_items)
}

fn derive_inventory_records(df: &DataFrame) -> Result<Vec<SpecInventoryRecord>, DbError> {
    let table = C_TABLE_EQUIPMENT_INVENTORIES;
    let l_items = derive_required_ids(
        derive_i64_values(df, table, "equipment_id")?,
        table,
        "equipment_id",
    )?;
    let l_owner_types = derive_str_values(df, table, "owner_type")?;
    let l_owner_ids = derive_i64_values(df, table, "owner_id")?;
    let l_good = derive_i64_values(df, table, "baik")?;
    let l_light = derive_i64_values(df, table, "rusak_ringan")?;
    let l_heavy = derive_i64_values(df, table, "rusak_berat")?;

    let mut l_records = Vec::with_capacity(l_items.len());
    for (n_idx, n_item) in l_items.into_iter().enumerate() {
        // Unknown owner tags and null owners never match a scope.
        let Some(kind) = l_owner_types[n_idx]
            .as_deref()
            .and_then(EnumUnitKind::from_owner_tag)
        else {
            continue;
        };
        let Some(n_owner) = l_owner_ids[n_idx] else {
            continue;
        };
        l_records.push(SpecInventoryRecord {
            equipment_id: n_item,
            owner: SpecUnitKey::new(kind, n_owner),
            counts: [
                l_good[n_idx].unwrap_or(0),
                l_light[n_idx].unwrap_or(0),
                l_heavy[n_idx].unwrap_or(0),
            ],
        });
    }
    Ok(l_records)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
