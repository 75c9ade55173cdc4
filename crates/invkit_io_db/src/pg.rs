//! PostgreSQL inventory source.
//!
//! The report pipeline is synchronous; this adapter owns a tokio runtime and
//! blocks on each query. The pool is shared across scope workers.

use std::time::Duration;

use invkit_report::{
    EnumUnitKind, InventorySource, ReportError, SpecCountRow, SpecCountScope, SpecItemType,
    SpecUnit, SpecUnitKey,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::conf::{N_POOL_ACQUIRE_TIMEOUT_SECS, N_POOL_CONNECTIONS_MAX};
use crate::spec::{DbError, SpecDbConnection};
use crate::util::{DictSignedCounts, build_unit, derive_count_rows, derive_parent_column};

const C_SQL_ITEM_TYPES: &str = r#"
    SELECT e.id::bigint AS id,
           e.name AS name,
           COALESCE(e."order", 0)::bigint AS item_order,
           et.id::bigint AS group_id,
           et.name AS group_name
    FROM equipments e
    JOIN equipment_types et ON et.id = e.id_equipment_type
    WHERE e.deleted_at IS NULL
    ORDER BY et.id, e."order", e.id
"#;

const C_SQL_COUNTS: &str = r#"
    SELECT ei.equipment_id::bigint AS equipment_id,
           ei.owner_id::bigint AS owner_id,
           COALESCE(SUM(ei.baik), 0)::bigint AS baik,
           COALESCE(SUM(ei.rusak_ringan), 0)::bigint AS rusak_ringan,
           COALESCE(SUM(ei.rusak_berat), 0)::bigint AS rusak_berat
    FROM equipment_inventories ei
    JOIN equipments e ON e.id = ei.equipment_id
    WHERE ei.owner_type = $1
      AND ei.owner_id = ANY($2)
      AND e.deleted_at IS NULL
    GROUP BY ei.equipment_id, ei.owner_id
"#;

/// Unit table query, ordered the way reports present the units.
fn derive_units_sql(kind: EnumUnitKind) -> String {
    let c_table = kind.table_name();
    let c_parent = derive_parent_column(kind)
        .map(|c_col| format!("{c_col}::bigint"))
        .unwrap_or_else(|| "NULL::bigint".to_string());
    let (c_level, c_order) = match kind {
        EnumUnitKind::HeadquartersUnit => ("level::bigint", "level, name, id"),
        EnumUnitKind::Province => ("NULL::bigint", "id"),
        _ => ("NULL::bigint", "name, id"),
    };
    format!(
        "SELECT id::bigint AS id, name, {c_level} AS level, {c_parent} AS parent_id \
         FROM {c_table} ORDER BY {c_order}"
    )
}

/// Inventory source backed by a PostgreSQL pool.
pub struct PgInventorySource {
    runtime: Runtime,
    pool: PgPool,
}

impl PgInventorySource {
    /// Start a runtime and open the pool; fails fast when the server is unreachable.
    pub fn connect(connection: &SpecDbConnection) -> Result<Self, DbError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let pool = runtime
            .block_on(
                PgPoolOptions::new()
                    .max_connections(N_POOL_CONNECTIONS_MAX)
                    .acquire_timeout(Duration::from_secs(N_POOL_ACQUIRE_TIMEOUT_SECS))
                    .connect_with(connection.to_connect_options()),
            )
            .map_err(|source| DbError::Connect {
                host: connection.host.clone(),
                port: connection.port,
                database: connection.database.clone(),
                source,
            })?;
        info!(
            "connected to {}:{}/{}",
            connection.host, connection.port, connection.database
        );
        Ok(Self { runtime, pool })
    }

    fn fetch_rows(
        &self,
        context: &str,
        sql: &str,
        binds: Option<(&str, &[i64])>,
    ) -> Result<Vec<PgRow>, DbError> {
        let mut query = sqlx::query(sql);
        if let Some((c_owner_tag, l_ids)) = binds {
            query = query.bind(c_owner_tag).bind(l_ids);
        }
        self.runtime
            .block_on(query.fetch_all(&self.pool))
            .map_err(|source| DbError::Query {
                context: context.to_string(),
                source,
            })
    }

    fn load_units_kind(&self, kind: EnumUnitKind) -> Result<Vec<SpecUnit>, DbError> {
        let l_rows = self.fetch_rows(kind.table_name(), &derive_units_sql(kind), None)?;
        let to_error = |source| DbError::Query {
            context: kind.table_name().to_string(),
            source,
        };
        let mut l_units = Vec::with_capacity(l_rows.len());
        for row in &l_rows {
            l_units.push(build_unit(
                kind,
                row.try_get("id").map_err(to_error)?,
                row.try_get("name").map_err(to_error)?,
                row.try_get("level").map_err(to_error)?,
                row.try_get("parent_id").map_err(to_error)?,
            ));
        }
        debug!("{}: {} rows", kind.table_name(), l_units.len());
        Ok(l_units)
    }

    fn load_item_types_all(&self) -> Result<Vec<SpecItemType>, DbError> {
        let l_rows = self.fetch_rows("item catalog", C_SQL_ITEM_TYPES, None)?;
        let to_error = |source| DbError::Query {
            context: "item catalog".to_string(),
            source,
        };
        let mut l_items = Vec::with_capacity(l_rows.len());
        for row in &l_rows {
            let name: Option<String> = row.try_get("name").map_err(to_error)?;
            let group_name: Option<String> = row.try_get("group_name").map_err(to_error)?;
            l_items.push(SpecItemType {
                id: row.try_get("id").map_err(to_error)?,
                name: name.unwrap_or_default(),
                order: row.try_get("item_order").map_err(to_error)?,
                group_id: row.try_get("group_id").map_err(to_error)?,
                group_name: group_name.unwrap_or_default(),
                if_deleted: false,
            });
        }
        Ok(l_items)
    }

    fn fetch_counts_scope(&self, scope: &SpecCountScope) -> Result<Vec<SpecCountRow>, DbError> {
        if scope.owner_ids.is_empty() {
            return Ok(Vec::new());
        }
        let c_context = format!("counts for {}", scope.owner_kind);
        let l_rows = self.fetch_rows(
            &c_context,
            C_SQL_COUNTS,
            Some((scope.owner_kind.owner_tag(), scope.owner_ids.as_slice())),
        )?;
        let to_error = |source| DbError::Query {
            context: c_context.clone(),
            source,
        };

        let mut dict_sums = DictSignedCounts::new();
        for row in &l_rows {
            let n_item: i64 = row.try_get("equipment_id").map_err(to_error)?;
            let n_owner: i64 = row.try_get("owner_id").map_err(to_error)?;
            let l_counts: [i64; 3] = [
                row.try_get("baik").map_err(to_error)?,
                row.try_get("rusak_ringan").map_err(to_error)?,
                row.try_get("rusak_berat").map_err(to_error)?,
            ];
            dict_sums.insert((n_item, SpecUnitKey::new(scope.owner_kind, n_owner)), l_counts);
        }
        derive_count_rows(dict_sums)
    }
}

impl InventorySource for PgInventorySource {
    fn load_units(&self, kind: EnumUnitKind) -> Result<Vec<SpecUnit>, ReportError> {
        Ok(self.load_units_kind(kind)?)
    }

    fn load_item_types(&self) -> Result<Vec<SpecItemType>, ReportError> {
        Ok(self.load_item_types_all()?)
    }

    fn fetch_counts(&self, scope: &SpecCountScope) -> Result<Vec<SpecCountRow>, ReportError> {
        Ok(self.fetch_counts_scope(scope)?)
    }
}
