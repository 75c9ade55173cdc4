//! Store constants: connection defaults and source table names.

/// Default PostgreSQL host.
pub const C_DB_HOST_DEFAULT: &str = "127.0.0.1";
/// Default PostgreSQL port.
pub const N_DB_PORT_DEFAULT: u16 = 5432;
/// Pool size ceiling; scope workers share the pool.
pub const N_POOL_CONNECTIONS_MAX: u32 = 8;
/// Seconds to wait for a pooled connection.
pub const N_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Item catalog table.
pub const C_TABLE_EQUIPMENTS: &str = "equipments";
/// Item classification table.
pub const C_TABLE_EQUIPMENT_TYPES: &str = "equipment_types";
/// Inventory fact table.
pub const C_TABLE_EQUIPMENT_INVENTORIES: &str = "equipment_inventories";

/// Snapshot file extension (Arrow IPC).
pub const C_EXT_SNAPSHOT: &str = "ipc";
