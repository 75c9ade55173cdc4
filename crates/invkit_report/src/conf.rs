//! Report constants: naming limits, layout geometry, and default labels.

/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters replaced by `-` in sheet and file names.
pub const TUP_NAME_ILLEGAL_REPLACED: [&str; 2] = ["/", "\\"];
/// Characters removed from sheet and file names.
pub const TUP_NAME_ILLEGAL_REMOVED: [&str; 5] = ["*", "?", ":", "[", "]"];
/// Sheet name used when sanitizing leaves nothing.
pub const C_SHEET_NAME_FALLBACK: &str = "Sheet";
/// File name used when sanitizing leaves nothing.
pub const C_FILE_NAME_FALLBACK: &str = "unnamed";

/// Leading columns before the first unit block (`No.`, item label).
pub const N_COLS_LEAD: usize = 2;
/// Columns per unit block (good, light, heavy, total).
pub const N_COLS_PER_UNIT: usize = 4;

pub const C_LABEL_NUMBER: &str = "No.";
pub const C_LABEL_ITEM: &str = "Jenis Materil";
pub const C_LABEL_GOOD: &str = "Baik";
pub const C_LABEL_LIGHT_DAMAGE: &str = "Rusak Ringan";
pub const C_LABEL_HEAVY_DAMAGE: &str = "Rusak Berat";
pub const C_LABEL_TOTAL: &str = "Jumlah";

////////////////////////////////////////////////////////////////////////////////
// #region OutputNaming

/// Prefix of the province directory and its top sheet (`POLDA <name>`).
pub const C_PREFIX_PROVINCE: &str = "POLDA ";
/// Prefix of the province workbook file.
pub const C_FILE_PREFIX_PROVINCE: &str = "Inventaris_POLDA_";
/// Prefix of the per-province directory holding post workbooks.
pub const C_DIR_PREFIX_POSTS: &str = "Jajaran Polsek POLDA ";
/// Prefix of a district's post workbook file.
pub const C_FILE_PREFIX_POSTS: &str = "Inventaris_Polsek_";
/// Directory holding headquarters workbooks.
pub const C_DIR_HEADQUARTERS: &str = "satker_mabes";
/// Separator joining an ancestor chain into a file name.
pub const C_SEP_ANCESTOR_CHAIN: &str = "_";
/// Workbook file extension.
pub const C_EXT_WORKBOOK: &str = "xlsx";

// #endregion
////////////////////////////////////////////////////////////////////////////////
