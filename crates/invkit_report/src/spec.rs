//! Report data model, options, and top-level error types.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::conf::{
    C_LABEL_GOOD, C_LABEL_HEAVY_DAMAGE, C_LABEL_ITEM, C_LABEL_LIGHT_DAMAGE, C_LABEL_NUMBER,
    C_LABEL_TOTAL,
};

////////////////////////////////////////////////////////////////////////////////
// #region UnitModel

/// Organizational unit kind; doubles as the inventory ownership tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnumUnitKind {
    /// Headquarters unit (`satker_mabes`), self-referencing tree.
    HeadquartersUnit,
    /// Provincial command (`polda`).
    Province,
    /// Flat sub-unit attached to a province (`subsatker_poldas`).
    ProvinceSubunit,
    /// District command (`polres`), child of a province.
    District,
    /// Sub-district post (`polsek`), child of a district.
    SubDistrictPost,
}

impl EnumUnitKind {
    /// Every kind, in hierarchy order.
    pub const ALL: [EnumUnitKind; 5] = [
        EnumUnitKind::HeadquartersUnit,
        EnumUnitKind::Province,
        EnumUnitKind::ProvinceSubunit,
        EnumUnitKind::District,
        EnumUnitKind::SubDistrictPost,
    ];

    /// Polymorphic owner tag stored in `equipment_inventories.owner_type`.
    pub fn owner_tag(self) -> &'static str {
        match self {
            Self::HeadquartersUnit => "App\\Models\\SatkerMabes",
            Self::Province => "App\\Models\\Polda",
            Self::ProvinceSubunit => "App\\Models\\SubsatkerPolda",
            Self::District => "App\\Models\\Polres",
            Self::SubDistrictPost => "App\\Models\\Polsek",
        }
    }

    /// Resolve an owner tag back into a kind.
    pub fn from_owner_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.owner_tag() == tag)
    }

    /// Source table holding units of this kind.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::HeadquartersUnit => "satker_mabes",
            Self::Province => "polda",
            Self::ProvinceSubunit => "subsatker_poldas",
            Self::District => "polres",
            Self::SubDistrictPost => "polsek",
        }
    }
}

impl fmt::Display for EnumUnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Unit identity. Ids are only unique within one kind's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecUnitKey {
    /// Unit kind (table).
    pub kind: EnumUnitKind,
    /// Row id within the kind's table.
    pub id: i64,
}

impl SpecUnitKey {
    pub const fn new(kind: EnumUnitKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for SpecUnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// One node of the organizational forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecUnit {
    /// Unit identity.
    pub key: SpecUnitKey,
    /// Display name.
    pub name: String,
    /// Depth hint from the source table, when it has one.
    pub level: Option<i64>,
    /// Parent reference; `None` for roots.
    pub parent: Option<SpecUnitKey>,
}

impl SpecUnit {
    pub fn new(kind: EnumUnitKind, id: i64, name: impl Into<String>) -> Self {
        Self {
            key: SpecUnitKey::new(kind, id),
            name: name.into(),
            level: None,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: SpecUnitKey) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_level(mut self, level: i64) -> Self {
        self.level = Some(level);
        self
    }
}

/// Result of walking parent references upward.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecAncestorChain {
    /// Names from root to the unit itself.
    pub names: Vec<String>,
    /// Parent reference that could not be resolved, if the walk was cut short.
    pub key_missing: Option<SpecUnitKey>,
}

impl SpecAncestorChain {
    pub fn join(&self, sep: &str) -> String {
        self.names.join(sep)
    }

    pub fn is_complete(&self) -> bool {
        self.key_missing.is_none()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region InventoryModel

/// Catalog entry for one equipment type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecItemType {
    pub id: i64,
    pub name: String,
    /// Explicit sort key within the group.
    pub order: i64,
    /// Classification group (`penggolongan`) id; groups are ordered by it.
    pub group_id: i64,
    pub group_name: String,
    /// Soft-deleted entries never reach a report.
    pub if_deleted: bool,
}

/// Good / lightly-damaged / heavily-damaged tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpecConditionCount {
    pub good: u64,
    pub light_damage: u64,
    pub heavy_damage: u64,
}

impl SpecConditionCount {
    pub const ZERO: SpecConditionCount = SpecConditionCount {
        good: 0,
        light_damage: 0,
        heavy_damage: 0,
    };

    pub const fn new(good: u64, light_damage: u64, heavy_damage: u64) -> Self {
        Self {
            good,
            light_damage,
            heavy_damage,
        }
    }

    /// Sum of the three condition buckets.
    pub fn total(&self) -> u64 {
        self.good
            .saturating_add(self.light_damage)
            .saturating_add(self.heavy_damage)
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }

    /// Accumulate `other` into `self`.
    pub fn absorb(&mut self, other: &SpecConditionCount) {
        self.good = self.good.saturating_add(other.good);
        self.light_damage = self.light_damage.saturating_add(other.light_damage);
        self.heavy_damage = self.heavy_damage.saturating_add(other.heavy_damage);
    }
}

/// Sparse aggregation row: summed counts for one `(item type, owner)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCountRow {
    pub item_type_id: i64,
    pub owner: SpecUnitKey,
    pub counts: SpecConditionCount,
}

/// Aggregation scope: one owner kind and the owner ids to include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCountScope {
    pub owner_kind: EnumUnitKind,
    pub owner_ids: Vec<i64>,
}

impl SpecCountScope {
    pub fn single(key: SpecUnitKey) -> Self {
        Self {
            owner_kind: key.kind,
            owner_ids: vec![key.id],
        }
    }

    /// Split mixed-kind keys into one scope per kind, in first-seen kind order.
    pub fn partition(keys: &[SpecUnitKey]) -> Vec<SpecCountScope> {
        let mut l_scopes: Vec<SpecCountScope> = Vec::new();
        for key in keys {
            match l_scopes.iter_mut().find(|s| s.owner_kind == key.kind) {
                Some(scope) => scope.owner_ids.push(key.id),
                None => l_scopes.push(SpecCountScope::single(*key)),
            }
        }
        l_scopes
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region GridModel

/// Column block of the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecGridUnit {
    pub key: SpecUnitKey,
    pub name: String,
}

/// One item type with one count per grid unit (same order as `SpecReportGrid::units`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecGridRow {
    pub item_type_id: i64,
    pub item_name: String,
    pub cells: Vec<SpecConditionCount>,
}

/// Item rows sharing one classification group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecGridGroup {
    pub group_id: i64,
    pub group_name: String,
    pub rows: Vec<SpecGridRow>,
}

/// Dense `[group][item][unit]` cross-tabulation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecReportGrid {
    pub units: Vec<SpecGridUnit>,
    pub groups: Vec<SpecGridGroup>,
}

impl SpecReportGrid {
    pub fn n_items(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }

    pub fn n_cells(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| g.rows.iter())
            .map(|r| r.cells.len())
            .sum()
    }

    /// Look up one cell by item type id and unit key.
    pub fn cell(&self, item_type_id: i64, unit: &SpecUnitKey) -> Option<&SpecConditionCount> {
        let n_idx_unit = self.units.iter().position(|u| u.key == *unit)?;
        self.groups
            .iter()
            .flat_map(|g| g.rows.iter())
            .find(|r| r.item_type_id == item_type_id)
            .and_then(|r| r.cells.get(n_idx_unit))
    }

    pub fn sum_total(&self) -> u64 {
        self.groups
            .iter()
            .flat_map(|g| g.rows.iter())
            .flat_map(|r| r.cells.iter())
            .fold(0u64, |acc, c| acc.saturating_add(c.total()))
    }

    pub fn is_all_zero(&self) -> bool {
        self.sum_total() == 0
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetLayout

/// Normalized cell value handed to the workbook writer.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Blank cell.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
}

impl EnumCellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) => s.is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Plain-text rendering (blank for `None`).
    pub fn to_display(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::String(s) => s.clone(),
            Self::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
        }
    }
}

/// Sheet header shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumSheetShape {
    /// Two-row header, one 4-column block per unit.
    #[default]
    Wide,
    /// One-row header for a single unit's own report.
    Single,
}

/// Role of one layout row; drives styling in the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumLayoutRowKind {
    Header,
    Banner,
    Body,
}

/// Horizontal merge plan item (0-based, inclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetHorizontalMerge {
    /// Row index where merge is applied.
    pub row_idx_start: usize,
    /// Start column index (inclusive).
    pub col_idx_start: usize,
    /// End column index (inclusive).
    pub col_idx_end: usize,
    /// Merge display text.
    pub text: String,
}

impl SpecSheetHorizontalMerge {
    /// A range covering one cell is written as a plain cell.
    pub fn is_single_cell(&self) -> bool {
        self.col_idx_start >= self.col_idx_end
    }
}

/// Logical sheet produced by the layout composer.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecSheetLayout {
    /// Requested (unsanitized) sheet name.
    pub sheet_name: String,
    pub shape: EnumSheetShape,
    /// Row-major cells; every row has `n_cols` entries.
    pub rows: Vec<Vec<EnumCellValue>>,
    /// One kind per row in `rows`.
    pub row_kinds: Vec<EnumLayoutRowKind>,
    pub merges: Vec<SpecSheetHorizontalMerge>,
    pub n_rows_header: usize,
    pub n_cols: usize,
    /// Frozen rows (top) and columns (left).
    pub row_freeze: usize,
    pub col_freeze: usize,
}

impl SpecSheetLayout {
    /// Iterate body rows (skipping header and banner rows).
    pub fn body_rows(&self) -> impl Iterator<Item = &Vec<EnumCellValue>> {
        self.rows
            .iter()
            .zip(self.row_kinds.iter())
            .filter(|(_, kind)| **kind == EnumLayoutRowKind::Body)
            .map(|(row, _)| row)
    }
}

/// Header vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecReportLabels {
    pub number: String,
    pub item: String,
    pub good: String,
    pub light_damage: String,
    pub heavy_damage: String,
    pub total: String,
}

impl Default for SpecReportLabels {
    fn default() -> Self {
        Self {
            number: C_LABEL_NUMBER.to_string(),
            item: C_LABEL_ITEM.to_string(),
            good: C_LABEL_GOOD.to_string(),
            light_damage: C_LABEL_LIGHT_DAMAGE.to_string(),
            heavy_damage: C_LABEL_HEAVY_DAMAGE.to_string(),
            total: C_LABEL_TOTAL.to_string(),
        }
    }
}

impl SpecReportLabels {
    /// Per-unit sub-labels in column order.
    pub fn condition_labels(&self) -> [&str; 4] {
        [
            self.good.as_str(),
            self.light_damage.as_str(),
            self.heavy_damage.as_str(),
            self.total.as_str(),
        ]
    }
}

/// Workbook handed to the sink: relative output path and ordered sheets.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecWorkbookPlan {
    pub path_relative: PathBuf,
    pub sheets: Vec<SpecSheetLayout>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Which organizational scopes a run emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecScopeSelection {
    /// Province workbooks' top sheet (province sub-units).
    pub if_top_level: bool,
    /// District sheets inside province workbooks.
    pub if_mid_level: bool,
    /// Sub-district posts.
    pub if_leaf_level: bool,
    /// Headquarters hierarchy.
    pub if_alternate_hierarchy: bool,
}

impl Default for SpecScopeSelection {
    fn default() -> Self {
        Self::from_flags(false, false, false, false)
    }
}

impl SpecScopeSelection {
    /// Selecting nothing selects everything.
    pub fn from_flags(top: bool, mid: bool, leaf: bool, alternate: bool) -> Self {
        if !(top || mid || leaf || alternate) {
            return Self {
                if_top_level: true,
                if_mid_level: true,
                if_leaf_level: true,
                if_alternate_hierarchy: true,
            };
        }
        Self {
            if_top_level: top,
            if_mid_level: mid,
            if_leaf_level: leaf,
            if_alternate_hierarchy: alternate,
        }
    }

    pub fn is_all(&self) -> bool {
        self.if_top_level && self.if_mid_level && self.if_leaf_level && self.if_alternate_hierarchy
    }

    pub fn needs_regional(&self) -> bool {
        self.if_top_level || self.if_mid_level || self.if_leaf_level
    }
}

/// Input options for [`crate::assemble::ReportAssembler`].
#[derive(Debug, Clone)]
pub struct SpecReportOptions {
    /// Enabled scopes.
    pub scope: SpecScopeSelection,
    /// Fold child units into their parent's sheet as column blocks instead of
    /// writing per-unit sheets and separate leaf workbooks.
    pub if_single_file_per_scope: bool,
    /// Skip sheets whose counts are all zero.
    pub if_suppress_empty_sheets: bool,
    /// Maximum worker threads across top-level scopes.
    pub num_workers_max: Option<usize>,
    /// Header vocabulary.
    pub labels: SpecReportLabels,
}

impl Default for SpecReportOptions {
    fn default() -> Self {
        Self {
            scope: SpecScopeSelection::default(),
            if_single_file_per_scope: true,
            if_suppress_empty_sheets: false,
            num_workers_max: Some(1),
            labels: SpecReportLabels::default(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Report pipeline failures.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Query or connection failure in the inventory source.
    #[error("inventory source error: {0}")]
    Source(String),
    /// Source returned data violating the model (e.g. negative counts).
    #[error("invalid inventory data: {0}")]
    InvalidData(String),
    /// Parent references loop back onto themselves.
    #[error("hierarchy cycle detected at {key}: {path}")]
    HierarchyCycle {
        /// First key seen twice.
        key: SpecUnitKey,
        /// Keys visited before the repeat, joined by ` -> `.
        path: String,
    },
    /// Unit key not present in the loaded forest.
    #[error("unknown unit: {0}")]
    UnknownUnit(SpecUnitKey),
    /// Workbook sink failure.
    #[error("workbook write error: {0}")]
    Write(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
