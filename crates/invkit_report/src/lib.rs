//! `invkit_report` v1:
//! Hierarchical inventory aggregation and tabulation engine.
//!
//! Architecture:
//! - `conf`     : constants (naming limits, layout geometry, labels)
//! - `spec`     : unit/inventory/grid/layout models, options, errors
//! - `util`     : pure helper functions
//! - `tree`     : organizational forest index and walks
//! - `pivot`    : sparse count rows to dense grid
//! - `layout`   : grid to logical sheet layout
//! - `report`   : run report and builder
//! - `assemble` : source/sink seams and the report assembler
pub mod assemble;
pub mod conf;
pub mod layout;
pub mod pivot;
pub mod report;
pub mod spec;
pub mod tree;
pub mod util;

pub use assemble::{InventorySource, ReportAssembler, WorkbookSink};
pub use layout::{calculate_sheet_width, compose_sheet};
pub use pivot::{build_report_grid, derive_item_order};
pub use report::{ReportRun, ReportRunBuilder, SpecScopeError};
pub use spec::{
    EnumCellValue, EnumLayoutRowKind, EnumSheetShape, EnumUnitKind, ReportError,
    SpecAncestorChain, SpecConditionCount, SpecCountRow, SpecCountScope, SpecGridGroup,
    SpecGridRow, SpecGridUnit, SpecItemType, SpecReportGrid, SpecReportLabels,
    SpecReportOptions, SpecScopeSelection, SpecSheetHorizontalMerge, SpecSheetLayout, SpecUnit,
    SpecUnitKey, SpecWorkbookPlan,
};
pub use tree::{UnitForest, derive_ancestor_chain, derive_descendants};
pub use util::{
    calculate_worker_limit, derive_display_count, sanitize_file_name, sanitize_sheet_name,
};
