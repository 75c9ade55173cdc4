//! `invkit_io_xlsx` v1:
//! XLSX rendering of report sheet layouts.
//!
//! Architecture:
//! - `conf`   : Excel limits and default format presets
//! - `spec`   : formats, autofit policy, options, errors
//! - `util`   : pure helper functions
//! - `writer` : `rust_xlsxwriter` kernel and the workbook sink
pub mod conf;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, derive_default_sheet_formats,
};
pub use spec::{
    EnumAutofitColumnsRule, SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetFormats,
    SpecXlsxReport, SpecXlsxWriteOptions, XlsxWriteError,
};
pub use util::{derive_unique_sheet_name, validate_sheet_layout};
pub use writer::{XlsxWorkbookSink, XlsxWriter};
