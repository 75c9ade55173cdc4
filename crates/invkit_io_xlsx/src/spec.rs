//! Workbook writer models: cell formats, autofit policy, options, errors.

use thiserror::Error;

use crate::conf::derive_default_sheet_formats;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification; `None` fields inherit when merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Thin border on all sides.
    pub border: Option<bool>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
        }
    }
}

/// Format per cell role in a report sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetFormats {
    /// Body text cells (item labels).
    pub text: SpecCellFormat,
    /// Body count cells.
    pub number: SpecCellFormat,
    /// Body row-number column.
    pub row_number: SpecCellFormat,
    /// Header cells.
    pub header: SpecCellFormat,
    /// Patch applied on top of `header` for two-row (wide) headers.
    pub header_wide_patch: SpecCellFormat,
    /// Group banner rows.
    pub banner: SpecCellFormat,
}

impl Default for SpecSheetFormats {
    fn default() -> Self {
        derive_default_sheet_formats()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only.
    Header,
    /// Infer width from body and banner cells only.
    Body,
    /// Infer width from every cell (default).
    #[default]
    All,
}

/// Column autofit policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::All,
            width_cell_min: 1,
            width_cell_max: 50,
            width_cell_padding: 2,
        }
    }
}

/// Writer-wide options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxWriteOptions {
    /// Format presets per cell role.
    pub formats: SpecSheetFormats,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-workbook write report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Final (sanitized, de-duplicated) sheet names in write order.
    pub sheets: Vec<String>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

/// Workbook write failure.
#[derive(Debug, Error)]
pub enum XlsxWriteError {
    /// Output directory could not be created.
    #[error("failed to create directory `{path}`: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Layout or xlsx backend failure for one workbook.
    #[error("failed to write `{path}`: {message}")]
    Workbook { path: String, message: String },
}

impl From<XlsxWriteError> for invkit_report::ReportError {
    fn from(err: XlsxWriteError) -> Self {
        invkit_report::ReportError::Write(err.to_string())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
