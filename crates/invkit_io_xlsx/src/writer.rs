//! XLSX writer kernel that renders report sheet layouts into workbook output.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use invkit_report::{
    EnumCellValue, EnumLayoutRowKind, EnumSheetShape, ReportError, SpecSheetLayout,
    SpecWorkbookPlan, WorkbookSink, sanitize_sheet_name,
};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use tracing::{debug, warn};

use crate::conf::N_WIDTH_EXCEL_COLUMN_MAX;
use crate::spec::{
    EnumAutofitColumnsRule, SpecAutofitCellsPolicy, SpecCellFormat, SpecXlsxReport,
    SpecXlsxWriteOptions, XlsxWriteError,
};
use crate::util::{
    calculate_column_content_widths, derive_merged_cell_tracker, derive_unique_sheet_name,
    validate_sheet_layout,
};

struct SpecResolvedFormats {
    text: Format,
    number: Format,
    row_number: Format,
    header: Format,
    header_wide: Format,
    banner: Format,
}

impl SpecResolvedFormats {
    fn from_options(write_options: &SpecXlsxWriteOptions) -> Self {
        let formats = &write_options.formats;
        Self {
            text: derive_rust_xlsx_format(&formats.text),
            number: derive_rust_xlsx_format(&formats.number),
            row_number: derive_rust_xlsx_format(&formats.row_number),
            header: derive_rust_xlsx_format(&formats.header),
            header_wide: derive_rust_xlsx_format(&formats.header.merge(&formats.header_wide_patch)),
            banner: derive_rust_xlsx_format(&formats.banner),
        }
    }

    fn for_cell(&self, shape: EnumSheetShape, kind: EnumLayoutRowKind, col_idx: usize) -> &Format {
        match (kind, shape) {
            (EnumLayoutRowKind::Header, EnumSheetShape::Wide) => &self.header_wide,
            (EnumLayoutRowKind::Header, EnumSheetShape::Single) => &self.header,
            (EnumLayoutRowKind::Banner, _) => &self.banner,
            (EnumLayoutRowKind::Body, _) => match col_idx {
                0 => &self.row_number,
                1 => &self.text,
                _ => &self.number,
            },
        }
    }
}

/// Stateful workbook writer.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    formats: SpecResolvedFormats,
    policy_autofit: SpecAutofitCellsPolicy,
    set_sheet_names_existing: BTreeSet<String>,
    report: SpecXlsxReport,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path and format presets.
    ///
    /// The workbook is buffered in memory until [`Self::close`] is called.
    pub fn new(path_file_out: PathBuf, write_options: &SpecXlsxWriteOptions) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            formats: SpecResolvedFormats::from_options(write_options),
            policy_autofit: write_options.policy_autofit.clone(),
            set_sheet_names_existing: BTreeSet::new(),
            report: SpecXlsxReport::default(),
            if_closed: false,
        }
    }

    pub fn file_out(&self) -> String {
        self.path_file_out.to_string_lossy().to_string()
    }

    pub fn report(&self) -> SpecXlsxReport {
        self.report.clone()
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> Result<(), String> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook
            .save(&self.path_file_out)
            .map_err(derive_xlsx_error_text)?;
        self.if_closed = true;
        Ok(())
    }

    /// Append one sheet rendered from `layout`.
    pub fn write_sheet(&mut self, layout: &SpecSheetLayout) -> Result<(), String> {
        validate_policy_autofit(&self.policy_autofit)?;
        validate_sheet_layout(layout)?;

        let sheet_name_clean = sanitize_sheet_name(&layout.sheet_name);
        let sheet_name_unique =
            derive_unique_sheet_name(&sheet_name_clean, &mut self.set_sheet_names_existing);
        if sheet_name_unique != sheet_name_clean {
            self.report.warn(format!(
                "sheet name `{sheet_name_clean}` already used; written as `{sheet_name_unique}`"
            ));
        }

        let worksheet = self.workbook.add_worksheet();
        worksheet
            .set_name(&sheet_name_unique)
            .map_err(derive_xlsx_error_text)?;

        write_cells(worksheet, layout, &self.formats)?;

        if layout.row_freeze > 0 || layout.col_freeze > 0 {
            worksheet
                .set_freeze_panes(
                    cast_row_num(layout.row_freeze)?,
                    cast_col_num(layout.col_freeze)?,
                )
                .map_err(derive_xlsx_error_text)?;
        }

        if self.policy_autofit.rule_columns != EnumAutofitColumnsRule::None {
            let n_min = usize::max(1, self.policy_autofit.width_cell_min);
            let n_max = usize::min(
                N_WIDTH_EXCEL_COLUMN_MAX,
                usize::max(n_min, self.policy_autofit.width_cell_max),
            );
            let n_pad = self.policy_autofit.width_cell_padding;
            let l_widths =
                calculate_column_content_widths(layout, self.policy_autofit.rule_columns);
            for (n_idx_col, n_width_recorded) in l_widths.into_iter().enumerate() {
                let n_width_final = usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad));
                worksheet
                    .set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)
                    .map_err(derive_xlsx_error_text)?;
            }
        }

        debug!(
            "sheet `{sheet_name_unique}`: {} rows x {} cols",
            layout.rows.len(),
            layout.n_cols
        );
        self.report.sheets.push(sheet_name_unique);
        Ok(())
    }
}

fn write_cells(
    worksheet: &mut Worksheet,
    layout: &SpecSheetLayout,
    formats: &SpecResolvedFormats,
) -> Result<(), String> {
    let dict_merged_cells_tracker = derive_merged_cell_tracker(layout);

    let iter_rows = layout.rows.iter().zip(layout.row_kinds.iter());
    for (row_idx, (row_values, kind)) in iter_rows.enumerate() {
        for (col_idx, value) in row_values.iter().enumerate() {
            if dict_merged_cells_tracker
                .get(&(row_idx, col_idx))
                .copied()
                .unwrap_or(false)
            {
                continue;
            }
            let format = formats.for_cell(layout.shape, *kind, col_idx);
            write_cell_with_format(worksheet, row_idx, col_idx, value, format)?;
        }
    }

    for merge in layout.merges.iter().filter(|m| !m.is_single_cell()) {
        let kind = layout.row_kinds[merge.row_idx_start];
        let format = formats.for_cell(layout.shape, kind, merge.col_idx_start);
        worksheet
            .merge_range(
                cast_row_num(merge.row_idx_start)?,
                cast_col_num(merge.col_idx_start)?,
                cast_row_num(merge.row_idx_start)?,
                cast_col_num(merge.col_idx_end)?,
                &merge.text,
                format,
            )
            .map_err(derive_xlsx_error_text)?;
    }

    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), String> {
    match value {
        EnumCellValue::None => {
            worksheet
                .write_blank(cast_row_num(row_idx)?, cast_col_num(col_idx)?, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::String(val) if val.is_empty() => {
            worksheet
                .write_blank(cast_row_num(row_idx)?, cast_col_num(col_idx)?, format)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::String(val) => {
            worksheet
                .write_string_with_format(
                    cast_row_num(row_idx)?,
                    cast_col_num(col_idx)?,
                    val,
                    format,
                )
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::Number(val) => {
            worksheet
                .write_number_with_format(
                    cast_row_num(row_idx)?,
                    cast_col_num(col_idx)?,
                    *val,
                    format,
                )
                .map_err(derive_xlsx_error_text)?;
        }
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// #region WorkbookSink

/// Writes workbook plans as `.xlsx` files under one output directory.
#[derive(Debug, Clone)]
pub struct XlsxWorkbookSink {
    path_dir_out: PathBuf,
    write_options: SpecXlsxWriteOptions,
}

impl XlsxWorkbookSink {
    pub fn new(path_dir_out: impl Into<PathBuf>, write_options: SpecXlsxWriteOptions) -> Self {
        Self {
            path_dir_out: path_dir_out.into(),
            write_options,
        }
    }

    pub fn path_dir_out(&self) -> &Path {
        &self.path_dir_out
    }

    /// Render every sheet of `plan` and save the workbook.
    pub fn write_workbook_plan(
        &self,
        plan: &SpecWorkbookPlan,
    ) -> Result<SpecXlsxReport, XlsxWriteError> {
        let path_file_out = self.path_dir_out.join(&plan.path_relative);
        if let Some(path_dir_parent) = path_file_out.parent() {
            std::fs::create_dir_all(path_dir_parent).map_err(|source| XlsxWriteError::CreateDir {
                path: path_dir_parent.display().to_string(),
                source,
            })?;
        }

        let mut writer = XlsxWriter::new(path_file_out, &self.write_options);
        let to_error = |message: String| XlsxWriteError::Workbook {
            path: plan.path_relative.display().to_string(),
            message,
        };
        for layout in &plan.sheets {
            writer.write_sheet(layout).map_err(to_error)?;
        }
        writer.close().map_err(to_error)?;

        let report = writer.report();
        for c_warning in &report.warnings {
            warn!("{}: {c_warning}", plan.path_relative.display());
        }
        Ok(report)
    }
}

impl WorkbookSink for XlsxWorkbookSink {
    fn write_workbook(&self, plan: &SpecWorkbookPlan) -> Result<(), ReportError> {
        self.write_workbook_plan(plan)?;
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FormatConversion

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }

    for val in [&spec.align, &spec.valign].into_iter().flatten() {
        if let Some(align) = derive_format_align(val) {
            format = format.set_align(align);
        }
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if spec.border.unwrap_or(false) {
        format = format.set_border(FormatBorder::Thin);
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

// Only the alignments the report presets use; anything else is ignored.
fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align {
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "vcenter" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<(), String> {
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(format!(
            "policy_autofit.width_cell_max ({}) must be >= width_cell_min ({}).",
            policy_autofit.width_cell_max, policy_autofit.width_cell_min
        ));
    }
    Ok(())
}

fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use calamine::{Data, Reader, Xlsx, open_workbook};
    use invkit_report::{
        EnumUnitKind, SpecConditionCount, SpecGridGroup, SpecGridRow, SpecGridUnit,
        SpecReportGrid, SpecReportLabels, SpecUnitKey, compose_sheet,
    };

    use super::*;

    fn sample_grid(l_names: &[&str]) -> SpecReportGrid {
        SpecReportGrid {
            units: l_names
                .iter()
                .enumerate()
                .map(|(n_idx, name)| SpecGridUnit {
                    key: SpecUnitKey::new(EnumUnitKind::SubDistrictPost, n_idx as i64),
                    name: name.to_string(),
                })
                .collect(),
            groups: vec![SpecGridGroup {
                group_id: 1,
                group_name: "Senjata Api".to_string(),
                rows: vec![SpecGridRow {
                    item_type_id: 1,
                    item_name: "Pistol".to_string(),
                    cells: l_names
                        .iter()
                        .enumerate()
                        .map(|(n_idx, _)| {
                            if n_idx == 0 {
                                SpecConditionCount::new(3, 1, 0)
                            } else {
                                SpecConditionCount::ZERO
                            }
                        })
                        .collect(),
                }],
            }],
        }
    }

    fn text_at(range: &calamine::Range<Data>, row: u32, col: u32) -> String {
        match range.get_value((row, col)) {
            Some(Data::String(s)) => s.clone(),
            Some(Data::Float(f)) => format!("{f}"),
            Some(Data::Int(n)) => format!("{n}"),
            _ => String::new(),
        }
    }

    #[test]
    fn sink_writes_wide_sheet_with_merged_header() {
        let dir_tmp = tempfile::tempdir().expect("tempdir");
        let sink = XlsxWorkbookSink::new(dir_tmp.path(), SpecXlsxWriteOptions::default());
        let layout = compose_sheet(
            &sample_grid(&["POLSEK A", "POLSEK B"]),
            EnumSheetShape::Wide,
            &SpecReportLabels::default(),
            "POLRES X",
        )
        .expect("layout");
        let plan = SpecWorkbookPlan {
            path_relative: PathBuf::from("POLDA X").join("Inventaris_POLDA_X.xlsx"),
            sheets: vec![layout],
        };

        let report = sink.write_workbook_plan(&plan).expect("write");
        assert_eq!(report.sheets, vec!["POLRES X"]);

        let path_file = dir_tmp.path().join(&plan.path_relative);
        assert!(path_file.exists());
        let mut workbook: Xlsx<_> = open_workbook(&path_file).expect("open");
        assert_eq!(workbook.sheet_names(), vec!["POLRES X".to_string()]);
        let range = workbook.worksheet_range("POLRES X").expect("range");

        assert_eq!(text_at(&range, 0, 0), "No.");
        assert_eq!(text_at(&range, 0, 1), "Jenis Materil");
        assert_eq!(text_at(&range, 0, 2), "POLSEK A");
        assert_eq!(text_at(&range, 0, 3), "");
        assert_eq!(text_at(&range, 0, 6), "POLSEK B");
        assert_eq!(text_at(&range, 1, 2), "Baik");
        assert_eq!(text_at(&range, 1, 9), "Jumlah");
        assert_eq!(text_at(&range, 2, 1), "Senjata Api");
        assert_eq!(text_at(&range, 3, 0), "1");
        assert_eq!(text_at(&range, 3, 1), "Pistol");
        assert_eq!(text_at(&range, 3, 2), "3");
        assert_eq!(text_at(&range, 3, 4), "");
        assert_eq!(text_at(&range, 3, 5), "4");
        assert_eq!(text_at(&range, 3, 6), "");
    }

    #[test]
    fn duplicate_and_illegal_sheet_names_never_fail() {
        let dir_tmp = tempfile::tempdir().expect("tempdir");
        let sink = XlsxWorkbookSink::new(dir_tmp.path(), SpecXlsxWriteOptions::default());
        let labels = SpecReportLabels::default();
        let l_sheets = ["POLSEK A/B", "POLSEK A/B", "polsek a-b"]
            .iter()
            .map(|name| {
                compose_sheet(&sample_grid(&[*name]), EnumSheetShape::Single, &labels, name)
                    .expect("layout")
            })
            .collect();
        let plan = SpecWorkbookPlan {
            path_relative: PathBuf::from("dup.xlsx"),
            sheets: l_sheets,
        };

        let report = sink.write_workbook_plan(&plan).expect("write");
        assert_eq!(
            report.sheets,
            vec!["POLSEK A-B", "POLSEK A-B__2", "polsek a-b__3"]
        );
        assert_eq!(report.warnings.len(), 2);

        let mut workbook: Xlsx<_> =
            open_workbook(dir_tmp.path().join("dup.xlsx")).expect("open");
        let range = workbook.worksheet_range("POLSEK A-B__2").expect("range");
        assert_eq!(text_at(&range, 0, 2), "Baik");
        assert_eq!(text_at(&range, 2, 5), "4");
    }

    #[test]
    fn zero_unit_sheet_writes_without_merges() {
        let dir_tmp = tempfile::tempdir().expect("tempdir");
        let sink = XlsxWorkbookSink::new(dir_tmp.path(), SpecXlsxWriteOptions::default());
        let layout = compose_sheet(
            &sample_grid(&[]),
            EnumSheetShape::Wide,
            &SpecReportLabels::default(),
            "EMPTY",
        )
        .expect("layout");
        let plan = SpecWorkbookPlan {
            path_relative: PathBuf::from("empty.xlsx"),
            sheets: vec![layout],
        };
        sink.write_workbook_plan(&plan).expect("write");

        let mut workbook: Xlsx<_> =
            open_workbook(dir_tmp.path().join("empty.xlsx")).expect("open");
        let range = workbook.worksheet_range("EMPTY").expect("range");
        assert_eq!(text_at(&range, 2, 1), "Senjata Api");
        assert_eq!(text_at(&range, 3, 1), "Pistol");
    }

    #[test]
    fn ragged_layout_is_a_write_error() {
        let dir_tmp = tempfile::tempdir().expect("tempdir");
        let sink = XlsxWorkbookSink::new(dir_tmp.path(), SpecXlsxWriteOptions::default());
        let mut layout = compose_sheet(
            &sample_grid(&["A"]),
            EnumSheetShape::Single,
            &SpecReportLabels::default(),
            "A",
        )
        .expect("layout");
        layout.rows[0].push(EnumCellValue::None);
        let plan = SpecWorkbookPlan {
            path_relative: PathBuf::from("bad.xlsx"),
            sheets: vec![layout],
        };
        let err = sink.write_workbook(&plan).expect_err("ragged");
        assert!(matches!(err, ReportError::Write(_)));
    }

    #[test]
    fn preset_formats_convert_with_thin_border_and_alignment() {
        let formats = crate::conf::derive_default_sheet_formats();
        let expected = Format::new()
            .set_font_name("Times New Roman")
            .set_font_size(11)
            .set_align(FormatAlign::Right)
            .set_align(FormatAlign::VerticalCenter)
            .set_num_format("0")
            .set_border(FormatBorder::Thin);
        assert_eq!(derive_rust_xlsx_format(&formats.number), expected);

        let custom = SpecCellFormat {
            align: Some("top".to_string()),
            border: Some(false),
            ..Default::default()
        };
        assert_eq!(derive_rust_xlsx_format(&custom), Format::new());
        assert_eq!(derive_format_align("top"), None);
    }
}
