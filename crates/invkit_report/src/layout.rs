//! Dense grid to logical sheet layout.
//!
//! The composer decides every cell value, merge range, and freeze position; the
//! workbook writer only applies styles per [`EnumLayoutRowKind`].

use crate::conf::{N_COLS_LEAD, N_COLS_PER_UNIT};
use crate::spec::{
    EnumCellValue, EnumLayoutRowKind, EnumSheetShape, ReportError, SpecConditionCount,
    SpecReportGrid, SpecReportLabels, SpecSheetHorizontalMerge, SpecSheetLayout,
};
use crate::util::derive_display_count;

/// Total column count for a grid in the given shape.
pub fn calculate_sheet_width(n_units: usize, shape: EnumSheetShape) -> usize {
    match shape {
        EnumSheetShape::Wide => N_COLS_LEAD + N_COLS_PER_UNIT * n_units,
        EnumSheetShape::Single => N_COLS_LEAD + N_COLS_PER_UNIT,
    }
}

/// Compose one sheet from a grid.
///
/// `Single` requires exactly one grid unit.
pub fn compose_sheet(
    grid: &SpecReportGrid,
    shape: EnumSheetShape,
    labels: &SpecReportLabels,
    sheet_name: &str,
) -> Result<SpecSheetLayout, ReportError> {
    if shape == EnumSheetShape::Single && grid.units.len() != 1 {
        return Err(ReportError::InvalidData(format!(
            "single-unit sheet `{sheet_name}` needs exactly one unit, got {}",
            grid.units.len()
        )));
    }

    let n_cols = calculate_sheet_width(grid.units.len(), shape);
    let mut l_rows: Vec<Vec<EnumCellValue>> = Vec::new();
    let mut l_row_kinds: Vec<EnumLayoutRowKind> = Vec::new();
    let mut l_merges: Vec<SpecSheetHorizontalMerge> = Vec::new();

    let (n_rows_header, row_freeze, col_freeze) = match shape {
        EnumSheetShape::Wide => {
            let (l_header_rows, l_header_merges) = plan_wide_header(grid, labels, n_cols);
            l_rows.extend(l_header_rows);
            l_merges.extend(l_header_merges);
            (2, 2, N_COLS_LEAD)
        }
        EnumSheetShape::Single => {
            let mut l_header = vec![
                EnumCellValue::text(&labels.number),
                EnumCellValue::text(&labels.item),
            ];
            l_header.extend(labels.condition_labels().into_iter().map(EnumCellValue::text));
            l_rows.push(l_header);
            (1, 1, 0)
        }
    };
    l_row_kinds.extend(std::iter::repeat_n(EnumLayoutRowKind::Header, n_rows_header));

    for group in &grid.groups {
        let n_row_idx_banner = l_rows.len();
        let mut l_banner = vec![EnumCellValue::None; n_cols];
        l_banner[1] = EnumCellValue::text(&group.group_name);
        l_rows.push(l_banner);
        l_row_kinds.push(EnumLayoutRowKind::Banner);
        l_merges.push(SpecSheetHorizontalMerge {
            row_idx_start: n_row_idx_banner,
            col_idx_start: 1,
            col_idx_end: n_cols - 1,
            text: group.group_name.clone(),
        });

        for (n_idx_item, grid_row) in group.rows.iter().enumerate() {
            let mut l_row = Vec::with_capacity(n_cols);
            l_row.push(EnumCellValue::Number((n_idx_item + 1) as f64));
            l_row.push(EnumCellValue::text(&grid_row.item_name));
            for count in &grid_row.cells {
                l_row.extend(derive_count_cells(count));
            }
            l_rows.push(l_row);
            l_row_kinds.push(EnumLayoutRowKind::Body);
        }
    }

    Ok(SpecSheetLayout {
        sheet_name: sheet_name.to_string(),
        shape,
        rows: l_rows,
        row_kinds: l_row_kinds,
        merges: l_merges,
        n_rows_header,
        n_cols,
        row_freeze,
        col_freeze,
    })
}

fn plan_wide_header(
    grid: &SpecReportGrid,
    labels: &SpecReportLabels,
    n_cols: usize,
) -> (Vec<Vec<EnumCellValue>>, Vec<SpecSheetHorizontalMerge>) {
    let mut l_top = vec![EnumCellValue::None; n_cols];
    let mut l_sub = vec![EnumCellValue::None; n_cols];
    let mut l_merges = Vec::with_capacity(grid.units.len());

    l_top[0] = EnumCellValue::text(&labels.number);
    l_top[1] = EnumCellValue::text(&labels.item);

    for (n_idx_unit, unit) in grid.units.iter().enumerate() {
        let n_col_start = N_COLS_LEAD + N_COLS_PER_UNIT * n_idx_unit;
        l_top[n_col_start] = EnumCellValue::text(&unit.name);
        for (n_offset, c_label) in labels.condition_labels().into_iter().enumerate() {
            l_sub[n_col_start + n_offset] = EnumCellValue::text(c_label);
        }
        l_merges.push(SpecSheetHorizontalMerge {
            row_idx_start: 0,
            col_idx_start: n_col_start,
            col_idx_end: n_col_start + N_COLS_PER_UNIT - 1,
            text: unit.name.clone(),
        });
    }

    (vec![l_top, l_sub], l_merges)
}

fn derive_count_cells(count: &SpecConditionCount) -> [EnumCellValue; 4] {
    [
        derive_display_count(count.good),
        derive_display_count(count.light_damage),
        derive_display_count(count.heavy_damage),
        derive_display_count(count.total()),
    ]
}
