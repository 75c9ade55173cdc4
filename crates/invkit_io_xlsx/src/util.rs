//! Pure helpers for the sheet renderer.

use std::collections::{BTreeMap, BTreeSet};

use invkit_report::{EnumCellValue, EnumLayoutRowKind, SpecSheetLayout};

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use crate::spec::EnumAutofitColumnsRule;

/// Check layout shape against itself and Excel limits before any cell is written.
pub fn validate_sheet_layout(layout: &SpecSheetLayout) -> Result<(), String> {
    if layout.rows.len() != layout.row_kinds.len() {
        return Err(format!(
            "sheet `{}`: {} rows but {} row kinds",
            layout.sheet_name,
            layout.rows.len(),
            layout.row_kinds.len()
        ));
    }
    if let Some((n_idx_row, row)) = layout
        .rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != layout.n_cols)
    {
        return Err(format!(
            "sheet `{}`: row {n_idx_row} has {} cells, expected {}",
            layout.sheet_name,
            row.len(),
            layout.n_cols
        ));
    }
    if layout.rows.len() > N_NROWS_EXCEL_MAX || layout.n_cols > N_NCOLS_EXCEL_MAX {
        return Err(format!(
            "sheet `{}`: {}x{} exceeds Excel limits",
            layout.sheet_name,
            layout.rows.len(),
            layout.n_cols
        ));
    }
    for merge in &layout.merges {
        if merge.row_idx_start >= layout.rows.len() || merge.col_idx_end >= layout.n_cols {
            return Err(format!(
                "sheet `{}`: merge row={} cols={}..={} out of bounds",
                layout.sheet_name, merge.row_idx_start, merge.col_idx_start, merge.col_idx_end
            ));
        }
    }
    Ok(())
}

/// Return `name` or the first free `name__N` variant, and reserve it.
///
/// Excel compares sheet names case-insensitively, so reservations do too.
pub fn derive_unique_sheet_name(name: &str, set_names_existing: &mut BTreeSet<String>) -> String {
    if set_names_existing.insert(name.to_lowercase()) {
        return name.to_string();
    }

    let mut n_idx = 2usize;
    loop {
        let c_suffix = format!("__{n_idx}");
        let n_len_base = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_suffix.chars().count());
        let base_name: String = name.chars().take(usize::max(1, n_len_base)).collect();
        let candidate = format!("{base_name}{c_suffix}");
        if set_names_existing.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

/// Cells covered by real (multi-cell) merges, anchors included.
pub fn derive_merged_cell_tracker(layout: &SpecSheetLayout) -> BTreeMap<(usize, usize), bool> {
    let mut dict_merged_cells_tracker = BTreeMap::new();
    for merge in layout.merges.iter().filter(|m| !m.is_single_cell()) {
        for col_idx in merge.col_idx_start..=merge.col_idx_end {
            dict_merged_cells_tracker.insert((merge.row_idx_start, col_idx), true);
        }
    }
    dict_merged_cells_tracker
}

/// Displayed width units; non-ASCII glyphs count wider.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

/// Longest displayed value per column, honoring the autofit rule.
///
/// Merge anchors count toward their first column only.
pub fn calculate_column_content_widths(
    layout: &SpecSheetLayout,
    rule_columns: EnumAutofitColumnsRule,
) -> Vec<usize> {
    let mut l_widths = vec![0usize; layout.n_cols];
    for (row, kind) in layout.rows.iter().zip(layout.row_kinds.iter()) {
        let if_counted = match rule_columns {
            EnumAutofitColumnsRule::None => false,
            EnumAutofitColumnsRule::Header => *kind == EnumLayoutRowKind::Header,
            EnumAutofitColumnsRule::Body => *kind != EnumLayoutRowKind::Header,
            EnumAutofitColumnsRule::All => true,
        };
        if !if_counted {
            continue;
        }
        for (n_idx_col, value) in row.iter().enumerate() {
            let n_width = match value {
                EnumCellValue::None => 0,
                _ => estimate_unicode_string_width(&value.to_display()),
            };
            l_widths[n_idx_col] = usize::max(l_widths[n_idx_col], n_width);
        }
    }
    l_widths
}
