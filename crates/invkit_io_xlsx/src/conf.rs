//! XLSX constants and default preset factories.

use crate::spec::{SpecCellFormat, SpecSheetFormats};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Column width ceiling accepted by Excel.
pub const N_WIDTH_EXCEL_COLUMN_MAX: usize = 255;

/// Build default format presets used by [`crate::writer::XlsxWriter`].
pub fn derive_default_sheet_formats() -> SpecSheetFormats {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some("Times New Roman".to_string()),
        font_size: Some(11),
        border: Some(true),
        align: Some("left".to_string()),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    };

    SpecSheetFormats {
        text: cfg_base_fmt_spec.clone(),
        number: cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some("0".to_string()),
            align: Some("right".to_string()),
            ..Default::default()
        }),
        row_number: cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some("0".to_string()),
            align: Some("center".to_string()),
            ..Default::default()
        }),
        header: cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            ..Default::default()
        }),
        header_wide_patch: SpecCellFormat {
            text_wrap: Some(true),
            ..Default::default()
        },
        banner: cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            ..Default::default()
        }),
    }
}
