//! Stateless helpers shared by the layout composer and the assembler.

use crate::conf::{
    C_FILE_NAME_FALLBACK, C_SHEET_NAME_FALLBACK, N_LEN_EXCEL_SHEET_NAME_MAX,
    TUP_NAME_ILLEGAL_REMOVED, TUP_NAME_ILLEGAL_REPLACED,
};
use crate::spec::EnumCellValue;

////////////////////////////////////////////////////////////////////////////////
// #region NameNormalization

fn strip_illegal_name_chars(name: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_NAME_ILLEGAL_REPLACED {
        c_name = c_name.replace(c_illegal, "-");
    }
    for c_illegal in TUP_NAME_ILLEGAL_REMOVED {
        c_name = c_name.replace(c_illegal, "");
    }
    c_name.trim().to_string()
}

/// Strip path-unsafe characters and trim to a valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str) -> String {
    let c_name = strip_illegal_name_chars(name);
    if c_name.is_empty() {
        return C_SHEET_NAME_FALLBACK.to_string();
    }

    c_name
        .chars()
        .take(N_LEN_EXCEL_SHEET_NAME_MAX)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Strip path-unsafe characters for a file or directory name (no truncation).
pub fn sanitize_file_name(name: &str) -> String {
    let c_name = strip_illegal_name_chars(name);
    if c_name.is_empty() || c_name == "." || c_name == ".." {
        return C_FILE_NAME_FALLBACK.to_string();
    }
    c_name
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DisplayValues

/// Zero-suppressed display value of a stored count.
pub fn derive_display_count(n: u64) -> EnumCellValue {
    if n == 0 {
        EnumCellValue::None
    } else {
        EnumCellValue::Number(n as f64)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Workers

/// Resolve the worker thread limit: explicit values are clamped to the CPU count.
pub fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_sheet_name_strips_and_truncates() {
        assert_eq!(sanitize_sheet_name("POLRES A/B"), "POLRES A-B");
        assert_eq!(sanitize_sheet_name("x:y*z?[w]\\v"), "xyzw-v");
        assert_eq!(sanitize_sheet_name("  ::  "), "Sheet");

        let c_long = "DIREKTORAT LALU LINTAS POLDA METRO JAYA";
        let c_sheet = sanitize_sheet_name(c_long);
        assert_eq!(c_sheet.chars().count(), 31);
        assert!(c_long.starts_with(&c_sheet));
    }

    #[test]
    fn sanitize_file_name_keeps_full_length() {
        let c_long = "DIREKTORAT LALU LINTAS / POLDA METRO JAYA";
        assert_eq!(
            sanitize_file_name(c_long),
            "DIREKTORAT LALU LINTAS - POLDA METRO JAYA"
        );
        assert_eq!(sanitize_file_name("??"), "unnamed");
        assert_eq!(sanitize_file_name(".."), "unnamed");
    }

    #[test]
    fn derive_display_count_blanks_zero_only() {
        assert_eq!(derive_display_count(0), EnumCellValue::None);
        assert_eq!(derive_display_count(7), EnumCellValue::Number(7.0));
    }

    #[test]
    fn calculate_worker_limit_never_zero() {
        assert_eq!(calculate_worker_limit(Some(0)), 1);
        assert!(calculate_worker_limit(None) >= 1);
    }
}
