//! Run report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

/// One scope that was skipped because it could not be reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecScopeError {
    /// Scope label, e.g. `polda#3` or the unit name.
    pub scope: String,
    /// Rendered error.
    pub exception: String,
}

/// Aggregate counters and diagnostics for one report run.
#[derive(Debug, Default, Clone)]
pub struct ReportRun {
    /// Number of scope units processed (provinces, districts, headquarters units).
    pub cnt_scopes: u64,
    /// Number of workbooks handed to the sink.
    pub cnt_workbooks: u64,
    /// Number of sheets written across all workbooks.
    pub cnt_sheets: u64,
    /// Number of sheets dropped by the empty-sheet policy.
    pub cnt_sheets_skipped: u64,
    /// Non-fatal warnings (missing ancestors, etc.).
    pub warnings: Vec<String>,
    /// Per-scope failures.
    pub errors: Vec<SpecScopeError>,
}

impl ReportRun {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scopes".to_string(), self.cnt_scopes);
        dict_counts.insert("cnt_workbooks".to_string(), self.cnt_workbooks);
        dict_counts.insert("cnt_sheets".to_string(), self.cnt_sheets);
        dict_counts.insert("cnt_sheets_skipped".to_string(), self.cnt_sheets_skipped);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} scopes={} workbooks={} sheets={} skipped={} errors={} warnings={}",
            dict_counts["cnt_scopes"],
            dict_counts["cnt_workbooks"],
            dict_counts["cnt_sheets"],
            dict_counts["cnt_sheets_skipped"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[REPORT]"))
    }
}

/// Mutable accumulator for one scope (or the whole run).
#[derive(Debug, Default, Clone)]
pub struct ReportRunBuilder {
    pub cnt_scopes: u64,
    pub cnt_workbooks: u64,
    pub cnt_sheets: u64,
    pub cnt_sheets_skipped: u64,
    pub errors: Vec<SpecScopeError>,
    pub warnings: Vec<String>,
}

impl ReportRunBuilder {
    pub fn add_scope(&mut self) {
        self.cnt_scopes += 1;
    }

    /// Count one written workbook and its sheets.
    pub fn add_workbook(&mut self, n_sheets: usize) {
        self.cnt_workbooks += 1;
        self.cnt_sheets += n_sheets as u64;
    }

    pub fn add_skipped_sheet(&mut self) {
        self.cnt_sheets_skipped += 1;
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn add_error(&mut self, scope: String, exception: String) {
        self.errors.push(SpecScopeError { scope, exception });
    }

    /// Fold a per-scope builder into this one, keeping diagnostics in order.
    pub fn absorb(&mut self, other: ReportRunBuilder) {
        self.cnt_scopes += other.cnt_scopes;
        self.cnt_workbooks += other.cnt_workbooks;
        self.cnt_sheets += other.cnt_sheets;
        self.cnt_sheets_skipped += other.cnt_sheets_skipped;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportRun {
        ReportRun {
            cnt_scopes: self.cnt_scopes,
            cnt_workbooks: self.cnt_workbooks,
            cnt_sheets: self.cnt_sheets,
            cnt_sheets_skipped: self.cnt_sheets_skipped,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_run_summary_line() {
        let mut builder = ReportRunBuilder::default();
        builder.add_scope();
        builder.add_workbook(3);
        builder.add_skipped_sheet();

        let mut builder_scope = ReportRunBuilder::default();
        builder_scope.add_scope();
        builder_scope.add_warning("missing parent".to_string());
        builder_scope.add_error("satker_mabes#4".to_string(), "cycle".to_string());
        builder.absorb(builder_scope);

        let report = builder.build();
        assert_eq!(report.to_dict()["cnt_scopes"], 2);
        assert_eq!(
            report.to_string(),
            "[REPORT] scopes=2 workbooks=1 sheets=3 skipped=1 errors=1 warnings=1"
        );
        assert_eq!(report.errors[0].scope, "satker_mabes#4");
    }
}
