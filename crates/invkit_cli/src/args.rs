//! Command-line arguments and their mapping onto run options.

use std::path::PathBuf;

use clap::Parser;
use invkit_io_db::SpecDbConnection;
use invkit_io_db::conf::{C_DB_HOST_DEFAULT, N_DB_PORT_DEFAULT};
use invkit_report::{SpecReportOptions, SpecScopeError, SpecScopeSelection};

/// Equipment inventory report exporter.
///
/// With no scope flag every scope is exported.
#[derive(Parser, Debug)]
#[command(name = "invkit", about = "Export equipment inventory reports to XLSX workbooks")]
pub struct Cli {
    /// Province workbooks' top sheet (province sub-units).
    #[arg(long = "top-level", visible_alias = "polda-only")]
    pub if_top_level: bool,

    /// District sheets inside province workbooks.
    #[arg(long = "mid-level", visible_alias = "polres-only")]
    pub if_mid_level: bool,

    /// Sub-district posts.
    #[arg(long = "leaf-level", visible_alias = "polsek-only")]
    pub if_leaf_level: bool,

    /// Headquarters hierarchy.
    #[arg(long = "headquarters", visible_alias = "satker-mabes-only")]
    pub if_headquarters: bool,

    /// One sheet per unit and separate post workbooks instead of folded sheets.
    #[arg(long = "split-files")]
    pub if_split_files: bool,

    /// Skip sheets whose counts are all zero.
    #[arg(long = "suppress-empty-sheets")]
    pub if_suppress_empty_sheets: bool,

    /// Worker threads across top-level scopes.
    #[arg(long = "workers", default_value_t = 1)]
    pub num_workers: usize,

    /// Root directory for generated workbooks.
    #[arg(long = "output-dir", default_value = "exports")]
    pub path_dir_out: PathBuf,

    /// Read Arrow IPC table dumps from this directory instead of PostgreSQL.
    #[arg(long = "snapshot-dir")]
    pub path_dir_snapshot: Option<PathBuf>,

    #[arg(long = "db-host", env = "DB_HOST", default_value = C_DB_HOST_DEFAULT)]
    pub db_host: String,

    #[arg(long = "db-port", env = "DB_PORT", default_value_t = N_DB_PORT_DEFAULT)]
    pub db_port: u16,

    #[arg(long = "db-database", env = "DB_DATABASE", default_value = "")]
    pub db_database: String,

    #[arg(long = "db-username", env = "DB_USERNAME", default_value = "")]
    pub db_username: String,

    #[arg(long = "db-password", env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,
}

impl Cli {
    pub fn to_report_options(&self) -> SpecReportOptions {
        SpecReportOptions {
            scope: SpecScopeSelection::from_flags(
                self.if_top_level,
                self.if_mid_level,
                self.if_leaf_level,
                self.if_headquarters,
            ),
            if_single_file_per_scope: !self.if_split_files,
            if_suppress_empty_sheets: self.if_suppress_empty_sheets,
            num_workers_max: Some(self.num_workers),
            ..SpecReportOptions::default()
        }
    }

    pub fn to_db_connection(&self) -> SpecDbConnection {
        SpecDbConnection {
            host: self.db_host.clone(),
            port: self.db_port,
            database: self.db_database.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone().filter(|c| !c.is_empty()),
        }
    }
}

/// One line per skipped scope, for the exit summary.
pub fn format_scope_errors(errors: &[SpecScopeError]) -> Vec<String> {
    errors
        .iter()
        .map(|e| format!("[ERROR] {}: {}", e.scope, e.exception))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_scope_flag_selects_everything() {
        let cli = Cli::try_parse_from(["invkit"]).expect("parse");
        let options = cli.to_report_options();
        assert!(options.scope.is_all());
        assert!(options.if_single_file_per_scope);
        assert!(!options.if_suppress_empty_sheets);
        assert_eq!(options.num_workers_max, Some(1));
        assert_eq!(cli.path_dir_out, PathBuf::from("exports"));
        assert_eq!(cli.path_dir_snapshot, None);
    }

    #[test]
    fn scope_aliases_and_layout_switches() {
        let cli = Cli::try_parse_from([
            "invkit",
            "--polres-only",
            "--satker-mabes-only",
            "--split-files",
            "--suppress-empty-sheets",
            "--workers",
            "4",
        ])
        .expect("parse");
        let options = cli.to_report_options();
        assert!(!options.scope.if_top_level);
        assert!(options.scope.if_mid_level);
        assert!(!options.scope.if_leaf_level);
        assert!(options.scope.if_alternate_hierarchy);
        assert!(!options.if_single_file_per_scope);
        assert!(options.if_suppress_empty_sheets);
        assert_eq!(options.num_workers_max, Some(4));
    }

    #[test]
    fn db_options_from_flags() {
        let cli = Cli::try_parse_from([
            "invkit",
            "--db-host",
            "db.internal",
            "--db-port",
            "6543",
            "--db-database",
            "inventaris",
            "--db-username",
            "report",
            "--db-password",
            "",
        ])
        .expect("parse");
        let connection = cli.to_db_connection();
        assert_eq!(connection.host, "db.internal");
        assert_eq!(connection.port, 6543);
        assert_eq!(connection.database, "inventaris");
        assert_eq!(connection.username, "report");
        assert_eq!(connection.password, None);
    }

    #[test]
    fn format_scope_errors_one_line_per_scope() {
        let l_lines = format_scope_errors(&[SpecScopeError {
            scope: "polda#3".to_string(),
            exception: "hierarchy cycle".to_string(),
        }]);
        assert_eq!(l_lines, vec!["[ERROR] polda#3: hierarchy cycle".to_string()]);
    }
}
