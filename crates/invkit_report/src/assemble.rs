//! Report assembly: scope selection, per-scope pivots, workbook plans.
//!
//! Orchestration order per run:
//! 1. Load the unit tables and the item catalog once.
//! 2. Plan one task per top-level scope (province, headquarters unit).
//! 3. Run tasks serially or on a rayon pool; each task fetches counts, pivots,
//!    composes sheets, and hands finished workbook plans to the sink.
//! 4. Merge per-task reports in task order.

use std::path::PathBuf;

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::conf::{
    C_DIR_HEADQUARTERS, C_DIR_PREFIX_POSTS, C_EXT_WORKBOOK, C_FILE_PREFIX_POSTS,
    C_FILE_PREFIX_PROVINCE, C_PREFIX_PROVINCE, C_SEP_ANCESTOR_CHAIN,
};
use crate::layout::compose_sheet;
use crate::pivot::build_report_grid;
use crate::report::{ReportRun, ReportRunBuilder};
use crate::spec::{
    EnumSheetShape, EnumUnitKind, ReportError, SpecCountRow, SpecCountScope, SpecItemType,
    SpecReportOptions, SpecSheetLayout, SpecUnit, SpecUnitKey, SpecWorkbookPlan,
};
use crate::tree::{UnitForest, derive_ancestor_chain, derive_descendants};
use crate::util::{calculate_worker_limit, sanitize_file_name, sanitize_sheet_name};

////////////////////////////////////////////////////////////////////////////////
// #region Seams

/// Read-only access to the organizational tables and inventory facts.
pub trait InventorySource: Sync {
    /// All units of one kind, in the kind's natural load order.
    fn load_units(&self, kind: EnumUnitKind) -> Result<Vec<SpecUnit>, ReportError>;

    /// Non-deleted item catalog.
    fn load_item_types(&self) -> Result<Vec<SpecItemType>, ReportError>;

    /// Summed condition counts per `(item type, owner)` for owners in `scope`.
    fn fetch_counts(&self, scope: &SpecCountScope) -> Result<Vec<SpecCountRow>, ReportError>;
}

/// Destination for finished workbook plans.
pub trait WorkbookSink: Sync {
    fn write_workbook(&self, plan: &SpecWorkbookPlan) -> Result<(), ReportError>;
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Assembler

#[derive(Debug, Clone, Copy)]
enum EnumScopeTask {
    Province(SpecUnitKey),
    Headquarters(SpecUnitKey),
}

impl EnumScopeTask {
    fn key(&self) -> SpecUnitKey {
        match self {
            Self::Province(key) | Self::Headquarters(key) => *key,
        }
    }
}

struct SpecRunContext<'a, S: ?Sized, W: ?Sized> {
    source: &'a S,
    sink: &'a W,
    forest_regional: UnitForest,
    forest_headquarters: UnitForest,
    item_types: Vec<SpecItemType>,
}

/// Drives one report run for a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    options: SpecReportOptions,
}

impl ReportAssembler {
    pub fn new(options: SpecReportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SpecReportOptions {
        &self.options
    }

    /// Generate every enabled report.
    ///
    /// Source and sink failures abort the run. Hierarchy defects (cycles,
    /// dangling keys) skip the affected scope and land in the report.
    pub fn run<S, W>(&self, source: &S, sink: &W) -> Result<ReportRun, ReportError>
    where
        S: InventorySource + ?Sized,
        W: WorkbookSink + ?Sized,
    {
        let scope = self.options.scope;
        let ctx = SpecRunContext {
            source,
            sink,
            forest_regional: if scope.needs_regional() {
                load_forest(
                    source,
                    &[
                        EnumUnitKind::Province,
                        EnumUnitKind::ProvinceSubunit,
                        EnumUnitKind::District,
                        EnumUnitKind::SubDistrictPost,
                    ],
                )?
            } else {
                UnitForest::default()
            },
            forest_headquarters: if scope.if_alternate_hierarchy {
                load_forest(source, &[EnumUnitKind::HeadquartersUnit])?
            } else {
                UnitForest::default()
            },
            item_types: source.load_item_types()?,
        };
        info!(
            "loaded {} regional units, {} headquarters units, {} item types",
            ctx.forest_regional.len(),
            ctx.forest_headquarters.len(),
            ctx.item_types.len()
        );

        let l_tasks = self.plan_tasks(&ctx);
        let n_workers = calculate_worker_limit(self.options.num_workers_max);
        let mut builder_run = ReportRunBuilder::default();
        for c_warning in derive_orphan_warnings(&ctx.forest_regional) {
            warn!("{c_warning}");
            builder_run.add_warning(c_warning);
        }

        let l_results = if n_workers <= 1 || l_tasks.len() <= 1 {
            self.run_tasks_serial(&ctx, &l_tasks)
        } else {
            match ThreadPoolBuilder::new().num_threads(n_workers).build() {
                Ok(thread_pool) => thread_pool.install(|| {
                    l_tasks
                        .par_iter()
                        .map(|task| self.run_task(&ctx, *task))
                        .collect::<Vec<_>>()
                }),
                Err(e) => {
                    let c_warning = format!(
                        "thread pool init failed (workers={n_workers}); running serially: {e}"
                    );
                    warn!("{c_warning}");
                    builder_run.add_warning(c_warning);
                    self.run_tasks_serial(&ctx, &l_tasks)
                }
            }
        };

        for res_task in l_results {
            builder_run.absorb(res_task?);
        }

        let report = builder_run.build();
        info!("{report}");
        Ok(report)
    }

    fn plan_tasks<S: ?Sized, W: ?Sized>(
        &self,
        ctx: &SpecRunContext<'_, S, W>,
    ) -> Vec<EnumScopeTask> {
        let scope = self.options.scope;
        let mut l_tasks = Vec::new();
        if scope.needs_regional() {
            l_tasks.extend(
                ctx.forest_regional
                    .units_of_kind(EnumUnitKind::Province)
                    .into_iter()
                    .map(|u| EnumScopeTask::Province(u.key)),
            );
        }
        if scope.if_alternate_hierarchy {
            l_tasks.extend(
                ctx.forest_headquarters
                    .units_of_kind(EnumUnitKind::HeadquartersUnit)
                    .into_iter()
                    .map(|u| EnumScopeTask::Headquarters(u.key)),
            );
        }
        l_tasks
    }

    fn run_tasks_serial<S, W>(
        &self,
        ctx: &SpecRunContext<'_, S, W>,
        l_tasks: &[EnumScopeTask],
    ) -> Vec<Result<ReportRunBuilder, ReportError>>
    where
        S: InventorySource + ?Sized,
        W: WorkbookSink + ?Sized,
    {
        let mut l_results = Vec::with_capacity(l_tasks.len());
        for task in l_tasks {
            let res_task = self.run_task(ctx, *task);
            let if_fatal = res_task.is_err();
            l_results.push(res_task);
            if if_fatal {
                break;
            }
        }
        l_results
    }

    /// Run one scope, converting hierarchy defects into a recorded scope error.
    fn run_task<S, W>(
        &self,
        ctx: &SpecRunContext<'_, S, W>,
        task: EnumScopeTask,
    ) -> Result<ReportRunBuilder, ReportError>
    where
        S: InventorySource + ?Sized,
        W: WorkbookSink + ?Sized,
    {
        let mut builder = ReportRunBuilder::default();
        builder.add_scope();

        let res_scope = match task {
            EnumScopeTask::Province(key) => self.run_province(ctx, key, &mut builder),
            EnumScopeTask::Headquarters(key) => self.run_headquarters(ctx, key, &mut builder),
        };

        match res_scope {
            Ok(()) => Ok(builder),
            Err(e @ (ReportError::HierarchyCycle { .. } | ReportError::UnknownUnit(_))) => {
                error!("skipping scope {}: {e}", task.key());
                let mut builder_skipped = ReportRunBuilder::default();
                builder_skipped.add_scope();
                builder_skipped.warnings = builder.warnings;
                builder_skipped.add_error(task.key().to_string(), e.to_string());
                Ok(builder_skipped)
            }
            Err(e) => Err(e),
        }
    }

    fn run_province<S, W>(
        &self,
        ctx: &SpecRunContext<'_, S, W>,
        key: SpecUnitKey,
        builder: &mut ReportRunBuilder,
    ) -> Result<(), ReportError>
    where
        S: InventorySource + ?Sized,
        W: WorkbookSink + ?Sized,
    {
        let scope = self.options.scope;
        let forest = &ctx.forest_regional;
        let province = forest.get(&key).ok_or(ReportError::UnknownUnit(key))?;
        let c_province = sanitize_file_name(&province.name);
        let path_dir_province = PathBuf::from(format!("{C_PREFIX_PROVINCE}{c_province}"));
        let l_districts = forest.children_of_kind(&key, EnumUnitKind::District);
        info!(
            "province `{}`: {} districts",
            province.name,
            l_districts.len()
        );

        // Single-file district sheets always carry their posts as column blocks.
        let if_fold_posts = self.options.if_single_file_per_scope;
        let if_post_workbooks =
            scope.if_leaf_level && !(self.options.if_single_file_per_scope && scope.if_mid_level);

        // Plan the whole scope before writing so a hierarchy defect leaves no partial output.
        let mut l_plans: Vec<SpecWorkbookPlan> = Vec::new();

        if scope.if_top_level || scope.if_mid_level {
            let mut l_sheets = Vec::new();
            if scope.if_top_level {
                let l_subunits = forest.children_of_kind(&key, EnumUnitKind::ProvinceSubunit);
                let c_sheet = format!("{C_PREFIX_PROVINCE}{}", province.name);
                self.push_sheet(
                    ctx,
                    &l_subunits,
                    EnumSheetShape::Wide,
                    &c_sheet,
                    builder,
                    &mut l_sheets,
                )?;
            }
            if scope.if_mid_level {
                for district in &l_districts {
                    if if_fold_posts {
                        let mut l_units = vec![*district];
                        l_units.extend(derive_descendants(&district.key, forest)?);
                        self.push_sheet(
                            ctx,
                            &l_units,
                            EnumSheetShape::Wide,
                            &district.name,
                            builder,
                            &mut l_sheets,
                        )?;
                    } else {
                        self.push_sheet(
                            ctx,
                            &[*district],
                            EnumSheetShape::Single,
                            &district.name,
                            builder,
                            &mut l_sheets,
                        )?;
                    }
                }
            }
            l_plans.push(SpecWorkbookPlan {
                path_relative: path_dir_province.join(format!(
                    "{C_FILE_PREFIX_PROVINCE}{c_province}.{C_EXT_WORKBOOK}"
                )),
                sheets: l_sheets,
            });
        }

        if if_post_workbooks {
            let path_dir_posts =
                path_dir_province.join(format!("{C_DIR_PREFIX_POSTS}{c_province}"));
            for district in &l_districts {
                let mut l_sheets = Vec::new();
                for post in derive_descendants(&district.key, forest)? {
                    self.push_sheet(
                        ctx,
                        &[post],
                        EnumSheetShape::Single,
                        &post.name,
                        builder,
                        &mut l_sheets,
                    )?;
                }
                l_plans.push(SpecWorkbookPlan {
                    path_relative: path_dir_posts.join(format!(
                        "{C_FILE_PREFIX_POSTS}{}.{C_EXT_WORKBOOK}",
                        sanitize_file_name(&district.name)
                    )),
                    sheets: l_sheets,
                });
            }
        }

        for plan in &l_plans {
            write_plan(ctx.sink, plan, builder)?;
        }
        Ok(())
    }

    fn run_headquarters<S, W>(
        &self,
        ctx: &SpecRunContext<'_, S, W>,
        key: SpecUnitKey,
        builder: &mut ReportRunBuilder,
    ) -> Result<(), ReportError>
    where
        S: InventorySource + ?Sized,
        W: WorkbookSink + ?Sized,
    {
        let forest = &ctx.forest_headquarters;
        let unit = forest.get(&key).ok_or(ReportError::UnknownUnit(key))?;

        let chain = derive_ancestor_chain(&key, forest)?;
        if let Some(key_missing) = chain.key_missing {
            let c_warning = format!(
                "headquarters unit `{}` ({key}): parent {key_missing} not found; chain truncated",
                unit.name
            );
            warn!("{c_warning}");
            builder.add_warning(c_warning);
        }

        let mut l_units = vec![unit];
        l_units.extend(derive_descendants(&key, forest)?);
        info!(
            "headquarters unit `{}`: {} units in scope",
            unit.name,
            l_units.len()
        );

        let mut l_sheets = Vec::new();
        if self.options.if_single_file_per_scope {
            self.push_sheet(
                ctx,
                &l_units,
                EnumSheetShape::Wide,
                &unit.name,
                builder,
                &mut l_sheets,
            )?;
        } else {
            for unit_sheet in &l_units {
                self.push_sheet(
                    ctx,
                    &[*unit_sheet],
                    EnumSheetShape::Single,
                    &unit_sheet.name,
                    builder,
                    &mut l_sheets,
                )?;
            }
        }

        let plan = SpecWorkbookPlan {
            path_relative: PathBuf::from(C_DIR_HEADQUARTERS).join(format!(
                "{}.{C_EXT_WORKBOOK}",
                sanitize_file_name(&chain.join(C_SEP_ANCESTOR_CHAIN))
            )),
            sheets: l_sheets,
        };
        write_plan(ctx.sink, &plan, builder)
    }

    /// Fetch, pivot, and compose one sheet; apply the empty-sheet policy.
    fn push_sheet<S, W>(
        &self,
        ctx: &SpecRunContext<'_, S, W>,
        units: &[&SpecUnit],
        shape: EnumSheetShape,
        name: &str,
        builder: &mut ReportRunBuilder,
        l_sheets: &mut Vec<SpecSheetLayout>,
    ) -> Result<(), ReportError>
    where
        S: InventorySource + ?Sized,
        W: WorkbookSink + ?Sized,
    {
        let l_keys: Vec<SpecUnitKey> = units.iter().map(|u| u.key).collect();
        let mut l_rows = Vec::new();
        for count_scope in SpecCountScope::partition(&l_keys) {
            l_rows.extend(ctx.source.fetch_counts(&count_scope)?);
        }

        let grid = build_report_grid(&ctx.item_types, units, &l_rows);
        if self.options.if_suppress_empty_sheets && grid.is_all_zero() {
            debug!("sheet `{name}`: all counts zero, skipped");
            builder.add_skipped_sheet();
            return Ok(());
        }

        let layout = compose_sheet(&grid, shape, &self.options.labels, &sanitize_sheet_name(name))?;
        debug!(
            "sheet `{}`: {} units x {} items",
            layout.sheet_name,
            grid.units.len(),
            grid.n_items()
        );
        l_sheets.push(layout);
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Helpers

fn load_forest<S: InventorySource + ?Sized>(
    source: &S,
    kinds: &[EnumUnitKind],
) -> Result<UnitForest, ReportError> {
    let mut l_units = Vec::new();
    for kind in kinds {
        let l_units_kind = source.load_units(*kind)?;
        debug!("loaded {} units from `{kind}`", l_units_kind.len());
        l_units.extend(l_units_kind);
    }
    Ok(UnitForest::from_units(l_units))
}

/// Regional units whose parent is absent never fall under a province scope.
fn derive_orphan_warnings(forest: &UnitForest) -> Vec<String> {
    let mut l_warnings = Vec::new();
    for kind in [
        EnumUnitKind::ProvinceSubunit,
        EnumUnitKind::District,
        EnumUnitKind::SubDistrictPost,
    ] {
        for unit in forest.roots_of_kind(kind) {
            let c_parent = unit
                .parent
                .map(|key| key.to_string())
                .unwrap_or_else(|| "none".to_string());
            l_warnings.push(format!(
                "{kind} unit `{}` ({}): parent {c_parent} not found; left out of every report",
                unit.name, unit.key
            ));
        }
    }
    l_warnings
}

fn write_plan<W: WorkbookSink + ?Sized>(
    sink: &W,
    plan: &SpecWorkbookPlan,
    builder: &mut ReportRunBuilder,
) -> Result<(), ReportError> {
    if plan.sheets.is_empty() {
        debug!("workbook `{}`: no sheets, not written", plan.path_relative.display());
        return Ok(());
    }
    sink.write_workbook(plan)?;
    info!(
        "wrote `{}` ({} sheets)",
        plan.path_relative.display(),
        plan.sheets.len()
    );
    builder.add_workbook(plan.sheets.len());
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;
    use crate::spec::{SpecConditionCount, SpecScopeSelection};
    use crate::spec::EnumUnitKind::{
        District, HeadquartersUnit, Province, ProvinceSubunit, SubDistrictPost,
    };

    #[derive(Default)]
    struct MemorySource {
        l_units: Vec<SpecUnit>,
        l_items: Vec<SpecItemType>,
        l_rows: Vec<SpecCountRow>,
        if_fail_counts: bool,
    }

    impl InventorySource for MemorySource {
        fn load_units(&self, kind: EnumUnitKind) -> Result<Vec<SpecUnit>, ReportError> {
            Ok(self.l_units.iter().filter(|u| u.key.kind == kind).cloned().collect())
        }

        fn load_item_types(&self) -> Result<Vec<SpecItemType>, ReportError> {
            Ok(self.l_items.clone())
        }

        fn fetch_counts(&self, scope: &SpecCountScope) -> Result<Vec<SpecCountRow>, ReportError> {
            if self.if_fail_counts {
                return Err(ReportError::Source("connection reset".to_string()));
            }
            Ok(self
                .l_rows
                .iter()
                .filter(|r| {
                    r.owner.kind == scope.owner_kind && scope.owner_ids.contains(&r.owner.id)
                })
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        l_plans: Mutex<Vec<SpecWorkbookPlan>>,
    }

    impl WorkbookSink for MemorySink {
        fn write_workbook(&self, plan: &SpecWorkbookPlan) -> Result<(), ReportError> {
            self.l_plans
                .lock()
                .map_err(|e| ReportError::Write(e.to_string()))?
                .push(plan.clone());
            Ok(())
        }
    }

    impl MemorySink {
        fn plans(&self) -> Vec<SpecWorkbookPlan> {
            let mut l_plans = self.l_plans.lock().expect("lock").clone();
            l_plans.sort_by(|a, b| a.path_relative.cmp(&b.path_relative));
            l_plans
        }

        fn plan(&self, path: &str) -> SpecWorkbookPlan {
            self.plans()
                .into_iter()
                .find(|p| p.path_relative == Path::new(path))
                .unwrap_or_else(|| panic!("no plan for {path}"))
        }
    }

    fn item(id: i64, name: &str, order: i64) -> SpecItemType {
        SpecItemType {
            id,
            name: name.to_string(),
            order,
            group_id: 1,
            group_name: "Senjata".to_string(),
            if_deleted: false,
        }
    }

    fn count(item_type_id: i64, kind: EnumUnitKind, id: i64, good: u64) -> SpecCountRow {
        SpecCountRow {
            item_type_id,
            owner: SpecUnitKey::new(kind, id),
            counts: SpecConditionCount::new(good, 0, 0),
        }
    }

    fn regional_source() -> MemorySource {
        let key_province = SpecUnitKey::new(Province, 1);
        let key_district = SpecUnitKey::new(District, 1);
        MemorySource {
            l_units: vec![
                SpecUnit::new(Province, 1, "JATIM"),
                SpecUnit::new(ProvinceSubunit, 1, "DITLANTAS").with_parent(key_province),
                SpecUnit::new(ProvinceSubunit, 2, "BIDHUMAS").with_parent(key_province),
                SpecUnit::new(District, 1, "POLRES MALANG").with_parent(key_province),
                SpecUnit::new(SubDistrictPost, 1, "POLSEK KLOJEN").with_parent(key_district),
                SpecUnit::new(SubDistrictPost, 2, "POLSEK BLIMBING").with_parent(key_district),
            ],
            l_items: vec![item(10, "Pistol", 1), item(11, "Radio", 2)],
            l_rows: vec![
                count(10, ProvinceSubunit, 1, 4),
                count(10, District, 1, 2),
                count(11, SubDistrictPost, 1, 1),
            ],
            ..MemorySource::default()
        }
    }

    fn options(scope: SpecScopeSelection, if_single_file: bool) -> SpecReportOptions {
        SpecReportOptions {
            scope,
            if_single_file_per_scope: if_single_file,
            ..SpecReportOptions::default()
        }
    }

    const C_PATH_POSTS_MALANG: &str =
        "POLDA JATIM/Jajaran Polsek POLDA JATIM/Inventaris_Polsek_POLRES MALANG.xlsx";

    fn sheet_names(plan: &SpecWorkbookPlan) -> Vec<&str> {
        plan.sheets.iter().map(|s| s.sheet_name.as_str()).collect()
    }

    fn header_names(sheet: &SpecSheetLayout) -> Vec<String> {
        sheet.rows[0]
            .iter()
            .map(|c| c.to_display())
            .filter(|c| !c.is_empty())
            .collect()
    }

    #[test]
    fn province_single_file_folds_posts_into_district_sheet() {
        let source = regional_source();
        let sink = MemorySink::default();
        let scope = SpecScopeSelection::from_flags(true, true, true, false);
        let report = ReportAssembler::new(options(scope, true))
            .run(&source, &sink)
            .expect("run");

        let l_plans = sink.plans();
        assert_eq!(l_plans.len(), 1);
        let plan = sink.plan("POLDA JATIM/Inventaris_POLDA_JATIM.xlsx");
        assert_eq!(sheet_names(&plan), vec!["POLDA JATIM", "POLRES MALANG"]);

        let sheet_top = &plan.sheets[0];
        assert_eq!(sheet_top.rows[0][2].to_display(), "BIDHUMAS");
        assert_eq!(sheet_top.rows[0][6].to_display(), "DITLANTAS");

        let sheet_district = &plan.sheets[1];
        assert_eq!(sheet_district.shape, EnumSheetShape::Wide);
        assert_eq!(
            header_names(sheet_district),
            vec![
                "No.",
                "Jenis Materil",
                "POLRES MALANG",
                "POLSEK BLIMBING",
                "POLSEK KLOJEN"
            ]
        );

        assert_eq!(report.cnt_scopes, 1);
        assert_eq!(report.cnt_workbooks, 1);
        assert_eq!(report.cnt_sheets, 2);
        assert_eq!(report.error_count(), 0);
    }

    #[test]
    fn mid_only_single_file_keeps_post_columns_in_district_sheet() {
        let source = regional_source();
        let sink = MemorySink::default();
        let scope = SpecScopeSelection::from_flags(false, true, false, false);
        let report = ReportAssembler::new(options(scope, true))
            .run(&source, &sink)
            .expect("run");

        let l_plans = sink.plans();
        assert_eq!(l_plans.len(), 1);
        let plan = sink.plan("POLDA JATIM/Inventaris_POLDA_JATIM.xlsx");
        assert_eq!(sheet_names(&plan), vec!["POLRES MALANG"]);

        let sheet_district = &plan.sheets[0];
        assert_eq!(sheet_district.shape, EnumSheetShape::Wide);
        assert_eq!(sheet_district.n_cols, 2 + 4 * 3);
        assert_eq!(
            header_names(sheet_district),
            vec![
                "No.",
                "Jenis Materil",
                "POLRES MALANG",
                "POLSEK BLIMBING",
                "POLSEK KLOJEN"
            ]
        );
        assert_eq!(report.cnt_sheets, 1);
    }

    #[test]
    fn regional_units_without_parent_are_warned() {
        let mut source = regional_source();
        source.l_units.push(
            SpecUnit::new(District, 2, "POLRES HILANG").with_parent(SpecUnitKey::new(Province, 9)),
        );
        source.l_units.push(SpecUnit::new(SubDistrictPost, 3, "POLSEK LEPAS"));
        let sink = MemorySink::default();
        let report = ReportAssembler::new(SpecReportOptions::default())
            .run(&source, &sink)
            .expect("run");

        assert_eq!(report.warning_count(), 2);
        assert!(report.warnings[0].contains("POLRES HILANG"));
        assert!(report.warnings[0].contains("polda#9"));
        assert!(report.warnings[1].contains("POLSEK LEPAS"));
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.cnt_scopes, 1);
    }

    #[test]
    fn split_files_writes_post_workbooks() {
        let source = regional_source();
        let sink = MemorySink::default();
        let scope = SpecScopeSelection::from_flags(true, true, true, false);
        let report = ReportAssembler::new(options(scope, false))
            .run(&source, &sink)
            .expect("run");

        let plan_province = sink.plan("POLDA JATIM/Inventaris_POLDA_JATIM.xlsx");
        assert_eq!(plan_province.sheets[1].shape, EnumSheetShape::Single);
        assert_eq!(plan_province.sheets[1].n_cols, 6);

        let plan_posts = sink.plan(C_PATH_POSTS_MALANG);
        assert_eq!(sheet_names(&plan_posts), vec!["POLSEK BLIMBING", "POLSEK KLOJEN"]);
        assert_eq!(report.cnt_workbooks, 2);
        assert_eq!(report.cnt_sheets, 4);
    }

    #[test]
    fn leaf_only_still_writes_post_workbooks() {
        let source = regional_source();
        let sink = MemorySink::default();
        let scope = SpecScopeSelection::from_flags(false, false, true, false);
        ReportAssembler::new(options(scope, true))
            .run(&source, &sink)
            .expect("run");

        let l_paths: Vec<PathBuf> = sink.plans().into_iter().map(|p| p.path_relative).collect();
        assert_eq!(
            l_paths,
            vec![PathBuf::from(C_PATH_POSTS_MALANG)]
        );
    }

    #[test]
    fn suppress_empty_sheets_and_never_write_empty_workbooks() {
        let mut source = regional_source();
        source.l_rows = vec![count(10, District, 1, 2)];
        let sink = MemorySink::default();
        let mut opts = options(SpecScopeSelection::from_flags(true, true, true, false), false);
        opts.if_suppress_empty_sheets = true;
        let report = ReportAssembler::new(opts).run(&source, &sink).expect("run");

        let l_plans = sink.plans();
        assert_eq!(l_plans.len(), 1);
        assert_eq!(sheet_names(&l_plans[0]), vec!["POLRES MALANG"]);
        // Top sheet plus two posts dropped.
        assert_eq!(report.cnt_sheets_skipped, 3);
    }

    #[test]
    fn empty_sheets_emitted_by_default() {
        let mut source = regional_source();
        source.l_rows.clear();
        source.l_items.clear();
        let sink = MemorySink::default();
        let scope = SpecScopeSelection::from_flags(true, false, false, false);
        let report = ReportAssembler::new(options(scope, true))
            .run(&source, &sink)
            .expect("run");
        assert_eq!(report.cnt_sheets, 1);
        let plan = sink.plan("POLDA JATIM/Inventaris_POLDA_JATIM.xlsx");
        assert_eq!(plan.sheets[0].body_rows().count(), 0);
    }

    fn headquarters_source() -> MemorySource {
        let key_root = SpecUnitKey::new(HeadquartersUnit, 1);
        let key_child = SpecUnitKey::new(HeadquartersUnit, 2);
        MemorySource {
            l_units: vec![
                SpecUnit::new(HeadquartersUnit, 1, "BARESKRIM").with_level(1),
                SpecUnit::new(HeadquartersUnit, 2, "DIT TIPIDUM")
                    .with_parent(key_root)
                    .with_level(2),
                SpecUnit::new(HeadquartersUnit, 3, "SUBDIT I").with_parent(key_child).with_level(3),
                SpecUnit::new(HeadquartersUnit, 4, "LOST UNIT")
                    .with_parent(SpecUnitKey::new(HeadquartersUnit, 99))
                    .with_level(3),
            ],
            l_items: vec![item(10, "Pistol", 1)],
            l_rows: vec![count(10, HeadquartersUnit, 3, 5), count(10, Province, 3, 7)],
            ..MemorySource::default()
        }
    }

    #[test]
    fn headquarters_workbooks_named_by_ancestor_chain() {
        let source = headquarters_source();
        let sink = MemorySink::default();
        let mut opts = options(SpecScopeSelection::from_flags(false, false, false, true), true);
        opts.num_workers_max = Some(4);
        let report = ReportAssembler::new(opts).run(&source, &sink).expect("run");

        let l_paths: Vec<String> = sink
            .plans()
            .iter()
            .map(|p| p.path_relative.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            l_paths,
            vec![
                "satker_mabes/BARESKRIM.xlsx",
                "satker_mabes/BARESKRIM_DIT TIPIDUM.xlsx",
                "satker_mabes/BARESKRIM_DIT TIPIDUM_SUBDIT I.xlsx",
                "satker_mabes/LOST UNIT.xlsx",
            ]
        );

        let plan_root = sink.plan("satker_mabes/BARESKRIM.xlsx");
        let sheet = &plan_root.sheets[0];
        assert_eq!(sheet.n_cols, 2 + 4 * 3);
        // Only the headquarters-owned 5 is counted, never the province row sharing id 3.
        assert_eq!(sheet.rows[3][10].to_display(), "5");
        assert_eq!(sheet.rows[3][13].to_display(), "5");

        assert_eq!(report.cnt_scopes, 4);
        assert_eq!(report.warning_count(), 1);
        assert!(report.warnings[0].contains("LOST UNIT"));
    }

    #[test]
    fn headquarters_split_writes_one_sheet_per_unit() {
        let source = headquarters_source();
        let sink = MemorySink::default();
        let scope = SpecScopeSelection::from_flags(false, false, false, true);
        ReportAssembler::new(options(scope, false))
            .run(&source, &sink)
            .expect("run");
        let plan = sink.plan("satker_mabes/BARESKRIM.xlsx");
        assert_eq!(sheet_names(&plan), vec!["BARESKRIM", "DIT TIPIDUM", "SUBDIT I"]);
        assert!(plan.sheets.iter().all(|s| s.shape == EnumSheetShape::Single));
    }

    #[test]
    fn cycle_skips_scope_and_is_recorded() {
        let source = MemorySource {
            l_units: vec![
                SpecUnit::new(HeadquartersUnit, 1, "A")
                    .with_parent(SpecUnitKey::new(HeadquartersUnit, 2)),
                SpecUnit::new(HeadquartersUnit, 2, "B")
                    .with_parent(SpecUnitKey::new(HeadquartersUnit, 1)),
                SpecUnit::new(HeadquartersUnit, 3, "OK"),
            ],
            l_items: vec![item(10, "Pistol", 1)],
            ..MemorySource::default()
        };
        let sink = MemorySink::default();
        let scope = SpecScopeSelection::from_flags(false, false, false, true);
        let report = ReportAssembler::new(options(scope, true))
            .run(&source, &sink)
            .expect("run");

        assert_eq!(report.cnt_scopes, 3);
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.errors[0].scope, "satker_mabes#1");
        assert_eq!(sink.plans().len(), 1);
        assert_eq!(sink.plans()[0].path_relative, PathBuf::from("satker_mabes/OK.xlsx"));
    }

    #[test]
    fn source_failure_aborts_run() {
        let mut source = regional_source();
        source.if_fail_counts = true;
        let sink = MemorySink::default();
        let res = ReportAssembler::new(SpecReportOptions::default()).run(&source, &sink);
        assert!(matches!(res, Err(ReportError::Source(_))));
        assert!(sink.plans().is_empty());
    }
}
