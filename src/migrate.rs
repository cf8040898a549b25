//! Migration orchestrator.
//!
//! One run is a single sequential pass:
//!
//! 1. List every legacy asset of the configured type. Failure aborts the run.
//! 2. For each asset, resolve its media-library mapping. Unmappable assets are
//!    logged and recorded as [`SkippedAsset`]s.
//! 3. Fetch documents referencing the asset (published and draft id) and plan
//!    the `asset`/`media` replacements for each.
//! 4. Check the pairing rule over all planned operations, then hand them to
//!    the executor once, in preview or apply mode.
//!
//! Nothing is written until every asset has been visited, so a dry run and a
//! real run plan exactly the same operations.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use media_relink_core::execute::{execute_with_progress, ExecutionMode, ExecutionReport};
use media_relink_core::models::LegacyAsset;
use media_relink_core::plan::{check_pairing, OperationKind, PatchOperation, Planner};
use media_relink_core::reference::{canonical_id, is_draft_id, reference_targets};
use media_relink_core::resolve::{resolve_asset, Resolution};
use media_relink_core::store::{DocumentStore, MediaRegistry};

use crate::config::{Config, MigrationConfig, RunSettings};
use crate::content_lake::ContentLakeClient;
use crate::media_library::MediaLibraryClient;
use crate::progress::{MigrationProgressEvent, MigrationProgressReporter, ProgressMode};
use crate::report;

/// Skip code for a registry query that errored (as opposed to returning nothing).
pub const QUERY_FAILED: &str = "query_failed";
/// Skip code for a failed referencing-documents query.
pub const DISCOVERY_FAILED: &str = "discovery_failed";

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub legacy_asset_type: String,
    pub planner: Planner,
    pub mode: ExecutionMode,
}

impl MigrationOptions {
    pub fn new(config: &MigrationConfig, dry_run: bool) -> Self {
        Self {
            legacy_asset_type: config.legacy_asset_type.clone(),
            planner: Planner::new(&config.field, &config.sibling_field),
            mode: if dry_run {
                ExecutionMode::Preview
            } else {
                ExecutionMode::Apply
            },
        }
    }
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self::new(&MigrationConfig::default(), true)
    }
}

/// A legacy asset left untouched by this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAsset {
    pub asset_id: String,
    /// Stable code: `no_mapping`, `malformed_token`, `registry_lookup_failed`,
    /// `query_failed` or `discovery_failed`.
    pub code: String,
    pub reason: String,
}

impl SkippedAsset {
    fn new(asset: &LegacyAsset, code: &str, reason: String) -> Self {
        Self {
            asset_id: asset.id.clone(),
            code: code.to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub assets_scanned: usize,
    pub assets_resolved: usize,
    pub assets_skipped: usize,
    pub total_operations: usize,
    pub documents_touched: usize,
    pub asset_operations: usize,
    pub media_operations: usize,
    pub documents_applied: usize,
    pub documents_failed: usize,
}

impl MigrationSummary {
    fn tally(&mut self, report: &ExecutionReport) {
        self.total_operations = report.operation_count();
        self.documents_touched = report.documents.len();
        self.asset_operations = report
            .documents
            .iter()
            .map(|d| d.count(OperationKind::Asset))
            .sum();
        self.media_operations = report
            .documents
            .iter()
            .map(|d| d.count(OperationKind::Media))
            .sum();
        self.documents_applied = report.applied.len();
        self.documents_failed = report.failed.len();
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationRun {
    pub summary: MigrationSummary,
    pub skipped: Vec<SkippedAsset>,
    pub report: ExecutionReport,
}

/// Collapse a draft and its published asset into one entry. The record that
/// carries a `media` value wins; when both or neither do, the published one
/// does. References to either id are found through the canonical id, so
/// processing both would plan every change twice.
fn merge_drafts(assets: Vec<LegacyAsset>) -> Vec<LegacyAsset> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<LegacyAsset> = Vec::new();
    for asset in assets {
        let canonical = canonical_id(&asset.id).to_string();
        match index.get(&canonical) {
            Some(&i) => {
                if prefer(&asset, &merged[i]) {
                    merged[i] = asset;
                }
            }
            None => {
                index.insert(canonical, merged.len());
                merged.push(asset);
            }
        }
    }
    merged
}

/// Whether `candidate` should replace `current` for the same canonical id.
fn prefer(candidate: &LegacyAsset, current: &LegacyAsset) -> bool {
    match (candidate.media.is_some(), current.media.is_some()) {
        (true, false) => true,
        (false, true) => false,
        _ => is_draft_id(&current.id) && !is_draft_id(&candidate.id),
    }
}

/// Run one migration pass against `store` and `registry`.
///
/// # Errors
///
/// Fails when the legacy assets cannot be listed or when the planned
/// operations break the asset/media pairing rule. Per-asset and per-document
/// failures are recorded in the returned [`MigrationRun`] instead.
pub async fn run_migration(
    store: &dyn DocumentStore,
    registry: &dyn MediaRegistry,
    options: &MigrationOptions,
    progress: &dyn MigrationProgressReporter,
) -> Result<MigrationRun> {
    let assets = store
        .legacy_assets(&options.legacy_asset_type)
        .await
        .with_context(|| format!("Failed to list {} assets", options.legacy_asset_type))?;
    let assets = merge_drafts(assets);
    info!(
        kind = %options.legacy_asset_type,
        count = assets.len(),
        "found legacy assets"
    );

    let mut summary = MigrationSummary {
        assets_scanned: assets.len(),
        ..Default::default()
    };
    let mut skipped = Vec::new();
    let mut operations: Vec<PatchOperation> = Vec::new();

    let total = assets.len() as u64;
    for (i, asset) in assets.iter().enumerate() {
        progress.report(MigrationProgressEvent::Resolving {
            n: i as u64 + 1,
            total,
        });

        let resolved = match resolve_asset(registry, asset).await {
            Ok(Resolution::Resolved(resolved)) => resolved,
            Ok(Resolution::Unresolved(reason)) => {
                warn!(asset_id = %asset.id, code = reason.code(), %reason, "skipping asset");
                skipped.push(SkippedAsset::new(asset, reason.code(), reason.to_string()));
                continue;
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(asset_id = %asset.id, code = QUERY_FAILED, %reason, "skipping asset");
                skipped.push(SkippedAsset::new(asset, QUERY_FAILED, reason));
                continue;
            }
        };
        summary.assets_resolved += 1;
        debug!(
            asset_id = %asset.id,
            label = asset.label(),
            library_id = %resolved.library_id,
            instance_id = %resolved.instance_id,
            container_id = %resolved.container_id,
            "resolved asset"
        );

        let documents = match store.referencing_documents(&reference_targets(&asset.id)).await {
            Ok(documents) => documents,
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(asset_id = %asset.id, code = DISCOVERY_FAILED, %reason, "skipping asset");
                skipped.push(SkippedAsset::new(asset, DISCOVERY_FAILED, reason));
                continue;
            }
        };

        for document in &documents {
            let planned = options.planner.plan(document, &asset.id, &resolved);
            debug!(
                asset_id = %asset.id,
                document_id = %document.id,
                operations = planned.len(),
                "planned document"
            );
            operations.extend(planned);
        }
    }
    summary.assets_skipped = skipped.len();

    check_pairing(&operations).context("Planned operations are not paired")?;

    let report = execute_with_progress(store, operations, options.mode, |n, total| {
        progress.report(MigrationProgressEvent::Applying {
            n: n as u64,
            total: total as u64,
        })
    })
    .await;
    summary.tally(&report);

    info!(
        operations = summary.total_operations,
        documents = summary.documents_touched,
        skipped = summary.assets_skipped,
        failed = summary.documents_failed,
        "migration pass complete"
    );

    Ok(MigrationRun {
        summary,
        skipped,
        report,
    })
}

/// Build the HTTP clients for `settings`, run one pass and print the result.
pub async fn run_migrate(
    settings: &RunSettings,
    config: &Config,
    progress_mode: ProgressMode,
    json: bool,
) -> Result<()> {
    let store = ContentLakeClient::new(settings, &config.store)?;
    let registry = MediaLibraryClient::new(settings, &config.registry, &config.store)?;
    let options = MigrationOptions::new(&config.migration, settings.dry_run);

    info!(
        project_id = %settings.project_id,
        dataset = %settings.dataset,
        environment = ?settings.environment,
        dry_run = settings.dry_run,
        "starting migration"
    );

    let progress = progress_mode.reporter();
    progress.report(MigrationProgressEvent::Scanning {
        dataset: settings.dataset.clone(),
    });

    let run = run_migration(&store, &registry, &options, progress.as_ref()).await?;

    if json {
        println!("{}", report::render_json(&run)?);
    } else {
        print!("{}", report::render_human(&run, &settings.dataset));
    }
    Ok(())
}
