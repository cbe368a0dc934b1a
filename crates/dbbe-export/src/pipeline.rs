//! The step driver.

use std::{collections::BTreeSet, time::Instant};

use dbbe_core::{
  document::Document,
  fuzzy_date::FuzzyDate,
  source::{Collection, DocumentStore, RelationalSource},
};
use dbbe_store_sqlite::OutputStore;
use serde::de::DeserializeOwned;
use tracing::{Instrument as _, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  hierarchy::HierarchyWalker,
  migrate::Identified,
  step::{RunReport, Step, StepReport},
};

/// Knobs of one run. See [`Settings`](crate::Settings) for their sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
  pub batch_size:           usize,
  /// Drop private comments and non-public types.
  pub public_release:       bool,
  pub max_hierarchy_depth:  usize,
  pub page_size:            usize,
  pub occurrence_page_size: usize,
  pub multi_get_chunk:      usize,
}

impl Default for PipelineOptions {
  fn default() -> Self {
    Self {
      batch_size:           1000,
      public_release:       false,
      max_hierarchy_depth:  64,
      page_size:            1000,
      occurrence_page_size: 500,
      multi_get_chunk:      500,
    }
  }
}

/// Reconciles the two sources into an [`OutputStore`].
pub struct Pipeline<D, R> {
  pub(crate) documents:  D,
  pub(crate) relational: R,
  pub(crate) store:      OutputStore,
  pub(crate) options:    PipelineOptions,
  pub(crate) hierarchy:  HierarchyWalker,
  /// Non-public type ids, read once per pipeline under `public_release`.
  pub(crate) withheld:   Option<BTreeSet<i64>>,
}

impl<D: DocumentStore, R: RelationalSource> Pipeline<D, R> {
  pub fn new(documents: D, relational: R, store: OutputStore, options: PipelineOptions) -> Self {
    Self {
      documents,
      relational,
      store,
      hierarchy: HierarchyWalker::new(options.max_hierarchy_depth),
      withheld: None,
      options,
    }
  }

  pub fn store(&self) -> &OutputStore { &self.store }

  /// Runs every step in order. The first failing step aborts the run; rows
  /// committed by earlier batches stay in the store.
  pub async fn run(&mut self) -> Result<RunReport> {
    let run_id = Uuid::new_v4();
    let span = info_span!("export", %run_id);
    self.run_steps(Step::all()).instrument(span).await
  }

  pub async fn run_steps(&mut self, steps: impl IntoIterator<Item = Step>) -> Result<RunReport> {
    let total = Step::count();
    let mut report = RunReport::default();

    for step in steps {
      info!("step {}/{total} {step}", step as usize + 1);
      let started = Instant::now();

      let step_report = self.run_step(step).await.map_err(|e| {
        error!(%step, error = %e, "step failed");
        Error::StepFailed {
          step,
          source: Box::new(e),
        }
      })?;

      info!(
        %step,
        written = step_report.written,
        skipped_edges = step_report.skipped_edges,
        warnings = step_report.warnings,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "step finished"
      );
      report.steps.push(step_report);
    }

    info!(
      skipped_edges = report.skipped_edges(),
      warnings = report.warnings(),
      chains = self.hierarchy.cached(),
      "export finished"
    );
    Ok(report)
  }

  pub async fn run_step(&mut self, step: Step) -> Result<StepReport> {
    match step {
      Step::Schema => self.create_schema().await,
      Step::Verse => self.migrate_verses().await,
      Step::Person => self.migrate_persons().await,
      Step::Manuscript => self.migrate_manuscripts().await,
      Step::Bibliography => self.migrate_bibliographies().await,
      Step::Occurrence => self.migrate_occurrences().await,
      Step::Type => self.migrate_types().await,
      Step::Cleanup => self.cleanup().await,
    }
  }

  async fn create_schema(&mut self) -> Result<StepReport> {
    self.store.init_schema().await?;
    Ok(StepReport::new(Step::Schema))
  }

  async fn cleanup(&mut self) -> Result<StepReport> {
    let mut report = StepReport::new(Step::Cleanup);
    let pruned = self.store.prune_empty_columns().await?;
    report.written = pruned.len();
    self.store.checkpoint().await?;
    Ok(report)
  }

  // ── Shared helpers for the migrators ──────────────────────────────────────

  /// Reads a whole collection and parses each document, keyed by entity id.
  ///
  /// Documents that do not parse or carry no id are reported and left out.
  pub(crate) async fn read_collection<T>(
    &self,
    collection: Collection,
    page_size: usize,
    report: &mut StepReport,
  ) -> Result<Vec<(i64, T)>>
  where
    T: DeserializeOwned + Identified,
  {
    let documents = self
      .documents
      .scroll_all(collection, page_size)
      .await
      .map_err(Error::upstream)?;
    info!(%collection, documents = documents.len(), "read collection");
    Ok(parse_documents(&documents, report))
  }

  pub(crate) fn private(&self, comment: Option<String>) -> Option<String> {
    if self.options.public_release { None } else { comment }
  }

  /// For steps whose rows reference entities written by later steps.
  pub(crate) async fn disable_foreign_keys(&self, step: Step) -> Result<()> {
    warn!(%step, "foreign keys disabled");
    self.store.set_foreign_keys(false).await?;
    Ok(())
  }

  /// Turns enforcement back on whether or not the step succeeded.
  pub(crate) async fn restore_foreign_keys<T>(&self, result: Result<T>) -> Result<T> {
    let restored = self.store.set_foreign_keys(true).await;
    let value = result?;
    restored?;
    Ok(value)
  }
}

pub(crate) fn parse_documents<T>(documents: &[Document], report: &mut StepReport) -> Vec<(i64, T)>
where
  T: DeserializeOwned + Identified,
{
  let mut parsed = Vec::with_capacity(documents.len());
  for document in documents {
    let doc: T = match document.parse() {
      Ok(doc) => doc,
      Err(e) => {
        warn!(step = %report.step, error = %e, "skipping malformed document");
        report.warnings += 1;
        continue;
      }
    };
    match doc.id().or_else(|| document.id.trim().parse().ok()) {
      Some(id) => parsed.push((id, doc)),
      None => {
        warn!(step = %report.step, document = %document.id, "skipping document without an id");
        report.warnings += 1;
      }
    }
  }
  parsed
}

/// Parses a fuzzy date, reporting and discarding values that do not parse.
pub(crate) fn fuzzy_date(raw: Option<&str>, entity: i64, report: &mut StepReport) -> FuzzyDate {
  FuzzyDate::parse_opt(raw).unwrap_or_else(|e| {
    warn!(step = %report.step, entity, error = %e, "discarding unreadable date");
    report.warnings += 1;
    FuzzyDate::default()
  })
}
