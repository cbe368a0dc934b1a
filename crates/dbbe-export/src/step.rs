//! Pipeline steps, their reports and batch progress.

use std::fmt;

use dbbe_store_sqlite::BatchReport;
use strum::{Display, EnumIter, IntoEnumIterator as _};
use tracing::info;

/// The steps of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
  Schema,
  Verse,
  Person,
  Manuscript,
  Bibliography,
  Occurrence,
  Type,
  Cleanup,
}

impl Step {
  pub fn all() -> impl Iterator<Item = Self> { Self::iter() }

  pub fn count() -> usize { Self::iter().count() }
}

/// What one step wrote and what it had to leave out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
  pub step:          Step,
  /// Rows written, edges included.
  pub written:       usize,
  /// Edges dropped because an endpoint or its kind was unknown.
  pub skipped_edges: usize,
  /// Data-quality findings that did not stop the step.
  pub warnings:      usize,
}

impl StepReport {
  pub fn new(step: Step) -> Self {
    Self {
      step,
      written: 0,
      skipped_edges: 0,
      warnings: 0,
    }
  }

  pub fn add(&mut self, batch: BatchReport) {
    self.written += batch.written;
    self.skipped_edges += batch.skipped_edges;
  }
}

impl fmt::Display for StepReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}: {} written, {} edges skipped, {} warnings",
      self.step, self.written, self.skipped_edges, self.warnings
    )
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
  pub steps: Vec<StepReport>,
}

impl RunReport {
  pub fn get(&self, step: Step) -> Option<&StepReport> {
    self.steps.iter().find(|s| s.step == step)
  }

  pub fn skipped_edges(&self) -> usize { self.steps.iter().map(|s| s.skipped_edges).sum() }

  pub fn warnings(&self) -> usize { self.steps.iter().map(|s| s.warnings).sum() }
}

// ─── Batching ────────────────────────────────────────────────────────────────

/// Splits `items` into consecutive batches of at most `size`.
pub(crate) fn batches<T>(mut items: Vec<T>, size: usize) -> Vec<Vec<T>> {
  let size = size.max(1);
  let mut out = Vec::with_capacity(items.len().div_ceil(size));
  while items.len() > size {
    let tail = items.split_off(size);
    out.push(std::mem::replace(&mut items, tail));
  }
  if !items.is_empty() {
    out.push(items);
  }
  out
}

/// Logs a line per committed batch with the running total.
pub(crate) struct Progress {
  step:  Step,
  label: &'static str,
  total: usize,
  done:  usize,
}

impl Progress {
  pub fn new(step: Step, label: &'static str, total: usize) -> Self {
    Self {
      step,
      label,
      total,
      done: 0,
    }
  }

  pub fn batch(&mut self, processed: usize, written: BatchReport, report: &mut StepReport) {
    self.done += processed;
    report.add(written);
    info!(
      step = %self.step,
      what = self.label,
      done = self.done,
      total = self.total,
      written = report.written,
      "batch committed"
    );
  }
}
