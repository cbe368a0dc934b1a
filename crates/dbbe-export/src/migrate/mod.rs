//! One migrator per pipeline step.
//!
//! Each migrator is an inherent method on [`Pipeline`](crate::Pipeline)
//! returning the [`StepReport`](crate::StepReport) of its step.

use dbbe_core::document::{
  ManuscriptDoc, OccurrenceDoc, PersonDoc, TypeDoc, TypeVisibilityDoc, VerseDoc,
};

mod bibliography;
mod manuscript;
mod occurrence;
mod person;
mod poem_type;
mod verse;

/// Documents that may carry their entity id in the source body.
pub(crate) trait Identified {
  fn id(&self) -> Option<i64>;
}

macro_rules! identified {
  ($($doc:ty),* $(,)?) => {
    $(impl Identified for $doc {
      fn id(&self) -> Option<i64> { self.id }
    })*
  };
}

identified!(VerseDoc, PersonDoc, ManuscriptDoc, OccurrenceDoc, TypeDoc, TypeVisibilityDoc);
