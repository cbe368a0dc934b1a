//! Fuzzy date ranges as rendered by the relational source.
//!
//! Values look like `[1000-01-01,1099-12-31)`, `(1100,1199)` or `(,0850-12-31]`
//! and may carry quotes or a ` BC` suffix. Only the year of each bound is
//! kept.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A floor/ceiling year pair. Either side may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzyDate {
  pub floor:   Option<i32>,
  pub ceiling: Option<i32>,
}

impl FuzzyDate {
  /// Parses an optional raw value; `None` yields an empty range.
  pub fn parse_opt(raw: Option<&str>) -> Result<Self> {
    match raw {
      Some(raw) => raw.parse(),
      None => Ok(Self::default()),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.floor.is_none() && self.ceiling.is_none()
  }
}

impl FromStr for FuzzyDate {
  type Err = Error;

  fn from_str(raw: &str) -> Result<Self> {
    let inner = raw
      .trim()
      .trim_start_matches(['[', '('])
      .trim_end_matches([']', ')']);
    if inner.trim().is_empty() {
      return Ok(Self::default());
    }

    let (floor, ceiling) = inner
      .split_once(',')
      .ok_or_else(|| Error::FuzzyDate(raw.to_owned()))?;

    Ok(Self {
      floor:   parse_bound(floor).ok_or_else(|| Error::FuzzyDate(raw.to_owned()))?,
      ceiling: parse_bound(ceiling).ok_or_else(|| Error::FuzzyDate(raw.to_owned()))?,
    })
  }
}

/// `Some(None)` is an open bound, `None` is unparseable.
fn parse_bound(bound: &str) -> Option<Option<i32>> {
  let bound = bound.trim().trim_matches('"').trim();
  if bound.is_empty()
    || bound.eq_ignore_ascii_case("infinity")
    || bound.eq_ignore_ascii_case("-infinity")
  {
    return Some(None);
  }

  let (bound, bc) = match bound.strip_suffix("BC") {
    Some(rest) => (rest.trim(), true),
    None => (bound, false),
  };
  // Drop any time component.
  let date = bound.split([' ', 'T']).next().unwrap_or(bound);

  let year = match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
    Ok(d) => d.year(),
    Err(_) => date.parse::<i32>().ok()?,
  };
  Some(Some(if bc { -year } else { year }))
}
