//! Brute-force nearest-neighbor search over great-circle distance.
//!
//! Every target is compared against every input, so a run costs
//! O(targets × inputs) distance evaluations. Ties go to the input that
//! comes first.

use map_tools_features::location::record_location;
use map_tools_geometry::{Coordinate, RangePolicy, haversine_distance};
use map_tools_records_models::{Record, RecordId};

use crate::AnalysisError;

/// A record reduced to what matching needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Record id.
    pub record_id: RecordId,
    /// Record display name, for error messages.
    pub name: String,
    /// Parsed location, or `None` when the record has none.
    pub point: Option<Coordinate>,
}

impl Candidate {
    /// Reads the record's location with `policy`.
    #[must_use]
    pub fn from_record(record: &Record, policy: RangePolicy) -> Self {
        Self {
            record_id: record.id.clone(),
            name: record.name.clone(),
            point: record_location(record, policy),
        }
    }
}

/// The input chosen for a target.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestMatch {
    /// Id of the nearest input record.
    pub input_id: RecordId,
    /// Its display name.
    pub input_name: String,
    /// Great-circle distance in meters.
    pub distance_m: f64,
}

/// Outcome for one target record.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Target record id.
    pub target_id: RecordId,
    /// Target display name.
    pub target_name: String,
    /// `None` when the target had no location and was skipped.
    pub matched: Option<NearestMatch>,
}

/// Finds, for a target, the input with the smallest great-circle
/// distance.
#[derive(Debug, Clone)]
pub struct NearestMatcher {
    inputs: Vec<Candidate>,
    exclude_self: bool,
}

impl NearestMatcher {
    /// Builds a matcher over `inputs`, kept in the given order. Every
    /// located input is a candidate, whatever its id.
    #[must_use]
    pub const fn new(inputs: Vec<Candidate>) -> Self {
        Self {
            inputs,
            exclude_self: false,
        }
    }

    /// Matcher for targets drawn from the same table as `inputs`: an input
    /// with the target's own record id is never its match.
    #[must_use]
    pub const fn same_table(inputs: Vec<Candidate>) -> Self {
        Self {
            inputs,
            exclude_self: true,
        }
    }

    /// Inputs that have a location.
    pub fn located_inputs(&self) -> impl Iterator<Item = &Candidate> {
        self.inputs.iter().filter(|c| c.point.is_some())
    }

    /// Matches one target.
    ///
    /// A target without a location is skipped (`matched: None`). For a
    /// [`same_table`](Self::same_table) matcher, the target itself is not a
    /// candidate.
    ///
    /// # Errors
    ///
    /// * [`AnalysisError::NoMatchFound`] if no input has a location
    pub fn match_target(&self, target: &Candidate) -> Result<MatchResult, AnalysisError> {
        let Some(origin) = target.point else {
            log::debug!("Skipping {:?} ({}): no location", target.name, target.record_id);
            return Ok(MatchResult {
                target_id: target.record_id.clone(),
                target_name: target.name.clone(),
                matched: None,
            });
        };

        let mut best: Option<(&Candidate, f64)> = None;
        for input in &self.inputs {
            let Some(point) = input.point else {
                continue;
            };
            if self.exclude_self && input.record_id == target.record_id {
                continue;
            }
            let distance = haversine_distance(&origin, &point);
            if best.is_none_or(|(_, shortest)| distance < shortest) {
                best = Some((input, distance));
            }
        }

        let (input, distance_m) = best.ok_or_else(|| AnalysisError::NoMatchFound {
            target_id: target.record_id.clone(),
            target_name: target.name.clone(),
        })?;

        Ok(MatchResult {
            target_id: target.record_id.clone(),
            target_name: target.name.clone(),
            matched: Some(NearestMatch {
                input_id: input.record_id.clone(),
                input_name: input.name.clone(),
                distance_m,
            }),
        })
    }
}
