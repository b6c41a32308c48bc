use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::summary::{CyclingSummary, DrivingSummary, TransitSummary, WalkingSummary};

/// A travel mode the comparison engine can route with
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TravelMode {
    Driving,
    Walking,
    Cycling,
    Transit,
}

/// Travel comparison for one (base, destination) pair.
///
/// The four mode fields are filled independently; a pair may have some
/// modes populated and others recorded in `errors`. A mode key appears in
/// `errors` if and only if its summary field is `None` due to failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub base_idx: usize,
    pub dest_idx: usize,
    pub driving: Option<DrivingSummary>,
    pub walking: Option<WalkingSummary>,
    pub cycling: Option<CyclingSummary>,
    pub transit: Option<TransitSummary>,
    pub errors: Option<BTreeMap<TravelMode, String>>,
}

impl Comparison {
    /// An empty comparison cell for the given pair
    #[must_use]
    pub const fn new(base_idx: usize, dest_idx: usize) -> Self {
        Self {
            base_idx,
            dest_idx,
            driving: None,
            walking: None,
            cycling: None,
            transit: None,
            errors: None,
        }
    }

    pub(crate) fn record_error(&mut self, mode: TravelMode, message: String) {
        self.errors
            .get_or_insert_with(BTreeMap::new)
            .insert(mode, message);
    }
}
