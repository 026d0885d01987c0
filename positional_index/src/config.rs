// ********* Input data structures ***********

/// One normalized observation: the value of an indicator for a municipality in a given year.
///
/// The municipality code is kept as text: some sources publish 6-digit codes and
/// others 7-digit codes, and both must go through unchanged.
#[derive(PartialEq, Debug, Clone)]
pub struct Observation {
    pub municipality_code: String,
    pub indicator_name: String,
    pub year: String,
    /// The value in the native unit of the indicator.
    pub value: f64,
}

impl Observation {
    pub fn new(
        municipality_code: &str,
        indicator_name: &str,
        year: &str,
        value: f64,
    ) -> Observation {
        Observation {
            municipality_code: municipality_code.to_string(),
            indicator_name: indicator_name.to_string(),
            year: year.to_string(),
            value,
        }
    }
}

// ******** Output data structures *********

/// An observation enriched with its standing inside its (indicator, year) group.
#[derive(PartialEq, Debug, Clone)]
pub struct RankedObservation {
    pub municipality_code: String,
    pub indicator_name: String,
    pub year: String,
    pub value: f64,
    /// In [0, 1]. 1 is the best value of the group, 0 the worst.
    pub positional_index: f64,
    /// Rounded reconstruction of the rank from the index. Tied or nearly tied
    /// entries may share a position.
    pub position: u32,
}

/// Counters gathered while ranking.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RankingSummary {
    pub num_groups: usize,
    pub num_records: usize,
    /// Observations dropped because their value was not a finite number.
    pub num_discarded: usize,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RankingResult {
    pub records: Vec<RankedObservation>,
    pub summary: RankingSummary,
}
