mod config;
use log::{debug, info};

use std::collections::HashMap;

pub use crate::config::*;

pub mod builder;
pub mod manual;

// **** Private structures ****

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
struct GroupKey {
    indicator_name: String,
    year: String,
}

// Invariant: members is never empty and every member has a finite value.
#[derive(Debug, Clone)]
struct Group<'a> {
    key: GroupKey,
    members: Vec<&'a Observation>,
}

/// Computes the positional index and the position of every observation.
///
/// Observations are grouped by the exact pair (indicator name, year). Inside a
/// group, a higher value always ranks first: there is no notion of an indicator
/// for which lower is better.
///
/// Arguments:
/// * `observations` the normalized observations, typically the concatenation of
/// all the files of a batch.
///
/// The groups are returned in the order in which their key first appears in the
/// input, and the members of a group in descending order of value.
pub fn run_positional_index(observations: &[Observation]) -> RankingResult {
    info!(
        "run_positional_index: Processing {:?} observations",
        observations.len()
    );

    let mut num_discarded: usize = 0;
    let mut group_ids: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    for obs in observations.iter() {
        if !obs.value.is_finite() {
            debug!(
                "run_positional_index: discarding non-finite value {:?} for {:?}",
                obs.value, obs.municipality_code
            );
            num_discarded += 1;
            continue;
        }
        let key = GroupKey {
            indicator_name: obs.indicator_name.clone(),
            year: obs.year.clone(),
        };
        let gid = match group_ids.get(&key) {
            Some(gid) => *gid,
            None => {
                groups.push(Group {
                    key: key.clone(),
                    members: Vec::new(),
                });
                group_ids.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[gid].members.push(obs);
    }

    let mut records: Vec<RankedObservation> = Vec::with_capacity(observations.len());
    for group in groups.iter() {
        debug!(
            "run_positional_index: group {:?} has {} members",
            group.key,
            group.members.len()
        );
        records.extend(rank_group(&group.members));
    }

    let summary = RankingSummary {
        num_groups: groups.len(),
        num_records: records.len(),
        num_discarded,
    };
    info!("run_positional_index: {:?}", summary);
    RankingResult { records, summary }
}

/// The position implied by a positional index in a group of size `n`:
/// `round(n * (1 - index) + index)`.
///
/// An index of 1 maps to position 1 and an index of 0 maps to position `n`.
pub fn position_from_index(positional_index: f64, n: usize) -> u32 {
    let x = (n as f64) * (1.0 - positional_index) + positional_index;
    x.round() as u32
}

fn rank_group(members: &[&Observation]) -> Vec<RankedObservation> {
    let mut sorted: Vec<&Observation> = members.to_vec();
    // Stable: equal values keep their input order.
    sorted.sort_by(|a, b| b.value.total_cmp(&a.value));

    let n = sorted.len();
    let mut indices = linear_indices(n);
    average_ties(&sorted, &mut indices);

    sorted
        .iter()
        .zip(indices)
        .map(|(obs, idx)| RankedObservation {
            municipality_code: obs.municipality_code.clone(),
            indicator_name: obs.indicator_name.clone(),
            year: obs.year.clone(),
            value: obs.value,
            positional_index: idx,
            position: position_from_index(idx, n),
        })
        .collect()
}

fn linear_indices(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    let denom = (n - 1) as f64;
    (0..n).map(|i| 1.0 - (i as f64) / denom).collect()
}

/// Replaces the index of every run of equal values with the mean of the run.
/// `sorted` must be ordered so that equal values are contiguous.
fn average_ties(sorted: &[&Observation], indices: &mut [f64]) {
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len() && sorted[end].value == sorted[start].value {
            end += 1;
        }
        if end - start > 1 {
            let span = &mut indices[start..end];
            let mean = span.iter().sum::<f64>() / (span.len() as f64);
            for idx in span.iter_mut() {
                *idx = mean;
            }
        }
        start = end;
    }
}
