pub use crate::config::*;

/// A builder for collecting observations before ranking them.
///
/// It is mostly useful for small, hand-written data sets and for tests.
///
/// ```
/// use positional_index::builder::Builder;
/// use positional_index::Observation;
///
/// let mut builder = Builder::new();
/// builder.observation("3550308", "Receita Total", "2021", 10.0);
/// builder.observation("3304557", "Receita Total", "2021", 10.0);
/// builder.observation("4106902", "Receita Total", "2021", 5.0);
///
/// let res = builder.rank();
/// assert_eq!(res.records[0].positional_index, 0.75);
/// assert_eq!(res.records[2].position, 3);
///
/// // Observations that were read elsewhere can be added in bulk.
/// let mut other = Builder::new();
/// assert!(other.is_empty());
/// other.extend(&[Observation::new("3550308", "PIB", "2020", 1.5)]);
/// assert_eq!(other.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) _observations: Vec<Observation>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _observations: Vec::new(),
        }
    }

    /// Adds a single observation.
    pub fn observation(
        &mut self,
        municipality_code: &str,
        indicator_name: &str,
        year: &str,
        value: f64,
    ) -> &mut Builder {
        self._observations.push(Observation::new(
            municipality_code,
            indicator_name,
            year,
            value,
        ));
        self
    }

    pub fn extend(&mut self, observations: &[Observation]) -> &mut Builder {
        self._observations.extend_from_slice(observations);
        self
    }

    pub fn len(&self) -> usize {
        self._observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self._observations.is_empty()
    }

    pub fn rank(&self) -> RankingResult {
        crate::run_positional_index(&self._observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_then_rank() {
        let mut builder = Builder::new();
        assert!(builder.is_empty());
        builder
            .extend(&[
                Observation::new("3550308", "PIB", "2020", 3.0),
                Observation::new("3304557", "PIB", "2020", 2.0),
            ])
            .observation("4106902", "PIB", "2020", 1.0);
        assert_eq!(builder.len(), 3);
        let res = builder.rank();
        let indices: Vec<f64> = res.records.iter().map(|r| r.positional_index).collect();
        assert_eq!(indices, vec![1.0, 0.5, 0.0]);
        assert_eq!(res.summary.num_records, 3);
    }
}
