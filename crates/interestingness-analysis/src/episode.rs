//! Episode segmentation of a flat timestep sequence
//!
//! Episodes are never stored explicitly in a rollout: they are implied by the
//! [`new_episode`](crate::record::InteractionRecord::new_episode) markers. This
//! module derives the half-open episode ranges `[start, end)` from those
//! markers.
//!
//! # Boundary Convention
//!
//! The first record always starts episode 0, whether or not it carries a
//! `new_episode` marker; a marker on it does not open a second episode.
//! Every later marker starts a new episode whose local timestep counter begins
//! at 0.
//!
//! ```
//! use interestingness_analysis::episode::Episodes;
//!
//! let markers = [false, true, false, false, true, false, false, false, true, false, false, false];
//! let episodes = Episodes::from_markers(markers).unwrap();
//! assert_eq!(episodes.boundaries(), &[0, 1, 4, 8]);
//! assert_eq!(episodes.lengths().collect::<Vec<_>>(), vec![1, 3, 4, 4]);
//! assert_eq!(episodes.locate(5), Some((2, 1)));
//! ```

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{error::SequenceError, record::InteractionRecord};

/// Episode start indices of a record sequence.
///
/// # Invariants
///
/// - `starts` is non-empty, begins with `0` and is strictly increasing
/// - every start is below `len`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episodes {
    starts: Vec<usize>,
    len: usize,
}

impl Episodes {
    /// Segments a record sequence into episodes.
    pub fn from_records(records: &[InteractionRecord]) -> Result<Self, SequenceError> {
        Self::from_markers(records.iter().map(|r| r.new_episode))
    }

    /// Segments a sequence given its `new_episode` markers.
    ///
    /// Fails with [`SequenceError::Empty`] for an empty sequence.
    pub fn from_markers<I>(markers: I) -> Result<Self, SequenceError>
    where
        I: IntoIterator<Item = bool>,
    {
        let mut starts = vec![0];
        let mut len = 0;
        for (t, new_episode) in markers.into_iter().enumerate() {
            if new_episode && t > 0 {
                starts.push(t);
            }
            len = t + 1;
        }
        if len == 0 {
            return Err(SequenceError::Empty);
        }
        Ok(Self { starts, len })
    }

    /// Episode start indices, beginning with `0`.
    #[must_use]
    pub fn boundaries(&self) -> &[usize] {
        &self.starts
    }

    /// Number of episodes.
    #[must_use]
    pub fn count(&self) -> usize {
        self.starts.len()
    }

    /// Number of timesteps covered by all episodes.
    #[must_use]
    pub fn timesteps(&self) -> usize {
        self.len
    }

    /// Half-open timestep range of each episode, in order.
    pub fn ranges(&self) -> impl ExactSizeIterator<Item = Range<usize>> + '_ {
        self.starts.iter().enumerate().map(|(i, &start)| {
            let end = self.starts.get(i + 1).copied().unwrap_or(self.len);
            start..end
        })
    }

    /// Length of each episode, in order.
    pub fn lengths(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.ranges().map(|r| r.len())
    }

    /// Episode index and local timestep of global timestep `t`.
    #[must_use]
    pub fn locate(&self, t: usize) -> Option<(usize, usize)> {
        if t >= self.len {
            return None;
        }
        let episode = self.starts.partition_point(|&start| start <= t) - 1;
        Some((episode, t - self.starts[episode]))
    }

    /// `(episode, local timestep)` of every timestep, in order.
    pub fn index_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.ranges()
            .enumerate()
            .flat_map(|(episode, range)| (0..range.len()).map(move |local| (episode, local)))
    }

    /// Splits a per-timestep series into one slice per episode.
    ///
    /// Fails if `series` does not have exactly one entry per timestep.
    pub fn split<'a, T>(&self, column: &str, series: &'a [T]) -> Result<Vec<&'a [T]>, SequenceError> {
        if series.len() != self.len {
            return Err(SequenceError::LengthMismatch {
                column: column.to_owned(),
                expected: self.len,
                found: series.len(),
            });
        }
        Ok(split(series, &self.starts))
    }
}

/// Episode start indices of a record sequence, beginning with `0`.
pub fn boundaries(records: &[InteractionRecord]) -> Result<Vec<usize>, SequenceError> {
    Episodes::from_records(records).map(|episodes| episodes.starts)
}

/// Splits `series` at the given episode start indices.
///
/// The returned slices concatenate back to `series`. Starts past the end of
/// the series yield empty trailing slices.
#[must_use]
pub fn split<'a, T>(series: &'a [T], boundaries: &[usize]) -> Vec<&'a [T]> {
    boundaries
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = boundaries.get(i + 1).copied().unwrap_or(series.len());
            let start = start.min(series.len());
            &series[start..end.clamp(start, series.len())]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg64Mcg;

    use super::*;

    const MARKERS: [bool; 12] = [
        false, true, false, false, true, false, false, false, true, false, false, false,
    ];

    #[test]
    fn test_reference_scenario() {
        let records = MARKERS
            .iter()
            .map(|&new_episode| InteractionRecord {
                new_episode,
                ..Default::default()
            })
            .collect::<Vec<_>>();
        assert_eq!(boundaries(&records).unwrap(), vec![0, 1, 4, 8]);
        let episodes = Episodes::from_records(&records).unwrap();
        assert_eq!(episodes.lengths().collect::<Vec<_>>(), vec![1, 3, 4, 4]);
        assert_eq!(episodes.count(), 4);
        assert_eq!(episodes.timesteps(), 12);
    }

    #[test]
    fn test_empty_sequence() {
        assert_eq!(Episodes::from_markers([]), Err(SequenceError::Empty));
        assert_eq!(boundaries(&[]), Err(SequenceError::Empty));
    }

    #[test]
    fn test_no_markers_is_single_episode() {
        let episodes = Episodes::from_markers([false; 7]).unwrap();
        assert_eq!(episodes.boundaries(), &[0]);
        assert_eq!(episodes.ranges().collect::<Vec<_>>(), vec![0..7]);
    }

    #[test]
    fn test_leading_marker_not_double_counted() {
        let episodes = Episodes::from_markers([true, false, true]).unwrap();
        assert_eq!(episodes.boundaries(), &[0, 2]);
    }

    #[test]
    fn test_every_step_is_an_episode() {
        let episodes = Episodes::from_markers([true; 4]).unwrap();
        assert_eq!(episodes.boundaries(), &[0, 1, 2, 3]);
        assert!(episodes.lengths().all(|len| len == 1));
    }

    #[test]
    fn test_locate() {
        let episodes = Episodes::from_markers(MARKERS).unwrap();
        assert_eq!(episodes.locate(0), Some((0, 0)));
        assert_eq!(episodes.locate(1), Some((1, 0)));
        assert_eq!(episodes.locate(3), Some((1, 2)));
        assert_eq!(episodes.locate(11), Some((3, 3)));
        assert_eq!(episodes.locate(12), None);
    }

    #[test]
    fn test_index_pairs_match_locate() {
        let episodes = Episodes::from_markers(MARKERS).unwrap();
        let pairs = episodes.index_pairs().collect::<Vec<_>>();
        assert_eq!(pairs.len(), 12);
        for (t, pair) in pairs.into_iter().enumerate() {
            assert_eq!(episodes.locate(t), Some(pair));
        }
    }

    #[test]
    fn test_split_length_mismatch() {
        let episodes = Episodes::from_markers(MARKERS).unwrap();
        let err = episodes.split("value", &[0.0; 5]).unwrap_err();
        assert_eq!(
            err,
            SequenceError::LengthMismatch {
                column: "value".to_owned(),
                expected: 12,
                found: 5
            }
        );
    }

    #[test]
    fn test_random_sequences_round_trip() {
        let mut rng = Pcg64Mcg::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let len = rng.random_range(1..60);
            let markers = (0..len).map(|_| rng.random_bool(0.2)).collect::<Vec<_>>();
            let episodes = Episodes::from_markers(markers.iter().copied()).unwrap();

            let starts = episodes.boundaries();
            assert_eq!(starts[0], 0);
            assert!(starts.windows(2).all(|w| w[0] < w[1]));
            assert_eq!(episodes.lengths().sum::<usize>(), len);

            let series = (0..len).collect::<Vec<_>>();
            let parts = episodes.split("t", &series).unwrap();
            assert_eq!(parts.len(), episodes.count());
            assert_eq!(parts.concat(), series);
        }
    }
}
