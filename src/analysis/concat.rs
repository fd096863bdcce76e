/// Series concatenation.

use crate::model::{ConcatenatedSeries, LocationSeries};

/// Appends `parts` in the order given.
///
/// No sorting, deduplication or continuity check happens here: overlapping
/// or out-of-order years come out overlapping or out of order. Use
/// `continuity::check_continuity` to detect that.
pub fn concatenate<I>(parts: I) -> ConcatenatedSeries
where
    I: IntoIterator<Item = LocationSeries>,
{
    parts
        .into_iter()
        .fold(ConcatenatedSeries::default(), |mut acc, part| {
            acc.cells.push(part.cell);
            acc.observations.extend(part.observations);
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GridCell, Observation};
    use chrono::{TimeZone, Utc};

    fn single(year: i32, value: f64) -> LocationSeries {
        LocationSeries {
            cell: GridCell {
                latitude: 40.0,
                longitude: 285.0,
                level: 500.0,
                lat_index: 0,
                lon_index: 0,
                level_index: 0,
            },
            observations: vec![Observation {
                time: Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap(),
                value,
            }],
        }
    }

    #[test]
    fn test_three_single_element_series_keep_input_order() {
        let out = concatenate(vec![single(1981, 3.0), single(1979, 1.0), single(1980, 2.0)]);
        assert_eq!(out.len(), 3);
        assert_eq!(out.values(), vec![3.0, 1.0, 2.0], "concatenation must not resort");
        assert_eq!(out.cells.len(), 3);
    }

    #[test]
    fn test_overlapping_years_are_not_deduplicated() {
        let out = concatenate(vec![single(1990, 1.0), single(1990, 1.0)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out.observations[0].time, out.observations[1].time);
    }

    #[test]
    fn test_empty_input_gives_empty_series() {
        let out = concatenate(Vec::new());
        assert!(out.is_empty());
        assert!(out.cells.is_empty());
    }
}
