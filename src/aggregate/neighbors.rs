//! Ring-neighbor aggregation of an attribute over grid cells.
//!
//! For every row, and for each requested ring distance `d`, the attribute is
//! averaged over all *other-cell* rows whose cell lies within `d` grid steps
//! (`0 < distance <= d`). Rings are cumulative: ring `d + 1` contains ring `d`.
//! Rows sharing the center's cell sit at distance 0 and never count, so a
//! duplicate `hex_id` is not its own neighbor. A null or NaN attribute on any
//! neighbor inside a ring makes that whole ring "no data".
//!
//! Results are computed once per distinct center cell, and grid distances once
//! per (center, candidate cell) pair. Values are summed in row order, so the
//! output matches a full pairwise rescan for every row and distance.

use crate::grid::GridMetric;
use std::collections::HashMap;

/// Ring distances aggregated when none are configured.
pub const DEFAULT_DISTANCES: [u32; 4] = [1, 2, 3, 4];

/// Attribute column averaged when none is configured.
pub const DEFAULT_ATTRIBUTE: &str = "cost_of_living";

/// A row of the aggregation table.
#[derive(Debug, Clone, PartialEq)]
pub struct HexRow<C> {
    /// Row cell; `None` for a missing or undecodable identifier.
    pub cell: Option<C>,

    /// Attribute value; `None` for null. Null neighbors void the ring mean.
    pub value: Option<f64>,
}

impl<C> HexRow<C> {
    pub fn new(cell: C, value: f64) -> Self {
        Self {
            cell: Some(cell),
            value: Some(value),
        }
    }
}

/// Neighbor count and attribute sum within one ring distance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RingStat {
    /// Number of neighbor rows, null attributes included
    pub neighbors: usize,

    /// Neighbors whose attribute is null
    pub missing: usize,

    /// Sum of the non-null attribute values
    pub sum: f64,
}

impl RingStat {
    fn add(self, value: Option<f64>) -> Self {
        match value {
            Some(value) => Self {
                neighbors: self.neighbors + 1,
                sum: self.sum + value,
                ..self
            },
            None => Self {
                neighbors: self.neighbors + 1,
                missing: self.missing + 1,
                ..self
            },
        }
    }

    /// Arithmetic mean, or `None` when the ring holds no neighbors or any
    /// neighbor value is null or NaN.
    pub fn mean(&self) -> Option<f64> {
        if self.neighbors == 0 || self.missing > 0 || self.sum.is_nan() {
            None
        } else {
            Some(self.sum / self.neighbors as f64)
        }
    }
}

/// Compute per-row ring statistics for each distance in `distances`.
///
/// The outer vector follows `rows`; each inner vector follows `distances`.
pub fn ring_stats<M: GridMetric>(
    metric: &M,
    rows: &[HexRow<M::Cell>],
    distances: &[u32],
) -> Vec<Vec<RingStat>> {
    let mut by_center: HashMap<&M::Cell, Vec<RingStat>> = HashMap::new();
    let mut out = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(center) = row.cell.as_ref() else {
            out.push(vec![RingStat::default(); distances.len()]);
            continue;
        };

        if let Some(stats) = by_center.get(center) {
            out.push(stats.clone());
            continue;
        }

        let stats = center_stats(metric, center, rows, distances);
        out.push(stats.clone());
        by_center.insert(center, stats);
    }

    out
}

/// Compute per-row neighbor means for each distance in `distances`.
///
/// `None` marks a ring with no neighbors or with a null/NaN neighbor value.
pub fn neighbor_means<M: GridMetric>(
    metric: &M,
    rows: &[HexRow<M::Cell>],
    distances: &[u32],
) -> Vec<Vec<Option<f64>>> {
    ring_stats(metric, rows, distances)
        .into_iter()
        .map(|stats| stats.iter().map(RingStat::mean).collect())
        .collect()
}

fn center_stats<M: GridMetric>(
    metric: &M,
    center: &M::Cell,
    rows: &[HexRow<M::Cell>],
    distances: &[u32],
) -> Vec<RingStat> {
    let mut distance_to: HashMap<&M::Cell, Option<u32>> = HashMap::new();

    // (grid distance, value) for every row that can contribute at some ring
    let candidates: Vec<(u32, Option<f64>)> = rows
        .iter()
        .filter_map(|row| {
            let cell = row.cell.as_ref()?;
            let distance = *distance_to
                .entry(cell)
                .or_insert_with(|| metric.grid_distance(center, cell));
            match distance {
                Some(k) if k > 0 => Some((k, row.value)),
                _ => None,
            }
        })
        .collect();

    distances
        .iter()
        .map(|&d| {
            candidates
                .iter()
                .filter(|(k, _)| *k <= d)
                .fold(RingStat::default(), |acc, (_, value)| acc.add(*value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{cell_of, parse_resolution, H3Grid};
    use h3o::CellIndex;

    /// Grid metric backed by an explicit distance table.
    struct TableMetric {
        distances: HashMap<(&'static str, &'static str), u32>,
    }

    impl TableMetric {
        fn new(pairs: &[(&'static str, &'static str, u32)]) -> Self {
            let mut distances = HashMap::new();
            for &(a, b, d) in pairs {
                distances.insert((a, b), d);
                distances.insert((b, a), d);
            }
            Self { distances }
        }
    }

    impl GridMetric for TableMetric {
        type Cell = &'static str;

        fn grid_distance(&self, from: &&'static str, to: &&'static str) -> Option<u32> {
            if from == to {
                return Some(0);
            }
            self.distances.get(&(*from, *to)).copied()
        }
    }

    #[test]
    fn test_duplicate_cell_is_not_a_neighbor() {
        let metric = TableMetric::new(&[("A", "B", 1)]);
        let rows = vec![
            HexRow::new("A", 10.0),
            HexRow::new("A", 10.0),
            HexRow::new("B", 20.0),
        ];

        let means = neighbor_means(&metric, &rows, &[1]);

        assert_eq!(means[0], vec![Some(20.0)]);
        assert_eq!(means[1], vec![Some(20.0)]);
        assert_eq!(means[2], vec![Some(10.0)]);
    }

    #[test]
    fn test_isolated_row_has_no_data() {
        let metric = TableMetric::new(&[("A", "B", 1), ("C", "A", 9), ("C", "B", 9)]);
        let rows = vec![
            HexRow::new("A", 1.0),
            HexRow::new("B", 2.0),
            HexRow::new("C", 3.0),
        ];

        let means = neighbor_means(&metric, &rows, &DEFAULT_DISTANCES);

        assert_eq!(means[2], vec![None; 4]);
        assert_eq!(means[0], vec![Some(2.0); 4]);
    }

    #[test]
    fn test_rings_are_cumulative() {
        let metric = TableMetric::new(&[
            ("O", "R1", 1),
            ("O", "R2", 2),
            ("O", "R4", 4),
            ("R1", "R2", 1),
            ("R1", "R4", 3),
            ("R2", "R4", 2),
        ]);
        let rows = vec![
            HexRow::new("O", 0.0),
            HexRow::new("R1", 10.0),
            HexRow::new("R2", 20.0),
            HexRow::new("R4", 60.0),
        ];

        let means = neighbor_means(&metric, &rows, &[1, 2, 3, 4]);

        assert_eq!(means[0], vec![Some(10.0), Some(15.0), Some(15.0), Some(30.0)]);
    }

    #[test]
    fn test_ring_counts_are_monotonic() {
        let metric = TableMetric::new(&[
            ("O", "R1", 1),
            ("O", "R2", 2),
            ("O", "R3", 3),
            ("R1", "R2", 1),
            ("R1", "R3", 2),
            ("R2", "R3", 1),
        ]);
        let rows = vec![
            HexRow::new("O", 1.0),
            HexRow::new("R1", 2.0),
            HexRow::new("R2", 3.0),
            HexRow::new("R3", 4.0),
            HexRow::new("R3", 5.0),
        ];

        for stats in ring_stats(&metric, &rows, &[1, 2, 3, 4]) {
            for pair in stats.windows(2) {
                assert!(pair[0].neighbors <= pair[1].neighbors);
            }
        }
    }

    #[test]
    fn test_distance_order_follows_caller() {
        let metric = TableMetric::new(&[("A", "B", 1), ("A", "C", 3), ("B", "C", 2)]);
        let rows = vec![
            HexRow::new("A", 0.0),
            HexRow::new("B", 4.0),
            HexRow::new("C", 8.0),
        ];

        let means = neighbor_means(&metric, &rows, &[3, 1]);

        assert_eq!(means[0], vec![Some(6.0), Some(4.0)]);
    }

    #[test]
    fn test_missing_cell_and_value() {
        let metric = TableMetric::new(&[("A", "B", 1)]);
        let rows = vec![
            HexRow::new("A", 1.0),
            HexRow { cell: Some("B"), value: None },
            HexRow { cell: None, value: Some(100.0) },
        ];

        let stats = ring_stats(&metric, &rows, &[1]);

        // B counts as a neighbor of A but its null voids the mean;
        // the cell-less row is never a candidate
        assert_eq!(stats[0][0].neighbors, 1);
        assert_eq!(stats[0][0].missing, 1);
        assert_eq!(stats[0][0].mean(), None);
        assert_eq!(stats[1][0].mean(), Some(1.0));
        assert_eq!(stats[2], vec![RingStat::default()]);
    }

    #[test]
    fn test_null_or_nan_neighbor_voids_only_its_rings() {
        let metric = TableMetric::new(&[
            ("O", "R1a", 1),
            ("O", "R1b", 1),
            ("O", "R2", 2),
            ("O", "R3", 3),
            ("R1a", "R1b", 1),
            ("R1a", "R2", 1),
            ("R1a", "R3", 2),
            ("R1b", "R2", 2),
            ("R1b", "R3", 3),
            ("R2", "R3", 1),
        ]);
        let rows = vec![
            HexRow::new("O", 0.0),
            HexRow::new("R1a", 20.0),
            HexRow::new("R1b", 40.0),
            HexRow { cell: Some("R2"), value: None },
            HexRow::new("R3", f64::NAN),
        ];

        let means = neighbor_means(&metric, &rows, &[1, 2, 3]);

        assert_eq!(means[0], vec![Some(30.0), None, None]);
    }

    #[test]
    fn test_nan_neighbor_yields_no_data() {
        let metric = TableMetric::new(&[("A", "B", 1), ("A", "C", 1), ("B", "C", 1)]);
        let rows = vec![
            HexRow::new("A", 0.0),
            HexRow::new("B", 20.0),
            HexRow::new("C", f64::NAN),
        ];

        let stats = ring_stats(&metric, &rows, &[1]);

        assert_eq!(stats[0][0].neighbors, 2);
        assert_eq!(stats[0][0].missing, 0);
        assert_eq!(stats[0][0].mean(), None);
        assert_eq!(stats[2][0].mean(), Some(10.0));
    }

    #[test]
    fn test_undefined_distance_is_excluded() {
        // No entry for (A, B): distance undefined
        let metric = TableMetric::new(&[]);
        let rows = vec![HexRow::new("A", 1.0), HexRow::new("B", 2.0)];

        assert_eq!(neighbor_means(&metric, &rows, &[1, 2]), vec![vec![None, None]; 2]);
    }

    #[test]
    fn test_empty_inputs() {
        let metric = TableMetric::new(&[]);
        assert!(neighbor_means(&metric, &[], &DEFAULT_DISTANCES).is_empty());

        let rows = vec![HexRow::new("A", 1.0)];
        assert_eq!(neighbor_means(&metric, &rows, &[]), vec![Vec::<Option<f64>>::new()]);
    }

    #[test]
    fn test_h3_rings_match_disk() {
        let res = parse_resolution(8).unwrap();
        let center = cell_of(48.8566, 2.3522, res).cell().unwrap();

        let ring1: Vec<CellIndex> = center
            .grid_disk::<Vec<_>>(1)
            .into_iter()
            .filter(|c| *c != center)
            .collect();
        let ring2_only: Vec<CellIndex> = center
            .grid_disk_distances::<Vec<_>>(2)
            .into_iter()
            .filter(|(_, k)| *k == 2)
            .map(|(c, _)| c)
            .collect();
        assert_eq!(ring1.len(), 6);
        assert_eq!(ring2_only.len(), 12);

        let mut rows = vec![HexRow::new(center, 0.0), HexRow::new(center, 1000.0)];
        rows.extend(ring1.iter().map(|c| HexRow::new(*c, 6.0)));
        rows.extend(ring2_only.iter().map(|c| HexRow::new(*c, 24.0)));

        let stats = ring_stats(&H3Grid, &rows, &DEFAULT_DISTANCES);

        assert_eq!(stats[0][0].neighbors, 6);
        assert_eq!(stats[0][0].mean(), Some(6.0));
        assert_eq!(stats[0][1].neighbors, 18);
        assert_eq!(stats[0][1].mean(), Some((6.0 * 6.0 + 12.0 * 24.0) / 18.0));
        assert_eq!(stats[1], stats[0]);
    }
}
