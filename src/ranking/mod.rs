//! Line grouping and suspiciousness ranking.
//!
//! Both operations are pure: they borrow lines from an already-built
//! [`FaultModel`](crate::model::FaultModel) and return new orderings.

use std::cmp::Ordering;

use serde::Serialize;

use crate::model::{MethodId, SourceLine};

/// Default maximum line distance between neighbours of one block.
pub const DEFAULT_GAP_THRESHOLD: u32 = 5;

/// A run of nearby lines inside one method, sorted by line number.
#[derive(Debug, Clone, Serialize)]
pub struct LineGroup<'a> {
    pub method: MethodId,
    pub lines: Vec<&'a SourceLine>,
}

impl LineGroup<'_> {
    /// First line number of the block.
    pub fn start(&self) -> u32 {
        self.lines.first().map(|l| l.line_number).unwrap_or(0)
    }

    /// Last line number of the block.
    pub fn end(&self) -> u32 {
        self.lines.last().map(|l| l.line_number).unwrap_or(0)
    }
}

/// Anything that can be ordered by suspiciousness.
pub trait Scored {
    /// Highest suspiciousness for `algorithm`; missing values count as 0.
    fn max_suspiciousness(&self, algorithm: &str) -> f64;
}

impl Scored for SourceLine {
    fn max_suspiciousness(&self, algorithm: &str) -> f64 {
        suspiciousness(self, algorithm)
    }
}

impl<T: Scored + ?Sized> Scored for &T {
    fn max_suspiciousness(&self, algorithm: &str) -> f64 {
        (**self).max_suspiciousness(algorithm)
    }
}

impl Scored for LineGroup<'_> {
    fn max_suspiciousness(&self, algorithm: &str) -> f64 {
        self.lines
            .iter()
            .map(|l| suspiciousness(l, algorithm))
            .reduce(f64::max)
            .unwrap_or(0.0)
    }
}

/// Suspiciousness of `line` for `algorithm`, with missing and NaN values as 0.
pub fn suspiciousness(line: &SourceLine, algorithm: &str) -> f64 {
    match line.metric(algorithm) {
        Some(v) if v.is_nan() || v == 0.0 => 0.0,
        Some(v) => v,
        None => 0.0,
    }
}

/// Split lines by owning method, methods in order of first appearance.
pub fn partition_by_method<'a>(lines: &[&'a SourceLine]) -> Vec<Vec<&'a SourceLine>> {
    let mut order: Vec<MethodId> = Vec::new();
    let mut partitions: Vec<Vec<&'a SourceLine>> = Vec::new();
    for &line in lines {
        match order.iter().position(|m| *m == line.method) {
            Some(i) => partitions[i].push(line),
            None => {
                order.push(line.method);
                partitions.push(vec![line]);
            }
        }
    }
    partitions
}

/// Group lines into blocks of neighbours no more than `gap_threshold` apart.
///
/// Lines are partitioned by method first, so a block never spans two
/// methods. Within a method, lines are sorted by line number and a new block
/// starts whenever the distance to the previous line exceeds the threshold.
pub fn group_adjacent<'a>(lines: &[&'a SourceLine], gap_threshold: u32) -> Vec<LineGroup<'a>> {
    let mut groups = Vec::new();
    for mut method_lines in partition_by_method(lines) {
        method_lines.sort_by_key(|l| l.line_number);
        let method = method_lines[0].method;

        let mut current: Vec<&'a SourceLine> = Vec::new();
        for line in method_lines {
            let split = current
                .last()
                .is_some_and(|prev| line.line_number - prev.line_number > gap_threshold);
            if split {
                groups.push(LineGroup {
                    method,
                    lines: std::mem::take(&mut current),
                });
            }
            current.push(line);
        }
        if !current.is_empty() {
            groups.push(LineGroup {
                method,
                lines: current,
            });
        }
    }
    groups
}

/// Order items by descending maximum suspiciousness for `algorithm`.
///
/// The sort is stable: ties keep their input order. Items without a value
/// for `algorithm` rank as 0.
pub fn rank_by_metric<T: Scored>(mut items: Vec<T>, algorithm: &str) -> Vec<T> {
    items.sort_by(|a, b| {
        compare_desc(
            a.max_suspiciousness(algorithm),
            b.max_suspiciousness(algorithm),
        )
    });
    items
}

fn compare_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Lines whose recorded `algorithm` value is at least `threshold`, ranked.
pub fn above_threshold<'a>(
    lines: &[&'a SourceLine],
    algorithm: &str,
    threshold: f64,
) -> Vec<&'a SourceLine> {
    let selected: Vec<&'a SourceLine> = lines
        .iter()
        .copied()
        .filter(|l| l.metric(algorithm).is_some_and(|v| v >= threshold))
        .collect();
    rank_by_metric(selected, algorithm)
}

/// The algorithms with `primary` moved to the front.
pub fn order_algorithms(algorithms: &[String], primary: &str) -> Vec<String> {
    let mut ordered = Vec::with_capacity(algorithms.len());
    ordered.extend(algorithms.iter().filter(|a| *a == primary).cloned());
    ordered.extend(algorithms.iter().filter(|a| *a != primary).cloned());
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FaultModel, NoLocator};

    fn model() -> FaultModel {
        let mut model = FaultModel::new();
        model.ingest_test_list("tests.csv", ["T#a,FAIL,1,x"]).unwrap();
        model
            .ingest_line_inventory(
                "spectra.csv",
                [
                    "p$C#m():10",
                    "p$C#m():3",
                    "p$C#m():12",
                    "p$C#m():30",
                    "p$C#n():13",
                    "p$C#m():35",
                ],
                &NoLocator,
            )
            .unwrap();
        model
            .ingest_ranking(
                "ochiai",
                "ochiai.ranking.csv",
                [
                    "p$C#m():10;0.2",
                    "p$C#m():3;0.4",
                    "p$C#m():30;0.9",
                    "p$C#n():13;0.4",
                    "p$C#m():35;NaN",
                ],
            )
            .unwrap();
        model
    }

    fn numbers(group: &LineGroup<'_>) -> Vec<u32> {
        group.lines.iter().map(|l| l.line_number).collect()
    }

    #[test]
    fn test_group_adjacent_splits_on_gap_and_method() {
        let model = model();
        let lines: Vec<&SourceLine> = model.lines().iter().collect();
        let groups = group_adjacent(&lines, DEFAULT_GAP_THRESHOLD);
        let got: Vec<Vec<u32>> = groups.iter().map(numbers).collect();
        assert_eq!(got, vec![vec![3], vec![10, 12], vec![30, 35], vec![13]]);
        assert_eq!(groups[1].start(), 10);
        assert_eq!(groups[1].end(), 12);
    }

    #[test]
    fn test_group_gap_is_inclusive() {
        let model = model();
        let lines: Vec<&SourceLine> = model.lines().iter().collect();
        let groups = group_adjacent(&lines, 7);
        let got: Vec<Vec<u32>> = groups.iter().map(numbers).collect();
        assert_eq!(got, vec![vec![3, 10, 12], vec![30, 35], vec![13]]);
    }

    #[test]
    fn test_regrouping_a_group_is_identity() {
        let model = model();
        let lines: Vec<&SourceLine> = model.lines().iter().collect();
        for group in group_adjacent(&lines, DEFAULT_GAP_THRESHOLD) {
            let again = group_adjacent(&group.lines, DEFAULT_GAP_THRESHOLD);
            assert_eq!(again.len(), 1);
            assert_eq!(numbers(&again[0]), numbers(&group));
        }
    }

    #[test]
    fn test_group_empty_input() {
        assert!(group_adjacent(&[], DEFAULT_GAP_THRESHOLD).is_empty());
    }

    #[test]
    fn test_rank_lines_missing_values_last_and_stable() {
        let model = model();
        let lines: Vec<&SourceLine> = model.lines().iter().collect();
        let ranked = rank_by_metric(lines, "ochiai");
        let got: Vec<u32> = ranked.iter().map(|l| l.line_number).collect();
        // 12 has no value, 35 is NaN: both rank as 0 in input order.
        assert_eq!(got, vec![30, 3, 13, 10, 12, 35]);
    }

    #[test]
    fn test_rank_unknown_algorithm_keeps_order() {
        let model = model();
        let lines: Vec<&SourceLine> = model.lines().iter().collect();
        let ranked = rank_by_metric(lines.clone(), "dstar");
        let got: Vec<u32> = ranked.iter().map(|l| l.line_number).collect();
        let expected: Vec<u32> = lines.iter().map(|l| l.line_number).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_rank_groups_by_max() {
        let model = model();
        let lines: Vec<&SourceLine> = model.lines().iter().collect();
        let groups = group_adjacent(&lines, DEFAULT_GAP_THRESHOLD);
        let ranked = rank_by_metric(groups, "ochiai");
        let got: Vec<Vec<u32>> = ranked.iter().map(numbers).collect();
        assert_eq!(got, vec![vec![30, 35], vec![3], vec![13], vec![10, 12]]);
        assert_eq!(ranked[0].max_suspiciousness("ochiai"), 0.9);
    }

    #[test]
    fn test_rank_groups_with_negative_scores() {
        let mut model = FaultModel::new();
        model.ingest_test_list("tests.csv", ["T#a,FAIL,1,x"]).unwrap();
        model
            .ingest_line_inventory("spectra.csv", ["p$C#m():1", "p$C#n():50"], &NoLocator)
            .unwrap();
        model
            .ingest_ranking("mccon", "mccon.ranking.csv", ["p$C#m():1;-0.5", "p$C#n():50;-0.1"])
            .unwrap();
        let lines: Vec<&SourceLine> = model.lines().iter().collect();

        let groups = group_adjacent(&lines, DEFAULT_GAP_THRESHOLD);
        let maxima: Vec<f64> = groups.iter().map(|g| g.max_suspiciousness("mccon")).collect();
        assert_eq!(maxima, vec![-0.5, -0.1]);

        let by_line: Vec<u32> = rank_by_metric(lines, "mccon")
            .iter()
            .map(|l| l.line_number)
            .collect();
        let by_group: Vec<u32> = rank_by_metric(groups, "mccon")
            .iter()
            .map(|g| g.start())
            .collect();
        assert_eq!(by_line, vec![50, 1]);
        assert_eq!(by_group, by_line);
    }

    #[test]
    fn test_above_threshold() {
        let model = model();
        let lines: Vec<&SourceLine> = model.lines().iter().collect();
        let got: Vec<u32> = above_threshold(&lines, "ochiai", 0.4)
            .iter()
            .map(|l| l.line_number)
            .collect();
        assert_eq!(got, vec![30, 3, 13]);
        assert!(above_threshold(&lines, "dstar", 0.0).is_empty());
    }

    #[test]
    fn test_order_algorithms() {
        let algorithms = vec![
            "ochiai".to_string(),
            "tarantula".to_string(),
            "dstar".to_string(),
        ];
        assert_eq!(
            order_algorithms(&algorithms, "tarantula"),
            vec!["tarantula", "ochiai", "dstar"]
        );
        assert_eq!(order_algorithms(&algorithms, "unknown"), algorithms);
    }

    #[test]
    fn test_partition_by_method_first_seen() {
        let model = model();
        let lines: Vec<&SourceLine> = model.lines().iter().collect();
        let parts = partition_by_method(&lines);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 5);
        assert_eq!(parts[1][0].line_number, 13);
    }
}
