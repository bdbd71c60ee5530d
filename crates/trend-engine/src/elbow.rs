//! Elbow (knee point) detection over a descending score curve.
//!
//! The curve is the sequence of points `(i, score_i)`. A chord joins the
//! first and last point; the knee is the point farthest from it. Points
//! before the knee form the head that is kept.

use serde::Serialize;

/// Slack when deciding whether the knee lies below the chord.
const BELOW_CHORD_EPSILON: f64 = 1e-9;

/// Outcome of an elbow selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElbowSelection {
    /// Index of maximum perpendicular distance; absent when detection was skipped
    pub knee_index: Option<usize>,
    /// Index whose score became the threshold
    pub cutoff_index: Option<usize>,
    /// Scores at or above this value are retained; absent for an empty curve
    pub threshold: Option<f64>,
    /// Number of leading scores retained
    pub retained: usize,
}

impl ElbowSelection {
    fn empty() -> Self {
        Self {
            knee_index: None,
            cutoff_index: None,
            threshold: None,
            retained: 0,
        }
    }

    /// Retain everything; the threshold is the lowest score.
    fn retain_all(scores: &[f64]) -> Self {
        match scores.len() {
            0 => Self::empty(),
            n => Self {
                knee_index: None,
                cutoff_index: Some(n - 1),
                threshold: Some(scores[n - 1]),
                retained: n,
            },
        }
    }
}

/// Picks an adaptive relevance cutoff.
#[derive(Debug, Clone)]
pub struct ElbowSelector {
    enabled: bool,
    min_points: usize,
}

impl ElbowSelector {
    /// Create a selector. Curves shorter than `min_points` keep every point.
    pub fn new(enabled: bool, min_points: usize) -> Self {
        Self {
            enabled,
            min_points,
        }
    }

    /// Select over scores sorted in descending order.
    pub fn select(&self, scores: &[f64]) -> ElbowSelection {
        if scores.is_empty() {
            return ElbowSelection::empty();
        }
        if !self.enabled || scores.len() < self.min_points {
            return ElbowSelection::retain_all(scores);
        }

        // Non-empty input always has a knee
        let Some(knee) = find_knee(scores) else {
            return ElbowSelection::retain_all(scores);
        };

        // A knee under the chord is the first point of the tail
        let cutoff = if knee > 0 && signed_offset(scores, knee) < -BELOW_CHORD_EPSILON {
            knee - 1
        } else {
            knee
        };

        let threshold = scores[cutoff];
        ElbowSelection {
            knee_index: Some(knee),
            cutoff_index: Some(cutoff),
            threshold: Some(threshold),
            retained: scores.iter().filter(|s| **s >= threshold).count(),
        }
    }
}

/// Index of the point farthest from the first-to-last chord.
///
/// Ties resolve to the lowest index. A degenerate chord (single point)
/// yields index 0.
pub fn find_knee(scores: &[f64]) -> Option<usize> {
    let distances = perpendicular_distances(scores);
    let mut best: Option<(usize, f64)> = None;
    for (i, d) in distances.into_iter().enumerate() {
        match best {
            Some((_, best_d)) if d <= best_d => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

/// Distance of every point from the chord.
pub fn perpendicular_distances(scores: &[f64]) -> Vec<f64> {
    let norm = chord_length(scores);
    if norm == 0.0 {
        return vec![0.0; scores.len()];
    }
    (0..scores.len())
        .map(|i| signed_offset(scores, i).abs() / norm)
        .collect()
}

fn chord_length(scores: &[f64]) -> f64 {
    match (scores.first(), scores.last()) {
        (Some(first), Some(last)) => {
            let dx = (scores.len() - 1) as f64;
            let dy = last - first;
            (dx * dx + dy * dy).sqrt()
        }
        _ => 0.0,
    }
}

/// Cross product of the chord with the vector to point `i`, unnormalized.
///
/// Positive above the chord, negative below, zero on it.
fn signed_offset(scores: &[f64], i: usize) -> f64 {
    let (first, last) = match (scores.first(), scores.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return 0.0,
    };
    let dx = (scores.len() - 1) as f64;
    let dy = last - first;
    dx * (scores[i] - first) - dy * i as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> ElbowSelector {
        ElbowSelector::new(true, 3)
    }

    #[test]
    fn test_sharp_drop_keeps_head() {
        let selection = selector().select(&[90.0, 85.0, 20.0, 15.0, 10.0]);
        assert_eq!(selection.knee_index, Some(2));
        assert_eq!(selection.cutoff_index, Some(1));
        assert_eq!(selection.threshold, Some(85.0));
        assert_eq!(selection.retained, 2);
    }

    #[test]
    fn test_flat_curve_keeps_everything() {
        let selection = selector().select(&[50.0, 50.0, 50.0, 50.0]);
        assert_eq!(selection.knee_index, Some(0));
        assert_eq!(selection.threshold, Some(50.0));
        assert_eq!(selection.retained, 4);
    }

    #[test]
    fn test_empty_curve() {
        let selection = selector().select(&[]);
        assert_eq!(selection.threshold, None);
        assert_eq!(selection.retained, 0);
    }

    #[test]
    fn test_single_point() {
        let selection = ElbowSelector::new(true, 0).select(&[42.0]);
        assert_eq!(selection.knee_index, Some(0));
        assert_eq!(selection.threshold, Some(42.0));
        assert_eq!(selection.retained, 1);
    }

    #[test]
    fn test_short_curve_keeps_everything() {
        let selection = selector().select(&[80.0, 10.0]);
        assert_eq!(selection.knee_index, None);
        assert_eq!(selection.threshold, Some(10.0));
        assert_eq!(selection.retained, 2);
    }

    #[test]
    fn test_disabled_keeps_everything() {
        let selection = ElbowSelector::new(false, 3).select(&[90.0, 85.0, 20.0, 15.0, 10.0]);
        assert_eq!(selection.threshold, Some(10.0));
        assert_eq!(selection.retained, 5);
    }

    #[test]
    fn test_knee_above_chord_is_cutoff() {
        // Convex head: the farthest point sits above the chord
        let selection = selector().select(&[100.0, 95.0, 90.0, 85.0, 10.0]);
        assert_eq!(selection.knee_index, Some(3));
        assert_eq!(selection.cutoff_index, Some(3));
        assert_eq!(selection.retained, 4);
    }

    #[test]
    fn test_ties_at_threshold_are_retained() {
        let selection = selector().select(&[90.0, 85.0, 85.0, 20.0, 15.0, 10.0]);
        let threshold = selection.threshold.unwrap();
        assert!(threshold <= 85.0);
        assert!(selection.retained >= 3);
    }

    #[test]
    fn test_retained_is_prefix() {
        let scores = [97.0, 71.0, 64.0, 30.0, 29.5, 12.0, 3.0];
        let selection = selector().select(&scores);
        let threshold = selection.threshold.unwrap();
        assert!(scores[..selection.retained].iter().all(|s| *s >= threshold));
        assert!(scores[selection.retained..].iter().all(|s| *s < threshold));
    }

    #[test]
    fn test_distances_zero_on_chord() {
        let distances = perpendicular_distances(&[30.0, 20.0, 10.0]);
        assert!(distances.iter().all(|d| d.abs() < 1e-9));
    }

    #[test]
    fn test_find_knee_first_on_ties() {
        // Symmetric bumps at 1 and 3
        assert_eq!(find_knee(&[10.0, 20.0, 10.0, 20.0, 10.0]), Some(1));
        assert_eq!(find_knee(&[]), None);
    }
}
