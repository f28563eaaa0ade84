//! Geometry helpers shared by the lattice, stream and text-layout detectors.

use crate::layout::Word;

/// Sort `values` and merge those within `tol` of the running cluster mean.
pub fn cluster_positions(mut values: Vec<f32>, tol: f32) -> Vec<f32> {
    values.sort_by(f32::total_cmp);

    let mut clusters: Vec<(f32, usize)> = Vec::new();
    for v in values {
        match clusters.last_mut() {
            Some((sum, n)) if (v - *sum / *n as f32).abs() <= tol => {
                *sum += v;
                *n += 1;
            }
            _ => clusters.push((v, 1)),
        }
    }

    clusters.into_iter().map(|(sum, n)| sum / n as f32).collect()
}

/// Merge intervals that overlap or lie within `tol` of each other.
pub fn merge_intervals(mut intervals: Vec<(f32, f32)>, tol: f32) -> Vec<(f32, f32)> {
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f32, f32)> = Vec::new();
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 + tol => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Index of the interval containing `x`, or of the nearest one.
pub fn interval_index(intervals: &[(f32, f32)], x: f32) -> Option<usize> {
    if let Some(i) = intervals.iter().position(|&(s, e)| x >= s && x <= e) {
        return Some(i);
    }
    intervals
        .iter()
        .enumerate()
        .map(|(i, &(s, e))| (i, (s - x).abs().min((e - x).abs())))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Index `i` such that `bounds[i] <= v < bounds[i + 1]`, if `v` is inside.
pub fn band_index(bounds: &[f32], v: f32) -> Option<usize> {
    let (first, last) = (*bounds.first()?, *bounds.last()?);
    if v < first || v > last {
        return None;
    }
    let i = bounds.partition_point(|&b| b <= v);
    Some(i.saturating_sub(1).min(bounds.len().saturating_sub(2)))
}

/// Join the words of one cell in reading order; separate text lines with `\n`.
pub fn join_words(words: &mut [&Word]) -> String {
    words.sort_by(|a, b| {
        a.bbox
            .center_y()
            .total_cmp(&b.bbox.center_y())
            .then(a.bbox.x_min.total_cmp(&b.bbox.x_min))
    });

    let mut out = String::new();
    let mut line_y: Option<f32> = None;
    let mut line: Vec<&Word> = Vec::new();

    let flush = |out: &mut String, line: &mut Vec<&Word>| {
        if line.is_empty() {
            return;
        }
        line.sort_by(|a, b| a.bbox.x_min.total_cmp(&b.bbox.x_min));
        if !out.is_empty() {
            out.push('\n');
        }
        let text: Vec<&str> = line.iter().map(|w| w.text.as_str()).collect();
        out.push_str(&text.join(" "));
        line.clear();
    };

    for w in words.iter() {
        let cy = w.bbox.center_y();
        let same_line = line_y.is_some_and(|y| (cy - y).abs() <= w.bbox.height().max(1.0) / 2.0);
        if !same_line {
            flush(&mut out, &mut line);
            line_y = Some(cy);
        }
        line.push(*w);
    }
    flush(&mut out, &mut line);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BBox;

    #[test]
    fn test_cluster_positions() {
        let c = cluster_positions(vec![100.0, 10.0, 11.0, 10.5, 99.0], 2.0);
        assert_eq!(c.len(), 2);
        assert!((c[0] - 10.5).abs() < 0.01);
        assert!((c[1] - 99.5).abs() < 0.01);
    }

    #[test]
    fn test_merge_intervals() {
        let merged = merge_intervals(vec![(50.0, 60.0), (0.0, 10.0), (9.0, 20.0), (22.0, 30.0)], 1.0);
        assert_eq!(merged, vec![(0.0, 20.0), (22.0, 30.0), (50.0, 60.0)]);
        let tolerant = merge_intervals(vec![(0.0, 10.0), (12.0, 20.0)], 2.0);
        assert_eq!(tolerant, vec![(0.0, 20.0)]);
    }

    #[test]
    fn test_interval_index_falls_back_to_nearest() {
        let cols = vec![(0.0, 10.0), (50.0, 60.0)];
        assert_eq!(interval_index(&cols, 5.0), Some(0));
        assert_eq!(interval_index(&cols, 40.0), Some(1));
        assert_eq!(interval_index(&[], 40.0), None);
    }

    #[test]
    fn test_band_index() {
        let bounds = vec![0.0, 10.0, 20.0];
        assert_eq!(band_index(&bounds, 5.0), Some(0));
        assert_eq!(band_index(&bounds, 15.0), Some(1));
        assert_eq!(band_index(&bounds, 20.0), Some(1));
        assert_eq!(band_index(&bounds, 25.0), None);
        assert_eq!(band_index(&bounds, -1.0), None);
    }

    #[test]
    fn test_join_words_multiline() {
        let a = Word::new("Unit", BBox::new(10.0, 10.0, 30.0, 20.0));
        let b = Word::new("price", BBox::new(32.0, 10.5, 55.0, 20.5));
        let c = Word::new("(SEK)", BBox::new(10.0, 22.0, 40.0, 32.0));
        let mut words = vec![&c, &b, &a];
        assert_eq!(join_words(&mut words), "Unit price\n(SEK)");
    }
}
