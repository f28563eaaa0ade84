use crate::extraction::grid::{band_index, cluster_positions, join_words};
use crate::layout::rulings::{Orientation, Ruling};
use crate::layout::{PageLayout, Word};
use crate::model::RawTable;

/// Rulings closer than this (points) are the same line.
const SNAP: f32 = 2.0;

/// Detect ruled tables on one page.
///
/// `line_scale` sets the shortest ruling considered: `page_width / line_scale`
/// for horizontal lines and `page_height / line_scale` for vertical ones, so a
/// larger value also accepts shorter, partial rulings.
pub fn lattice_tables(layout: &PageLayout, rulings: &[Ruling], line_scale: f32) -> Vec<RawTable> {
    let min_h = layout.width / line_scale;
    let min_v = layout.height / line_scale;

    let horizontals = merge_collinear(
        rulings
            .iter()
            .filter(|r| r.orientation == Orientation::Horizontal && r.length() >= min_h)
            .copied()
            .collect(),
    );
    let verticals = merge_collinear(
        rulings
            .iter()
            .filter(|r| r.orientation == Orientation::Vertical && r.length() >= min_v)
            .copied()
            .collect(),
    );

    let mut grids: Vec<(Vec<f32>, Vec<f32>)> = connected_components(&horizontals, &verticals)
        .into_iter()
        .filter_map(|(hs, vs)| {
            let ys = cluster_positions(hs.iter().map(|r| r.position).collect(), SNAP);
            let xs = cluster_positions(vs.iter().map(|r| r.position).collect(), SNAP);
            if ys.len() < 2 || xs.len() < 2 || (ys.len() - 1) * (xs.len() - 1) < 2 {
                return None;
            }
            Some((xs, ys))
        })
        .collect();
    grids.sort_by(|a, b| a.1[0].total_cmp(&b.1[0]).then(a.0[0].total_cmp(&b.0[0])));

    grids
        .into_iter()
        .filter_map(|(xs, ys)| fill_grid(layout, &xs, &ys))
        .collect()
}

fn fill_grid(layout: &PageLayout, xs: &[f32], ys: &[f32]) -> Option<RawTable> {
    let (n_rows, n_cols) = (ys.len() - 1, xs.len() - 1);
    let mut cells: Vec<Vec<Vec<&Word>>> = vec![vec![Vec::new(); n_cols]; n_rows];

    let mut placed = 0;
    for word in &layout.words {
        let row = band_index(ys, word.bbox.center_y());
        let col = band_index(xs, word.bbox.center_x());
        if let (Some(r), Some(c)) = (row, col) {
            cells[r][c].push(word);
            placed += 1;
        }
    }
    if placed == 0 {
        return None;
    }

    let rows = cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|mut words| {
                    if words.is_empty() {
                        None
                    } else {
                        Some(join_words(&mut words))
                    }
                })
                .collect()
        })
        .collect();

    Some(RawTable::new(layout.page_number, rows))
}

/// Snap rulings onto shared positions and join overlapping pieces.
fn merge_collinear(mut rulings: Vec<Ruling>) -> Vec<Ruling> {
    rulings.sort_by(|a, b| {
        a.position
            .total_cmp(&b.position)
            .then(a.start.total_cmp(&b.start))
    });

    let mut merged: Vec<Ruling> = Vec::new();
    for r in rulings {
        let joined = merged.iter_mut().rev().find(|m| {
            (m.position - r.position).abs() <= SNAP && r.start <= m.end + SNAP && r.end >= m.start - SNAP
        });
        match joined {
            Some(m) => {
                m.start = m.start.min(r.start);
                m.end = m.end.max(r.end);
            }
            None => merged.push(r),
        }
    }
    merged
}

fn intersects(h: &Ruling, v: &Ruling) -> bool {
    v.position >= h.start - SNAP
        && v.position <= h.end + SNAP
        && h.position >= v.start - SNAP
        && h.position <= v.end + SNAP
}

/// Group rulings that touch each other; each group is one candidate table.
fn connected_components(hs: &[Ruling], vs: &[Ruling]) -> Vec<(Vec<Ruling>, Vec<Ruling>)> {
    // union-find over horizontals (0..hs.len()) followed by verticals
    let mut parent: Vec<usize> = (0..hs.len() + vs.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for (hi, h) in hs.iter().enumerate() {
        for (vi, v) in vs.iter().enumerate() {
            if intersects(h, v) {
                let (a, b) = (find(&mut parent, hi), find(&mut parent, hs.len() + vi));
                if a != b {
                    parent[a] = b;
                }
            }
        }
    }

    let mut groups: Vec<(usize, Vec<Ruling>, Vec<Ruling>)> = Vec::new();
    for i in 0..hs.len() + vs.len() {
        let root = find(&mut parent, i);
        let idx = match groups.iter().position(|g| g.0 == root) {
            Some(idx) => idx,
            None => {
                groups.push((root, Vec::new(), Vec::new()));
                groups.len() - 1
            }
        };
        if i < hs.len() {
            groups[idx].1.push(hs[i]);
        } else {
            groups[idx].2.push(vs[i - hs.len()]);
        }
    }

    groups.into_iter().map(|(_, h, v)| (h, v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BBox;

    fn word(text: &str, x: f32, y: f32) -> Word {
        Word::new(text, BBox::new(x, y, x + 20.0, y + 10.0))
    }

    /// 3 rows x 2 columns between x=100..300 and y=100..160.
    fn ruled_grid() -> Vec<Ruling> {
        let mut rulings = Vec::new();
        for y in [100.0, 120.0, 140.0, 160.0] {
            rulings.push(Ruling::horizontal(y, 100.0, 300.0));
        }
        for x in [100.0, 200.0, 300.0] {
            rulings.push(Ruling::vertical(x, 100.0, 160.0));
        }
        rulings
    }

    fn page(words: Vec<Word>) -> PageLayout {
        PageLayout {
            page_number: 1,
            width: 600.0,
            height: 800.0,
            words,
        }
    }

    #[test]
    fn test_three_by_two_grid() {
        let layout = page(vec![
            word("Item", 110.0, 105.0),
            word("Price", 210.0, 105.0),
            word("Apple", 110.0, 125.0),
            word("3,5", 210.0, 125.0),
            word("Pear", 110.0, 145.0),
            word("4", 210.0, 145.0),
            word("Outside", 400.0, 400.0),
        ]);
        let tables = lattice_tables(&layout, &ruled_grid(), 15.0);
        assert_eq!(tables.len(), 1);
        let rows = &tables[0].rows;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![Some("Item".to_string()), Some("Price".to_string())]);
        assert_eq!(rows[2], vec![Some("Pear".to_string()), Some("4".to_string())]);
    }

    #[test]
    fn test_short_rulings_need_larger_line_scale() {
        // vertical rulings of 60pt: below 800/10 = 80pt, above 800/40 = 20pt
        let layout = page(vec![word("a", 110.0, 105.0), word("b", 210.0, 125.0)]);
        assert!(lattice_tables(&layout, &ruled_grid(), 10.0).is_empty());
        assert_eq!(lattice_tables(&layout, &ruled_grid(), 40.0).len(), 1);
    }

    #[test]
    fn test_empty_cell_is_missing() {
        let layout = page(vec![word("Item", 110.0, 105.0)]);
        let tables = lattice_tables(&layout, &ruled_grid(), 15.0);
        assert_eq!(tables[0].rows[1], vec![None, None]);
    }

    #[test]
    fn test_grid_without_text_is_dropped() {
        let layout = page(vec![word("Outside", 400.0, 400.0)]);
        assert!(lattice_tables(&layout, &ruled_grid(), 15.0).is_empty());
    }

    #[test]
    fn test_single_box_is_not_a_table() {
        let rulings = vec![
            Ruling::horizontal(100.0, 100.0, 300.0),
            Ruling::horizontal(200.0, 100.0, 300.0),
            Ruling::vertical(100.0, 100.0, 200.0),
            Ruling::vertical(300.0, 100.0, 200.0),
        ];
        let layout = page(vec![word("Note", 150.0, 150.0)]);
        assert!(lattice_tables(&layout, &rulings, 15.0).is_empty());
    }

    #[test]
    fn test_broken_rulings_are_merged() {
        let mut rulings = vec![
            Ruling::horizontal(100.0, 100.0, 190.0),
            Ruling::horizontal(100.5, 189.0, 300.0),
        ];
        rulings.extend(ruled_grid().into_iter().skip(1));
        let merged = merge_collinear(
            rulings
                .into_iter()
                .filter(|r| r.orientation == Orientation::Horizontal)
                .collect(),
        );
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[0].start, 100.0);
        assert_eq!(merged[0].end, 300.0);
    }

    #[test]
    fn test_two_separate_tables() {
        let mut rulings = ruled_grid();
        for y in [500.0, 520.0, 540.0] {
            rulings.push(Ruling::horizontal(y, 100.0, 300.0));
        }
        for x in [100.0, 200.0, 300.0] {
            rulings.push(Ruling::vertical(x, 500.0, 540.0));
        }
        let layout = page(vec![word("top", 110.0, 105.0), word("bottom", 110.0, 505.0)]);
        let tables = lattice_tables(&layout, &rulings, 40.0);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].rows[0][0].as_deref(), Some("top"));
        assert_eq!(tables[1].rows[0][0].as_deref(), Some("bottom"));
    }
}
