use std::collections::HashMap;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use tracing::debug;

use crate::error::TabellError;
use crate::layout::PageLayout;

/// Segments closer than this to horizontal/vertical count as axis-aligned.
const AXIS_TOLERANCE: f64 = 1.0;

/// Filled rectangles thinner than this are drawn rules, not cell shading.
const THIN_RECT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// An axis-aligned drawn line in page space (top-left origin, points).
///
/// `position` is the y of a horizontal ruling or the x of a vertical one;
/// `start..end` is its extent along the other axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ruling {
    pub orientation: Orientation,
    pub position: f32,
    pub start: f32,
    pub end: f32,
}

impl Ruling {
    pub fn horizontal(y: f32, x0: f32, x1: f32) -> Self {
        Ruling {
            orientation: Orientation::Horizontal,
            position: y,
            start: x0.min(x1),
            end: x0.max(x1),
        }
    }

    pub fn vertical(x: f32, y0: f32, y1: f32) -> Self {
        Ruling {
            orientation: Orientation::Vertical,
            position: x,
            start: y0.min(y1),
            end: y0.max(y1),
        }
    }

    pub fn length(&self) -> f32 {
        self.end - self.start
    }
}

/// Maps PDF user space (bottom-left origin) onto the top-left page space
/// the word boxes are reported in.
///
/// `left` and `top` are the MediaBox's x0 and y1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub left: f64,
    pub top: f64,
}

impl PageFrame {
    /// A frame whose MediaBox starts at the origin.
    pub fn from_height(height: f64) -> Self {
        PageFrame {
            left: 0.0,
            top: height,
        }
    }

    fn x(&self, x: f64) -> f64 {
        x - self.left
    }

    fn y(&self, y: f64) -> f64 {
        self.top - y
    }
}

/// Read the drawn rulings of every page that has a layout, keyed by page number.
pub fn read_rulings(
    pdf_path: &Path,
    layouts: &[PageLayout],
) -> Result<HashMap<usize, Vec<Ruling>>, TabellError> {
    let doc = Document::load(pdf_path)?;
    let heights: HashMap<usize, f32> = layouts.iter().map(|l| (l.page_number, l.height)).collect();

    let mut out = HashMap::new();
    for (page_number, page_id) in doc.get_pages() {
        let page_number = page_number as usize;
        let Some(&height) = heights.get(&page_number) else {
            continue;
        };
        let frame = page_frame(&doc, page_id)
            .unwrap_or_else(|| PageFrame::from_height(f64::from(height)));
        let bytes = doc.get_page_content(page_id)?;
        let content = Content::decode(&bytes)?;
        let rulings = rulings_from_operations(&content.operations, frame);
        debug!(page = page_number, rulings = rulings.len(), ?frame, "page rulings");
        out.insert(page_number, rulings);
    }
    Ok(out)
}

/// The page's MediaBox frame, following `Parent` links for inherited boxes.
pub fn page_frame(doc: &Document, page_id: ObjectId) -> Option<PageFrame> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    // bounded walk; a malformed tree may loop
    for _ in 0..32 {
        if let Ok(entry) = node.get(b"MediaBox") {
            let (_, media_box) = doc.dereference(entry).ok()?;
            let corners: Vec<f64> = media_box.as_array().ok()?.iter().filter_map(as_num).collect();
            let [x0, y0, x1, y1] = corners[..] else {
                return None;
            };
            return Some(PageFrame {
                left: x0.min(x1),
                top: y0.max(y1),
            });
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `a` applied first, then `b`.
fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

fn transform(m: &Matrix, x: f64, y: f64) -> (f64, f64) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

type Point = (f64, f64);

#[derive(Default)]
struct PathBuilder {
    segments: Vec<(Point, Point)>,
    rects: Vec<(Point, Point)>,
    current: Option<Point>,
    subpath_start: Option<Point>,
}

impl PathBuilder {
    fn clear(&mut self) {
        *self = PathBuilder::default();
    }
}

/// Collect axis-aligned rulings from decoded content-stream operations.
///
/// Stroked paths contribute every straight segment and rectangle edge. Fills
/// contribute only rectangles thinner than two points, the usual way table
/// rules are drawn by office suites. Form XObjects are not followed.
pub fn rulings_from_operations(operations: &[Operation], frame: PageFrame) -> Vec<Ruling> {
    let mut ctm = IDENTITY;
    let mut stack: Vec<Matrix> = Vec::new();
    let mut path = PathBuilder::default();
    let mut rulings = Vec::new();

    for op in operations {
        let nums: Vec<f64> = op.operands.iter().filter_map(as_num).collect();
        match op.operator.as_str() {
            "q" => stack.push(ctm),
            "Q" => {
                if let Some(saved) = stack.pop() {
                    ctm = saved;
                }
            }
            "cm" if nums.len() == 6 => {
                let m = [nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]];
                ctm = multiply(&m, &ctm);
            }
            "m" if nums.len() == 2 => {
                let p = transform(&ctm, nums[0], nums[1]);
                path.current = Some(p);
                path.subpath_start = Some(p);
            }
            "l" if nums.len() == 2 => {
                let p = transform(&ctm, nums[0], nums[1]);
                if let Some(from) = path.current {
                    path.segments.push((from, p));
                }
                path.current = Some(p);
            }
            "c" | "v" | "y" if nums.len() >= 4 => {
                let n = nums.len();
                path.current = Some(transform(&ctm, nums[n - 2], nums[n - 1]));
            }
            "h" => {
                if let (Some(from), Some(to)) = (path.current, path.subpath_start) {
                    path.segments.push((from, to));
                    path.current = Some(to);
                }
            }
            "re" if nums.len() == 4 => {
                let (x, y, w, h) = (nums[0], nums[1], nums[2], nums[3]);
                let a = transform(&ctm, x, y);
                let b = transform(&ctm, x + w, y + h);
                path.rects.push((a, b));
                path.current = Some(a);
                path.subpath_start = Some(a);
            }
            "S" | "s" | "B" | "B*" | "b" | "b*" => {
                if op.operator == "s" || op.operator.starts_with('b') {
                    if let (Some(from), Some(to)) = (path.current, path.subpath_start) {
                        path.segments.push((from, to));
                    }
                }
                for &(p0, p1) in &path.segments {
                    rulings.extend(segment_ruling(p0, p1, frame));
                }
                for &(a, b) in &path.rects {
                    let (x0, y0, x1, y1) = (a.0.min(b.0), a.1.min(b.1), a.0.max(b.0), a.1.max(b.1));
                    for (p0, p1) in [
                        ((x0, y0), (x1, y0)),
                        ((x0, y1), (x1, y1)),
                        ((x0, y0), (x0, y1)),
                        ((x1, y0), (x1, y1)),
                    ] {
                        rulings.extend(segment_ruling(p0, p1, frame));
                    }
                }
                path.clear();
            }
            "f" | "F" | "f*" => {
                for &(a, b) in &path.rects {
                    rulings.extend(thin_rect_ruling(a, b, frame));
                }
                path.clear();
            }
            "n" => path.clear(),
            _ => {}
        }
    }

    rulings
}

fn segment_ruling(p0: Point, p1: Point, frame: PageFrame) -> Option<Ruling> {
    let (dx, dy) = ((p1.0 - p0.0).abs(), (p1.1 - p0.1).abs());
    if dx.max(dy) < 1.0 {
        return None;
    }
    if dy <= AXIS_TOLERANCE {
        let y = frame.y((p0.1 + p1.1) / 2.0);
        Some(Ruling::horizontal(
            y as f32,
            frame.x(p0.0) as f32,
            frame.x(p1.0) as f32,
        ))
    } else if dx <= AXIS_TOLERANCE {
        let x = frame.x((p0.0 + p1.0) / 2.0);
        Some(Ruling::vertical(
            x as f32,
            frame.y(p0.1) as f32,
            frame.y(p1.1) as f32,
        ))
    } else {
        None
    }
}

fn thin_rect_ruling(a: Point, b: Point, frame: PageFrame) -> Option<Ruling> {
    let (w, h) = ((b.0 - a.0).abs(), (b.1 - a.1).abs());
    if w.min(h) > THIN_RECT {
        return None;
    }
    let (cx, cy) = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
    if w >= h {
        segment_ruling((a.0, cy), (b.0, cy), frame)
    } else {
        segment_ruling((cx, a.1), (cx, b.1), frame)
    }
}

fn as_num(o: &Object) -> Option<f64> {
    match o {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn op(operator: &str, operands: &[f64]) -> Operation {
        Operation::new(
            operator,
            operands.iter().map(|&v| Object::Real(v as f32)).collect(),
        )
    }

    #[test]
    fn test_stroked_line_flipped_to_top_origin() {
        let ops = vec![op("m", &[50.0, 700.0]), op("l", &[300.0, 700.0]), op("S", &[])];
        let rulings = rulings_from_operations(&ops, PageFrame::from_height(800.0));
        assert_eq!(rulings, vec![Ruling::horizontal(100.0, 50.0, 300.0)]);
    }

    #[test]
    fn test_stroked_rect_gives_four_edges() {
        let ops = vec![op("re", &[10.0, 10.0, 100.0, 50.0]), op("S", &[])];
        let rulings = rulings_from_operations(&ops, PageFrame::from_height(100.0));
        assert_eq!(rulings.len(), 4);
        let horizontals = rulings
            .iter()
            .filter(|r| r.orientation == Orientation::Horizontal)
            .count();
        assert_eq!(horizontals, 2);
        assert!(rulings.contains(&Ruling::vertical(10.0, 40.0, 90.0)));
    }

    #[test]
    fn test_thin_filled_rect_is_rule_and_shading_is_not() {
        let ops = vec![
            op("re", &[0.0, 99.5, 200.0, 0.5]),
            op("f", &[]),
            op("re", &[0.0, 0.0, 200.0, 40.0]),
            op("f", &[]),
        ];
        let rulings = rulings_from_operations(&ops, PageFrame::from_height(200.0));
        assert_eq!(rulings.len(), 1);
        assert_eq!(rulings[0].orientation, Orientation::Horizontal);
        assert!((rulings[0].position - 100.25).abs() < 0.01);
    }

    #[test]
    fn test_ctm_translation_and_restore() {
        let ops = vec![
            op("q", &[]),
            op("cm", &[1.0, 0.0, 0.0, 1.0, 100.0, 0.0]),
            op("m", &[0.0, 0.0]),
            op("l", &[0.0, 50.0]),
            op("S", &[]),
            op("Q", &[]),
            op("m", &[0.0, 0.0]),
            op("l", &[0.0, 50.0]),
            op("S", &[]),
        ];
        let rulings = rulings_from_operations(&ops, PageFrame::from_height(100.0));
        assert_eq!(rulings[0], Ruling::vertical(100.0, 50.0, 100.0));
        assert_eq!(rulings[1], Ruling::vertical(0.0, 50.0, 100.0));
    }

    #[test]
    fn test_diagonal_and_discarded_paths_ignored() {
        let ops = vec![
            op("m", &[0.0, 0.0]),
            op("l", &[50.0, 50.0]),
            op("S", &[]),
            op("m", &[0.0, 10.0]),
            op("l", &[90.0, 10.0]),
            op("n", &[]),
        ];
        assert!(rulings_from_operations(&ops, PageFrame::from_height(100.0)).is_empty());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = read_rulings(Path::new("/nonexistent/tabell.pdf"), &[]).unwrap_err();
        assert!(matches!(err, TabellError::Pdf(_) | TabellError::Io(_)));
    }

    #[test]
    fn test_offset_media_box_shifts_rulings() {
        let ops = vec![op("m", &[50.0, 700.0]), op("l", &[300.0, 700.0]), op("S", &[])];
        let frame = PageFrame {
            left: 20.0,
            top: 892.0,
        };
        let rulings = rulings_from_operations(&ops, frame);
        assert_eq!(rulings, vec![Ruling::horizontal(192.0, 30.0, 280.0)]);
    }

    fn int(v: i64) -> Object {
        Object::Integer(v)
    }

    #[test]
    fn test_page_frame_inherited_from_parent() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => int(1),
                "MediaBox" => vec![int(0), int(100), int(612), int(892)],
            }),
        );

        assert_eq!(
            page_frame(&doc, page_id),
            Some(PageFrame {
                left: 0.0,
                top: 892.0
            })
        );
    }

    #[test]
    fn test_page_frame_own_box_wins_and_missing_box_is_none() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let own = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![int(10), int(0), int(600), int(800)],
        });
        let bare = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(own), Object::Reference(bare)],
                "Count" => int(2),
            }),
        );

        assert_eq!(
            page_frame(&doc, own),
            Some(PageFrame {
                left: 10.0,
                top: 800.0
            })
        );
        assert_eq!(page_frame(&doc, bare), None);
    }
}
