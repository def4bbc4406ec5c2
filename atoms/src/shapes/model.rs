use serde::{Deserialize, Serialize};

/// The three annotation primitives. Wire names match the editor's tool names.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    #[serde(rename = "Rect")]
    Rectangle,
    #[serde(rename = "Circle")]
    Ellipse,
    #[serde(rename = "Arrow")]
    Arrow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Pixel size of the surface the shapes were drawn on.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x <= self.width && p.y <= self.height
    }
}

/// One drawn shape. `points` is `[x1, y1, x2, y2]`:
/// - Rectangle: opposite corners
/// - Ellipse: bounding diagonal (center is the midpoint, radius half its length)
/// - Arrow: shaft start and end
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Shape {
    pub id: u64,
    pub tool: ShapeKind,
    pub points: [f64; 4],
}

impl Shape {
    /// A degenerate shape whose start and end are both `at`. `None` for a
    /// non-finite point.
    pub fn begin(id: u64, tool: ShapeKind, at: Point) -> Option<Self> {
        if !at.is_finite() {
            return None;
        }
        Some(Self {
            id,
            tool,
            points: [at.x, at.y, at.x, at.y],
        })
    }

    /// Move the trailing point. The start pair is never touched. Non-finite
    /// points are ignored and `false` is returned.
    pub fn extend_to(&mut self, to: Point) -> bool {
        if !to.is_finite() {
            return false;
        }
        self.points[2] = to.x;
        self.points[3] = to.y;
        true
    }

    pub fn start(&self) -> Point {
        Point::new(self.points[0], self.points[1])
    }

    pub fn end(&self) -> Point {
        Point::new(self.points[2], self.points[3])
    }

    pub fn ellipse_center(&self) -> Point {
        let [x1, y1, x2, y2] = self.points;
        Point::new((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    }

    pub fn ellipse_radius(&self) -> f64 {
        let [x1, y1, x2, y2] = self.points;
        ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt() / 2.0
    }

    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        let [x1, y1, x2, y2] = self.points;
        Self {
            id: self.id,
            tool: self.tool,
            points: [x1 * sx, y1 * sy, x2 * sx, y2 * sy],
        }
    }
}

/// Ordered shapes over one image. Later shapes draw on top.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct AnnotationSet(Vec<Shape>);

impl AnnotationSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, shape: Shape) {
        self.0.push(shape);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Shape> {
        self.0.iter()
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.0
    }

    /// Serialize to the opaque blob stored on a submission.
    ///
    /// Only finite coordinates survive the trip: JSON has no NaN or infinity,
    /// so serde_json writes them as `null` and the blob no longer decodes.
    /// Shapes built through `Shape::begin` and `Shape::extend_to` never hold
    /// such values.
    pub fn encode(&self) -> String {
        // A Vec of plain numbers and enums cannot fail to serialize.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn try_decode(blob: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(blob)
    }

    /// Decode a stored blob. Empty or malformed input yields an empty set.
    pub fn decode(blob: &str) -> Self {
        if blob.trim().is_empty() {
            return Self::new();
        }
        match Self::try_decode(blob) {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!("Discarding malformed annotation blob: {}", e);
                Self::new()
            }
        }
    }

    /// Map every shape from `from` surface coordinates onto a `to` surface.
    pub fn rescaled(&self, from: SurfaceSize, to: SurfaceSize) -> Self {
        if from.width <= 0.0 || from.height <= 0.0 {
            return self.clone();
        }
        let sx = to.width / from.width;
        let sy = to.height / from.height;
        Self(self.0.iter().map(|s| s.scaled(sx, sy)).collect())
    }
}

impl From<Vec<Shape>> for AnnotationSet {
    fn from(shapes: Vec<Shape>) -> Self {
        Self(shapes)
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a Shape;
    type IntoIter = std::slice::Iter<'a, Shape>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnnotationSet {
        AnnotationSet::from(vec![
            Shape { id: 1, tool: ShapeKind::Rectangle, points: [10.0, 10.0, 50.0, 50.0] },
            Shape { id: 2, tool: ShapeKind::Ellipse, points: [0.1, 0.2, 33.333333333333336, 7.25] },
            Shape { id: 3, tool: ShapeKind::Arrow, points: [-4.0, 1e-9, 120.5, 99.99] },
        ])
    }

    #[test]
    fn decode_inverts_encode() {
        let set = sample();
        assert_eq!(AnnotationSet::decode(&set.encode()), set);
    }

    #[test]
    fn wire_format_uses_tool_names() {
        let set = AnnotationSet::from(vec![Shape {
            id: 1,
            tool: ShapeKind::Rectangle,
            points: [10.0, 10.0, 50.0, 50.0],
        }]);
        let value: serde_json::Value = serde_json::from_str(&set.encode()).unwrap();
        assert_eq!(value, serde_json::json!([{ "id": 1, "tool": "Rect", "points": [10.0, 10.0, 50.0, 50.0] }]));
    }

    #[test]
    fn decodes_blob_written_by_browser_editor() {
        let blob = r#"[{"tool":"Circle","points":[1,2,3,4],"id":1718000000000}]"#;
        let set = AnnotationSet::decode(blob);
        assert_eq!(set.len(), 1);
        assert_eq!(set.shapes()[0].tool, ShapeKind::Ellipse);
        assert_eq!(set.shapes()[0].points, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn malformed_or_empty_blob_decodes_to_empty_set() {
        assert!(AnnotationSet::decode("").is_empty());
        assert!(AnnotationSet::decode("not json").is_empty());
        assert!(AnnotationSet::decode(r#"[{"id":1,"tool":"Star","points":[0,0,0,0]}]"#).is_empty());
        assert!(AnnotationSet::decode(r#"[{"id":1,"tool":"Rect","points":[0,0,0]}]"#).is_empty());
    }

    #[test]
    fn extend_only_moves_trailing_pair() {
        let mut shape = Shape::begin(7, ShapeKind::Arrow, Point::new(3.0, 4.0)).unwrap();
        assert_eq!(shape.points, [3.0, 4.0, 3.0, 4.0]);
        assert!(shape.extend_to(Point::new(10.0, 12.0)));
        assert!(shape.extend_to(Point::new(-5.0, 8.0)));
        assert_eq!(shape.start(), Point::new(3.0, 4.0));
        assert_eq!(shape.end(), Point::new(-5.0, 8.0));
    }

    #[test]
    fn non_finite_points_never_enter_a_shape() {
        assert!(Shape::begin(1, ShapeKind::Rectangle, Point::new(f64::NAN, 0.0)).is_none());
        assert!(Shape::begin(1, ShapeKind::Rectangle, Point::new(0.0, f64::INFINITY)).is_none());

        let mut shape = Shape::begin(1, ShapeKind::Rectangle, Point::new(1.0, 2.0)).unwrap();
        assert!(shape.extend_to(Point::new(30.0, 40.0)));
        assert!(!shape.extend_to(Point::new(f64::NAN, 5.0)));
        assert!(!shape.extend_to(Point::new(5.0, f64::NEG_INFINITY)));
        assert_eq!(shape.points, [1.0, 2.0, 30.0, 40.0]);

        let set = AnnotationSet::from(vec![shape]);
        assert_eq!(AnnotationSet::try_decode(&set.encode()).unwrap(), set);
    }

    #[test]
    fn ellipse_geometry_uses_half_diagonal() {
        let shape = Shape { id: 1, tool: ShapeKind::Ellipse, points: [0.0, 0.0, 6.0, 8.0] };
        assert_eq!(shape.ellipse_center(), Point::new(3.0, 4.0));
        assert_eq!(shape.ellipse_radius(), 5.0);
    }

    #[test]
    fn rescale_maps_display_to_native() {
        let set = AnnotationSet::from(vec![Shape {
            id: 1,
            tool: ShapeKind::Rectangle,
            points: [10.0, 20.0, 50.0, 40.0],
        }]);
        let native = set.rescaled(SurfaceSize::new(100.0, 50.0), SurfaceSize::new(400.0, 200.0));
        assert_eq!(native.shapes()[0].points, [40.0, 80.0, 200.0, 160.0]);
    }
}
