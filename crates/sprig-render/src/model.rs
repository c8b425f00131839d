use serde::{Deserialize, Serialize};

/// Drawing surface size in device-independent pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut it = points.into_iter();
        let (x0, y0) = it.next()?;
        let mut b = Self {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
        };
        for (x, y) in it {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        Some(b)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutPoint {
    pub x: f64,
    pub y: f64,
}

impl LayoutPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A tree node annotated with its computed position.
///
/// `x` is the breadth-axis coordinate (vertical on screen) and `y` the depth-axis coordinate
/// (horizontal on screen), following the usual hierarchy-layout convention for left-to-right
/// trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionedNode {
    pub id: String,
    pub name: String,
    /// Position in [`TreeLayout::nodes`] (pre-order).
    pub index: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub depth: usize,
    pub x: f64,
    pub y: f64,
}

impl PositionedNode {
    /// Screen-space point (depth horizontal, breadth vertical) before any zoom transform.
    pub fn point(&self) -> LayoutPoint {
        LayoutPoint::new(self.y, self.x)
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutLink {
    pub source: usize,
    pub target: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeLayout {
    /// Pre-order; index 0 is the root.
    pub nodes: Vec<PositionedNode>,
    /// One link per non-root node, in pre-order of the target.
    pub links: Vec<LayoutLink>,
    /// Screen-space bounds of the node centres.
    pub bounds: Option<Bounds>,
}

impl TreeLayout {
    pub fn root(&self) -> Option<&PositionedNode> {
        self.nodes.first()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&PositionedNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// `index` followed by its ancestors up to the root.
    pub fn ancestors(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cur = self.nodes.get(index).map(|n| n.index);
        while let Some(i) = cur {
            out.push(i);
            cur = self.nodes[i].parent;
        }
        out
    }

    /// Root-to-node names, root first.
    pub fn path_names(&self, index: usize) -> Vec<String> {
        self.ancestors(index)
            .into_iter()
            .rev()
            .map(|i| self.nodes[i].name.clone())
            .collect()
    }

    pub fn link_points(&self, link: &LayoutLink) -> Option<(LayoutPoint, LayoutPoint)> {
        let source = self.nodes.get(link.source)?;
        let target = self.nodes.get(link.target)?;
        Some((source.point(), target.point()))
    }
}
