use crate::model::{Bounds, LayoutLink, PositionedNode, TreeLayout, Viewport};
use crate::tidy::{Hierarchy, tidy_breadth};
use crate::{Error, Result};
use sprig_core::{Node, SprigConfig};

#[derive(Debug, Clone, Copy)]
struct LayoutSpacing {
    reserved_width: f64,
    min_level_spacing: f64,
    min_sibling_spacing: f64,
}

impl LayoutSpacing {
    fn from_config(config: &SprigConfig) -> Self {
        Self {
            reserved_width: config.f64_or("layout.reservedWidth", 300.0).max(0.0),
            min_level_spacing: config.f64_or("layout.minLevelSpacing", 80.0).max(1.0),
            min_sibling_spacing: config.f64_or("layout.minSiblingSpacing", 24.0).max(1.0),
        }
    }
}

/// Lays out `root` as a left-to-right tree for `viewport`.
///
/// The breadth axis is fitted into `[0, viewport.height]` and the depth axis into
/// `[0, viewport.width - layout.reservedWidth]`, except where that would push siblings closer
/// than `layout.minSiblingSpacing` or generations closer than `layout.minLevelSpacing`; then the
/// minimum spacing wins and the diagram grows past the viewport (pan/zoom covers the rest).
///
/// The layout is recomputed from scratch on every call.
pub fn layout_tree(root: &Node, viewport: Viewport, config: &SprigConfig) -> Result<TreeLayout> {
    if !viewport.is_drawable() {
        return Err(Error::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }
    let spacing = LayoutSpacing::from_config(config);

    let h = Hierarchy::new(root);
    let breadth = tidy_breadth(&h);

    // Leftmost / rightmost nodes, as in d3's `tree().size([dx, dy])` normalisation.
    let mut left = 0usize;
    let mut right = 0usize;
    for (i, &x) in breadth.iter().enumerate() {
        if x < breadth[left] {
            left = i;
        }
        if x > breadth[right] {
            right = i;
        }
    }
    let bottom_depth = h.max_depth();

    let s = if left == right {
        1.0
    } else {
        h.separation(left, right) / 2.0
    };
    let tx = s - breadth[left];
    let kx = (viewport.height / (breadth[right] + s + tx)).max(spacing.min_sibling_spacing);
    let depth_extent = viewport.width - spacing.reserved_width;
    let ky = (depth_extent / bottom_depth.max(1) as f64).max(spacing.min_level_spacing);

    let mut nodes: Vec<PositionedNode> = Vec::with_capacity(h.len());
    let mut links: Vec<LayoutLink> = Vec::with_capacity(h.len().saturating_sub(1));
    for i in 0..h.len() {
        nodes.push(PositionedNode {
            id: h.nodes[i].id.clone(),
            name: h.nodes[i].name.clone(),
            index: i,
            parent: h.parent[i],
            children: h.children[i].clone(),
            depth: h.depth[i],
            x: (breadth[i] + tx) * kx,
            y: h.depth[i] as f64 * ky,
        });
        if let Some(parent) = h.parent[i] {
            links.push(LayoutLink {
                source: parent,
                target: i,
            });
        }
    }

    let bounds = Bounds::from_points(nodes.iter().map(|n| (n.y, n.x)));
    tracing::trace!(
        nodes = nodes.len(),
        max_depth = bottom_depth,
        kx,
        ky,
        "tree layout"
    );
    Ok(TreeLayout {
        nodes,
        links,
        bounds,
    })
}
