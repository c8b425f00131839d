//! Pan/zoom view state for the rendered tree.

use crate::model::{LayoutPoint, TreeLayout, Viewport};
use crate::svg::fmt;
use serde::{Deserialize, Serialize};
use sprig_core::SprigConfig;

/// Affine view transform: `screen = layout * k + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomTransform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ZoomTransform {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    pub fn new(x: f64, y: f64, k: f64) -> Self {
        Self { x, y, k }
    }

    pub fn apply(&self, p: LayoutPoint) -> LayoutPoint {
        LayoutPoint::new(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    pub fn invert(&self, p: LayoutPoint) -> LayoutPoint {
        LayoutPoint::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
    }

    pub fn translate_by(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.k)
    }
}

impl std::fmt::Display for ZoomTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "translate({},{}) scale({})",
            fmt(self.x),
            fmt(self.y),
            fmt(self.k)
        )
    }
}

/// Scale limits plus the gestures that respect them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomBehavior {
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for ZoomBehavior {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 4.0,
        }
    }
}

impl ZoomBehavior {
    pub fn from_config(config: &SprigConfig) -> Self {
        let d = Self::default();
        let min_scale = config.f64_or("view.minScale", d.min_scale);
        let max_scale = config.f64_or("view.maxScale", d.max_scale);
        if min_scale > 0.0 && max_scale >= min_scale {
            Self {
                min_scale,
                max_scale,
            }
        } else {
            tracing::warn!(min_scale, max_scale, "ignoring invalid zoom extent");
            d
        }
    }

    pub fn clamp_scale(&self, k: f64) -> f64 {
        if k.is_nan() {
            return self.min_scale;
        }
        k.clamp(self.min_scale, self.max_scale)
    }

    pub fn constrain(&self, t: ZoomTransform) -> ZoomTransform {
        ZoomTransform::new(t.x, t.y, self.clamp_scale(t.k))
    }

    /// Scales to `k` keeping the screen point `pivot` fixed.
    pub fn scale_to(&self, t: ZoomTransform, k: f64, pivot: LayoutPoint) -> ZoomTransform {
        let k = self.clamp_scale(k);
        let anchor = t.invert(pivot);
        ZoomTransform::new(pivot.x - anchor.x * k, pivot.y - anchor.y * k, k)
    }

    /// Multiplies the scale by `factor` around `pivot` (wheel / pinch).
    pub fn scale_by(&self, t: ZoomTransform, factor: f64, pivot: LayoutPoint) -> ZoomTransform {
        self.scale_to(t, t.k * factor, pivot)
    }

    /// Drag by a screen-space delta.
    pub fn pan(&self, t: ZoomTransform, dx: f64, dy: f64) -> ZoomTransform {
        self.constrain(t.translate_by(dx, dy))
    }
}

/// View placing the root at `(view.rootAnchorX * width, view.rootAnchorY * height)` at scale
/// `view.initialScale`.
pub fn initial_transform(
    layout: &TreeLayout,
    viewport: Viewport,
    config: &SprigConfig,
) -> ZoomTransform {
    let behavior = ZoomBehavior::from_config(config);
    let k = behavior.clamp_scale(config.f64_or("view.initialScale", 0.8));
    let anchor_x = viewport.width * config.f64_or("view.rootAnchorX", 1.0 / 6.0);
    let anchor_y = viewport.height * config.f64_or("view.rootAnchorY", 0.5);
    let root = layout
        .root()
        .map(|n| n.point())
        .unwrap_or(LayoutPoint::new(0.0, 0.0));
    ZoomTransform::new(anchor_x - root.x * k, anchor_y - root.y * k, k)
}

/// Nearest node whose marker (circle of `radius` layout units) contains the screen point.
pub fn hit_test(
    layout: &TreeLayout,
    transform: &ZoomTransform,
    screen: LayoutPoint,
    radius: f64,
) -> Option<usize> {
    let p = transform.invert(screen);
    let r2 = radius * radius;
    layout
        .nodes
        .iter()
        .map(|n| {
            let c = n.point();
            let (dx, dy) = (c.x - p.x, c.y - p.y);
            (n.index, dx * dx + dy * dy)
        })
        .filter(|&(_, d2)| d2 <= r2)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}
