#![forbid(unsafe_code)]

//! Headless layout and SVG rendering for sprig mind maps.
//!
//! [`layout::layout_tree`] turns a [`sprig_core::Node`] into a left-to-right tidy tree,
//! [`zoom`] holds the pan/zoom view state, and [`svg::render_svg`] draws the result.

pub mod layout;
pub mod model;
mod tidy;
pub mod svg;
pub mod zoom;

pub use layout::layout_tree;
pub use model::{Bounds, LayoutLink, LayoutPoint, PositionedNode, TreeLayout, Viewport};
pub use svg::{SvgRenderOptions, SvgTheme, ensure_svg_namespaces, render_svg};
pub use zoom::{ZoomBehavior, ZoomTransform, hit_test, initial_transform};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("viewport must have a positive, finite size (got {width}x{height})")]
    InvalidViewport { width: f64, height: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
