#![forbid(unsafe_code)]

//! `sprig` is a headless mind-map editor core.
//!
//! The editing model (tree snapshots, undo/redo history, the interactive [`Session`]) lives in
//! `sprig-core` and is re-exported here. Layout and drawing are optional.
//!
//! # Features
//!
//! - `render`: tidy-tree layout + SVG rendering (`sprig::render`)
//! - `raster`: PNG output via pure-Rust SVG rasterization

pub use sprig_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use sprig_render::model::{
        Bounds, LayoutLink, LayoutPoint, PositionedNode, TreeLayout, Viewport,
    };
    pub use sprig_render::svg::{
        SvgRenderOptions, SvgTheme, ensure_svg_namespaces, link_horizontal_path_d,
    };
    pub use sprig_render::zoom::{ZoomBehavior, ZoomTransform, hit_test, initial_transform};
    pub use sprig_render::{layout_tree, render_svg};

    use sprig_core::{Node, Session, SprigConfig};

    #[cfg(feature = "raster")]
    pub mod raster;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error(transparent)]
        Core(#[from] sprig_core::Error),
        #[error(transparent)]
        Render(#[from] sprig_render::Error),
    }

    pub type Result<T> = std::result::Result<T, Error>;

    /// Lays out and draws `root`.
    ///
    /// `transform` is the current pan/zoom; `None` uses the root-anchored initial view.
    pub fn render_tree_svg(
        root: &Node,
        viewport: Viewport,
        config: &SprigConfig,
        selected_id: Option<&str>,
        transform: Option<ZoomTransform>,
    ) -> Result<String> {
        let layout = layout_tree(root, viewport, config)?;
        let mut options =
            SvgRenderOptions::from_config(viewport, config).with_selected(selected_id);
        if let Some(transform) = transform {
            options = options.with_transform(transform);
        }
        Ok(render_svg(&layout, &options))
    }

    /// Draws the session's current snapshot, highlighting the selected node.
    pub fn render_session_svg(
        session: &Session,
        viewport: Viewport,
        config: &SprigConfig,
        transform: Option<ZoomTransform>,
    ) -> Result<String> {
        let root = session.current().ok_or(sprig_core::Error::NoMindMap)?;
        let selected = session.selected().map(|s| s.node_id.as_str());
        render_tree_svg(root, viewport, config, selected, transform)
    }

    /// Standalone SVG document for saving to disk (namespaces guaranteed).
    pub fn export_svg(
        session: &Session,
        viewport: Viewport,
        config: &SprigConfig,
        transform: Option<ZoomTransform>,
    ) -> Result<String> {
        let svg = render_session_svg(session, viewport, config, transform)?;
        Ok(ensure_svg_namespaces(&svg).into_owned())
    }
}
