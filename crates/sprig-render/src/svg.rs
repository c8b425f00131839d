use crate::model::{LayoutPoint, TreeLayout, Viewport};
use crate::zoom::{ZoomTransform, initial_transform};
use regex::Regex;
use sprig_core::SprigConfig;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::sync::OnceLock;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Colours and sizes used when drawing nodes and links.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgTheme {
    pub link_stroke: String,
    pub link_stroke_width: f64,
    pub node_fill: String,
    pub node_stroke: String,
    pub selected_fill: String,
    pub selected_stroke: String,
    pub node_radius: f64,
    pub node_stroke_width: f64,
    pub font_size: f64,
    pub label_color: String,
    pub label_halo: String,
}

impl Default for SvgTheme {
    fn default() -> Self {
        Self::from_config(&SprigConfig::default())
    }
}

impl SvgTheme {
    pub fn from_config(config: &SprigConfig) -> Self {
        Self {
            link_stroke: config.str_or("theme.linkStroke", "#4b5563"),
            link_stroke_width: config.f64_or("theme.linkStrokeWidth", 1.5),
            node_fill: config.str_or("theme.nodeFill", "#10b981"),
            node_stroke: config.str_or("theme.nodeStroke", "#34d399"),
            selected_fill: config.str_or("theme.selectedFill", "#3b82f6"),
            selected_stroke: config.str_or("theme.selectedStroke", "#60a5fa"),
            node_radius: config.f64_or("theme.nodeRadius", 6.0),
            node_stroke_width: config.f64_or("theme.nodeStrokeWidth", 2.0),
            font_size: config.f64_or("theme.fontSize", 14.0),
            label_color: config.str_or("theme.labelColor", "white"),
            label_halo: config.str_or("theme.labelHalo", "#111827"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvgRenderOptions {
    pub viewport: Viewport,
    /// View transform; `None` means the initial (root-anchored) view.
    pub transform: Option<ZoomTransform>,
    /// Node drawn with the selected colours.
    pub selected_id: Option<String>,
    /// `id` attribute of the root `<svg>`.
    pub diagram_id: Option<String>,
    pub theme: SvgTheme,
    view_config: SprigConfig,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self::from_config(Viewport::default(), &SprigConfig::default())
    }
}

impl SvgRenderOptions {
    pub fn from_config(viewport: Viewport, config: &SprigConfig) -> Self {
        Self {
            viewport,
            transform: None,
            selected_id: None,
            diagram_id: None,
            theme: SvgTheme::from_config(config),
            view_config: config.clone(),
        }
    }

    pub fn with_selected(mut self, id: Option<&str>) -> Self {
        self.selected_id = id.map(str::to_string);
        self
    }

    pub fn with_transform(mut self, transform: ZoomTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_diagram_id(mut self, id: impl Into<String>) -> Self {
        self.diagram_id = Some(id.into());
        self
    }

    /// Transform actually used for `layout`.
    pub fn resolve_transform(&self, layout: &TreeLayout) -> ZoomTransform {
        self.transform
            .unwrap_or_else(|| initial_transform(layout, self.viewport, &self.view_config))
    }
}

/// Renders `layout` as a standalone SVG document.
pub fn render_svg(layout: &TreeLayout, options: &SvgRenderOptions) -> String {
    let theme = &options.theme;
    let transform = options.resolve_transform(layout);
    let selected = options.selected_id.as_deref();

    let mut out = String::with_capacity(256 + layout.nodes.len() * 320);
    out.push_str("<svg");
    if let Some(id) = options.diagram_id.as_deref() {
        let _ = write!(&mut out, r#" id="{}""#, escape_xml(id));
    }
    let _ = write!(
        &mut out,
        r#" xmlns="{SVG_NS}" xmlns:xlink="{XLINK_NS}" width="{}" height="{}" viewBox="0 0 {} {}" role="graphics-document document" aria-roledescription="mindmap">"#,
        fmt(options.viewport.width),
        fmt(options.viewport.height),
        fmt(options.viewport.width),
        fmt(options.viewport.height),
    );
    let _ = write!(&mut out, r#"<g class="viewport" transform="{transform}">"#);

    let _ = write!(
        &mut out,
        r#"<g class="links" fill="none" stroke="{}" stroke-width="{}">"#,
        escape_xml(&theme.link_stroke),
        fmt(theme.link_stroke_width)
    );
    for link in &layout.links {
        let Some((source, target)) = layout.link_points(link) else {
            continue;
        };
        out.push_str(r#"<path d=""#);
        link_horizontal_path_into(&mut out, source, target);
        out.push_str(r#""/>"#);
    }
    out.push_str("</g>");

    out.push_str(r#"<g class="nodes">"#);
    for node in &layout.nodes {
        let p = node.point();
        let is_selected = selected == Some(node.id.as_str());
        let (fill, stroke) = if is_selected {
            (&theme.selected_fill, &theme.selected_stroke)
        } else {
            (&theme.node_fill, &theme.node_stroke)
        };
        let (label_x, anchor) = if node.has_children() {
            (-10.0, "end")
        } else {
            (10.0, "start")
        };
        let _ = write!(
            &mut out,
            r#"<g class="node{}" transform="translate({},{})" data-id="{}">"#,
            if is_selected { " selected" } else { "" },
            fmt(p.x),
            fmt(p.y),
            escape_xml(&node.id)
        );
        let _ = write!(
            &mut out,
            r#"<circle r="{}" fill="{}" stroke="{}" stroke-width="{}"/>"#,
            fmt(theme.node_radius),
            escape_xml(fill),
            escape_xml(stroke),
            fmt(theme.node_stroke_width)
        );
        let _ = write!(
            &mut out,
            r#"<text dy="0.31em" x="{}" text-anchor="{anchor}" fill="{}" stroke="{}" stroke-width="3px" stroke-linejoin="round" style="font-size: {}px; paint-order: stroke;">{}</text>"#,
            fmt(label_x),
            escape_xml(&theme.label_color),
            escape_xml(&theme.label_halo),
            fmt(theme.font_size),
            escape_xml(&node.name)
        );
        out.push_str("</g>");
    }
    out.push_str("</g></g></svg>");

    tracing::trace!(
        nodes = layout.nodes.len(),
        bytes = out.len(),
        "rendered svg"
    );
    out
}

/// d3 `linkHorizontal()` path from `source` to `target` (screen-space points).
pub fn link_horizontal_path_d(source: LayoutPoint, target: LayoutPoint) -> String {
    let mut out = String::new();
    link_horizontal_path_into(&mut out, source, target);
    out
}

fn link_horizontal_path_into(out: &mut String, source: LayoutPoint, target: LayoutPoint) {
    let mx = (source.x + target.x) / 2.0;
    out.push('M');
    fmt_path_into(out, source.x);
    out.push(',');
    fmt_path_into(out, source.y);
    out.push('C');
    fmt_path_into(out, mx);
    out.push(',');
    fmt_path_into(out, source.y);
    out.push(',');
    fmt_path_into(out, mx);
    out.push(',');
    fmt_path_into(out, target.y);
    out.push(',');
    fmt_path_into(out, target.x);
    out.push(',');
    fmt_path_into(out, target.y);
}

/// Adds `xmlns` / `xmlns:xlink` to the root `<svg>` element when missing.
pub fn ensure_svg_namespaces(svg: &str) -> Cow<'_, str> {
    static SVG_OPEN_RE: OnceLock<Regex> = OnceLock::new();
    static XMLNS_RE: OnceLock<Regex> = OnceLock::new();
    static XLINK_RE: OnceLock<Regex> = OnceLock::new();
    let open_re = SVG_OPEN_RE.get_or_init(|| Regex::new(r"<svg\b[^>]*>").expect("valid regex"));
    let xmlns_re =
        XMLNS_RE.get_or_init(|| Regex::new(r#"\sxmlns\s*=\s*["']"#).expect("valid regex"));
    let xlink_re =
        XLINK_RE.get_or_init(|| Regex::new(r#"\sxmlns:xlink\s*=\s*["']"#).expect("valid regex"));

    let Some(open) = open_re.find(svg) else {
        return Cow::Borrowed(svg);
    };
    let tag = open.as_str();
    let mut extra = String::new();
    if !xmlns_re.is_match(tag) {
        let _ = write!(&mut extra, r#" xmlns="{SVG_NS}""#);
    }
    if !xlink_re.is_match(tag) {
        let _ = write!(&mut extra, r#" xmlns:xlink="{XLINK_NS}""#);
    }
    if extra.is_empty() {
        return Cow::Borrowed(svg);
    }

    let insert_at = open.start() + "<svg".len();
    let mut out = String::with_capacity(svg.len() + extra.len());
    out.push_str(&svg[..insert_at]);
    out.push_str(&extra);
    out.push_str(&svg[insert_at..]);
    Cow::Owned(out)
}

pub(crate) fn fmt(v: f64) -> String {
    let mut out = String::new();
    fmt_into(&mut out, v);
    out
}

pub(crate) fn fmt_into(out: &mut String, v: f64) {
    // Shortest round-trippable decimal, without `-0` or float noise from our own arithmetic.
    if !v.is_finite() {
        out.push('0');
        return;
    }

    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    if v == -0.0 {
        v = 0.0;
    }

    let _ = write!(out, "{v}");
}

fn fmt_path_into(out: &mut String, v: f64) {
    // Path data keeps at most 3 fractional digits, rounded half-up.
    if !v.is_finite() || v.abs() < 0.0005 {
        out.push('0');
        return;
    }

    let k = (v * 1000.0 + 0.5).floor() as i64;
    if k == 0 {
        out.push('0');
        return;
    }
    if k < 0 {
        out.push('-');
    }
    let abs = k.unsigned_abs();
    let _ = write!(out, "{}", abs / 1000);
    let frac = abs % 1000;
    if frac == 0 {
        return;
    }
    let digits = format!("{frac:03}");
    out.push('.');
    out.push_str(digits.trim_end_matches('0'));
}

/// Escapes markup characters and drops characters XML 1.0 cannot carry at all.
pub(crate) fn escape_xml(text: &str) -> Cow<'_, str> {
    if !text
        .chars()
        .any(|ch| matches!(ch, '&' | '<' | '>' | '"' | '\'') || !is_xml_char(ch))
    {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ if !is_xml_char(ch) => {}
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

// XML 1.0 `Char` production (surrogates cannot occur in a Rust `char`).
fn is_xml_char(ch: char) -> bool {
    matches!(ch, '\t' | '\n' | '\r' | '\u{20}'..='\u{fffd}' | '\u{10000}'..)
}
