use futures::executor::block_on;
use serde::Serialize;
use sprig::render::raster::{self, RasterError, RasterOptions};
use sprig::render::{
    LayoutPoint, SvgRenderOptions, TreeLayout, Viewport, ZoomBehavior, ZoomTransform,
    initial_transform, layout_tree, render_svg,
};
use sprig::{
    Node, PlaceholderSuggestions, SequentialIdGenerator, Session, SprigConfig, StaticSuggestions,
    SuggestionService,
};
use std::io::{BufRead, Read, Write};
use std::str::FromStr;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Core(sprig::Error),
    Render(sprig::render::Error),
    Raster(RasterError),
    Json(serde_json::Error),
    Script { line: usize, message: String },
    ScriptFailed { failures: usize },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Core(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::Raster(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Script { line, message } => write!(f, "line {line}: {message}"),
            CliError::ScriptFailed { failures: 1 } => write!(f, "1 script line failed"),
            CliError::ScriptFailed { failures } => write!(f, "{failures} script lines failed"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<sprig::Error> for CliError {
    fn from(value: sprig::Error) -> Self {
        Self::Core(value)
    }
}

impl From<sprig::render::Error> for CliError {
    fn from(value: sprig::render::Error) -> Self {
        Self::Render(value)
    }
}

impl From<RasterError> for CliError {
    fn from(value: RasterError) -> Self {
        Self::Raster(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Render,
    Edit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum RenderFormat {
    #[default]
    Svg,
    Png,
    Json,
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    render_format: RenderFormat,
    viewport_width: f64,
    viewport_height: f64,
    selected: Option<String>,
    config: Option<String>,
    out: Option<String>,
    deterministic_ids: bool,
    suggestions: Option<Vec<String>>,
}

#[derive(Serialize)]
struct LayoutOut<'a> {
    viewport: Viewport,
    transform: ZoomTransform,
    layout: &'a TreeLayout,
}

fn usage() -> &'static str {
    "sprig-cli\n\
\n\
USAGE:\n\
  sprig-cli [render] [--format svg|png|json] [--viewport-width <w>] [--viewport-height <h>] [--selected <id>] [--config <path>] [--out <path>] [<path>|-]\n\
  sprig-cli edit [--config <path>] [--deterministic-ids] [--suggestions <a,b,c>] [--viewport-width <w>] [--viewport-height <h>] [<script>|-]\n\
\n\
EDIT COMMANDS (one per line, '#' starts a comment):\n\
  start <topic>            create a new map\n\
  select <id>              select a node and fetch suggestions\n\
  add <parent-id> <name>   add a child node\n\
  add! <name>              add a child under the selected node\n\
  accept <n>               add suggestion n (1-based) under the selected node\n\
  undo | redo\n\
  import <path>            load an exported JSON map\n\
  export json|svg|png <path>\n\
  show | suggestions | status\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - render reads an exported JSON map and prints SVG to stdout by default; use --out to write a file.\n\
  - PNG output defaults to writing next to the input file (or ./out.png for stdin).\n\
  - edit exports SVG/PNG with the view set by zoom/pan; the exit code is 1 if any script line failed.\n\
  - Set SPRIG_LOG (e.g. SPRIG_LOG=debug) to see session logs on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        command: Command::Render,
        render_format: RenderFormat::Svg,
        viewport_width: 800.0,
        viewport_height: 600.0,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "render" => args.command = Command::Render,
            "edit" => args.command = Command::Edit,
            "--deterministic-ids" => args.deterministic_ids = true,
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.render_format = fmt
                    .parse::<RenderFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--viewport-width" => {
                let Some(w) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.viewport_width = w.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
            }
            "--viewport-height" => {
                let Some(h) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.viewport_height = h.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
            }
            "--selected" => {
                let Some(id) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.selected = Some(id.clone());
            }
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--suggestions" => {
                let Some(list) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.suggestions = Some(
                    list.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect(),
                );
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn load_config(path: Option<&str>) -> Result<SprigConfig, CliError> {
    let Some(path) = path else {
        return Ok(SprigConfig::default());
    };
    let text = std::fs::read_to_string(path)?;
    let overrides: serde_json::Value = serde_json::from_str(&text)?;
    Ok(SprigConfig::with_overrides(&overrides))
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None | Some("-") => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn write_bytes(bytes: &[u8], out: &str) -> Result<(), CliError> {
    if out == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(bytes)?;
        stdout.flush()?;
    } else {
        std::fs::write(out, bytes)?;
    }
    Ok(())
}

fn default_raster_out_path(input: Option<&str>, ext: &str) -> std::path::PathBuf {
    match input {
        Some(path) if path != "-" => std::path::PathBuf::from(path).with_extension(ext),
        _ => std::path::PathBuf::from(format!("out.{ext}")),
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("SPRIG_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_render(args: &Args) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let text = read_input(args.input.as_deref())?;
    let root = Node::from_json_str(&text)?;
    if let Some(id) = args.selected.as_deref() {
        if !root.contains(id) {
            return Err(sprig::Error::NodeNotFound { id: id.to_string() }.into());
        }
    }

    let viewport = Viewport::new(args.viewport_width, args.viewport_height);
    let layout = layout_tree(&root, viewport, &config).map_err(sprig::render::Error::from)?;
    let options =
        SvgRenderOptions::from_config(viewport, &config).with_selected(args.selected.as_deref());

    match args.render_format {
        RenderFormat::Json => {
            let out = LayoutOut {
                viewport,
                transform: options.resolve_transform(&layout),
                layout: &layout,
            };
            let mut text = serde_json::to_string_pretty(&out)?;
            text.push('\n');
            write_text(&text, args.out.as_deref())
        }
        RenderFormat::Svg => {
            let svg = render_svg(&layout, &options);
            write_text(&svg, args.out.as_deref())
        }
        RenderFormat::Png => {
            let svg = render_svg(&layout, &options);
            let bytes = raster::svg_to_png(&svg, &RasterOptions::from_config(&config))?;
            let out = args.out.clone().unwrap_or_else(|| {
                default_raster_out_path(args.input.as_deref(), "png")
                    .to_string_lossy()
                    .to_string()
            });
            write_bytes(&bytes, &out)
        }
    }
}

/// Line-oriented driver for an editing [`Session`].
struct Editor<'a> {
    session: Session,
    service: Box<dyn SuggestionService>,
    config: SprigConfig,
    viewport: Viewport,
    /// Pan/zoom set by `zoom`/`pan`; `None` is the initial view of the current map.
    view: Option<ZoomTransform>,
    out: &'a mut dyn Write,
}

impl Editor<'_> {
    fn exec(&mut self, line: &str) -> Result<(), CliError> {
        let line = line.trim();
        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };

        match cmd {
            "start" => {
                self.session.start(rest)?;
                self.view = None;
                writeln!(self.out, "started {rest:?}")?;
            }
            "select" => {
                block_on(self.session.fetch_suggestions(rest, self.service.as_ref()))?;
                self.print_suggestions()?;
            }
            "add" => {
                let Some((parent, name)) = rest.split_once(char::is_whitespace) else {
                    return Err(script_usage("add <parent-id> <name>"));
                };
                let id = self.session.add_node(parent, name)?;
                writeln!(self.out, "added {id}")?;
            }
            "add!" => {
                let id = self.session.add_to_selected(rest)?;
                writeln!(self.out, "added {id}")?;
            }
            "accept" => {
                let n: usize = rest
                    .parse()
                    .map_err(|_| script_usage("accept <n> (1-based)"))?;
                let index = n
                    .checked_sub(1)
                    .ok_or_else(|| script_usage("accept <n> (1-based)"))?;
                let id = self.session.accept_suggestion(index)?;
                writeln!(self.out, "added {id}")?;
            }
            "undo" => {
                let moved = self.session.undo();
                writeln!(self.out, "{}", if moved { "undone" } else { "nothing to undo" })?;
            }
            "redo" => {
                let moved = self.session.redo();
                writeln!(self.out, "{}", if moved { "redone" } else { "nothing to redo" })?;
            }
            "import" => {
                let text = std::fs::read_to_string(rest)?;
                self.session.import_json(&text)?;
                self.view = None;
                writeln!(self.out, "imported {rest}")?;
            }
            "export" => {
                let Some((format, path)) = rest.split_once(char::is_whitespace) else {
                    return Err(script_usage("export json|svg|png <path>"));
                };
                let path = path.trim();
                match format.parse::<RenderFormat>() {
                    Ok(RenderFormat::Json) => {
                        std::fs::write(path, self.session.export_json()?)?;
                    }
                    Ok(RenderFormat::Svg) => {
                        let svg = sprig::render::export_svg(
                            &self.session,
                            self.viewport,
                            &self.config,
                            self.view,
                        )?;
                        std::fs::write(path, svg)?;
                    }
                    Ok(RenderFormat::Png) => {
                        let bytes = raster::export_png(
                            &self.session,
                            self.viewport,
                            &self.config,
                            self.view,
                            &RasterOptions::from_config(&self.config),
                        )?;
                        std::fs::write(path, bytes)?;
                    }
                    Err(()) => return Err(script_usage("export json|svg|png <path>")),
                }
                writeln!(self.out, "exported {path}")?;
            }
            "show" => {
                let root = self.session.current().ok_or(sprig::Error::NoMindMap)?;
                let selected = self.session.selected().map(|s| s.node_id.as_str());
                write_outline(self.out, root, 0, selected)?;
            }
            "suggestions" => self.print_suggestions()?,
            "zoom" => {
                let factor = rest
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f > 0.0)
                    .ok_or_else(|| script_usage("zoom <factor>"))?;
                let centre = LayoutPoint::new(self.viewport.width / 2.0, self.viewport.height / 2.0);
                let view = ZoomBehavior::from_config(&self.config).scale_by(
                    self.current_view()?,
                    factor,
                    centre,
                );
                self.view = Some(view);
                writeln!(self.out, "view {view}")?;
            }
            "pan" => {
                let offsets: Vec<f64> = rest
                    .split_whitespace()
                    .map(str::parse::<f64>)
                    .collect::<Result<_, _>>()
                    .map_err(|_| script_usage("pan <dx> <dy>"))?;
                let &[dx, dy] = offsets.as_slice() else {
                    return Err(script_usage("pan <dx> <dy>"));
                };
                let view = ZoomBehavior::from_config(&self.config).pan(self.current_view()?, dx, dy);
                self.view = Some(view);
                writeln!(self.out, "view {view}")?;
            }
            "status" => {
                let h = self.session.history();
                let cursor = if h.is_empty() {
                    "-".to_string()
                } else {
                    (h.cursor() + 1).to_string()
                };
                writeln!(
                    self.out,
                    "history {cursor}/{} undo={} redo={} selected={} suggestions={}",
                    h.len(),
                    self.session.can_undo(),
                    self.session.can_redo(),
                    self.session
                        .selected()
                        .map(|s| s.node_id.as_str())
                        .unwrap_or("-"),
                    self.session.suggestions().len()
                )?;
            }
            _ => return Err(script_usage("unknown command (see --help)")),
        }
        Ok(())
    }

    fn current_view(&self) -> Result<ZoomTransform, CliError> {
        if let Some(view) = self.view {
            return Ok(view);
        }
        let root = self.session.current().ok_or(sprig::Error::NoMindMap)?;
        let layout = layout_tree(root, self.viewport, &self.config)
            .map_err(sprig::render::Error::from)?;
        Ok(initial_transform(&layout, self.viewport, &self.config))
    }

    fn print_suggestions(&mut self) -> Result<(), CliError> {
        if self.session.suggestions().is_empty() {
            writeln!(self.out, "no suggestions")?;
        }
        for (i, s) in self.session.suggestions().iter().enumerate() {
            writeln!(self.out, "{}. {s}", i + 1)?;
        }
        Ok(())
    }
}

fn script_usage(message: &str) -> CliError {
    CliError::Script {
        line: 0,
        message: message.to_string(),
    }
}

fn write_outline(
    out: &mut dyn Write,
    node: &Node,
    depth: usize,
    selected: Option<&str>,
) -> std::io::Result<()> {
    let marker = if selected == Some(node.id.as_str()) {
        " *"
    } else {
        ""
    };
    writeln!(
        out,
        "{:indent$}- {} [{}]{marker}",
        "",
        node.name,
        node.id,
        indent = depth * 2
    )?;
    for child in &node.children {
        write_outline(out, child, depth + 1, selected)?;
    }
    Ok(())
}

fn run_edit(args: &Args) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let session = if args.deterministic_ids {
        Session::with_id_generator(SequentialIdGenerator::default())
    } else {
        Session::new()
    };
    let service: Box<dyn SuggestionService> = match &args.suggestions {
        Some(items) => Box::new(StaticSuggestions::new(items.iter().cloned())),
        None => Box::new(PlaceholderSuggestions),
    };

    let reader: Box<dyn BufRead> = match args.input.as_deref() {
        None | Some("-") => Box::new(std::io::BufReader::new(std::io::stdin())),
        Some(path) => Box::new(std::io::BufReader::new(std::fs::File::open(path)?)),
    };

    let mut stdout = std::io::stdout().lock();
    let mut editor = Editor {
        session,
        service,
        config,
        viewport: Viewport::new(args.viewport_width, args.viewport_height),
        view: None,
        out: &mut stdout,
    };

    let mut failures = 0usize;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Err(err) = editor.exec(trimmed) {
            let err = match err {
                CliError::Script { message, .. } => CliError::Script {
                    line: i + 1,
                    message,
                },
                other => CliError::Script {
                    line: i + 1,
                    message: other.to_string(),
                },
            };
            eprintln!("{err}");
            failures += 1;
        }
    }
    editor.out.flush()?;
    tracing::debug!(failures, "edit script finished");
    if failures > 0 {
        return Err(CliError::ScriptFailed { failures });
    }
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Render => run_render(&args),
        Command::Edit => run_edit(&args),
    }
}

fn main() {
    init_logging();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
