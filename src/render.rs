use crate::classify::{LEGEND_ORDER, UNMAPPED_COLOR};
use crate::config::{AppConfig, OutputConfig};
use crate::label::label_lines;
use crate::types::{HAlign, MapLayers};
use anyhow::{anyhow, Context, Result};
use geo::{BoundingRect, Centroid, Coord, MultiPolygon, Rect};
use image::RgbaImage;
use resvg::{tiny_skia, usvg};
use std::fmt::Write;
use std::fs;
use std::sync::Arc;
use tracing::{info, warn};

// Font sizes are given in points at 100 dpi, like a plotting figure.
const PX_PER_PT: f64 = 100.0 / 72.0;
const MARGIN: f64 = 40.0;
const EDGE_WIDTH: f64 = 0.7;
const LINE_SPACING: f64 = 1.3;
// Average glyph advance as a fraction of the font size, used to size boxes.
const CHAR_WIDTH: f64 = 0.55;
const LEGEND_COLUMNS: usize = 4;
const LEGEND_TITLE: &str = "Archive Status Categories";
const FONT_FAMILY: &str = "DejaVu Sans, Arial, Helvetica, sans-serif";
const BOX_FILL: &str = r##"fill="#ffffff" fill-opacity="0.95""##;

fn outline() -> String {
    format!(r##"stroke="#000000" stroke-width="{EDGE_WIDTH}""##)
}

/// Renders the map and writes it to `config.output.image`. The image is fully
/// composed before the file is created.
pub fn render(config: &AppConfig, layers: &MapLayers) -> Result<()> {
    let output = &config.output;
    let scene = build_svg(config, layers)?;

    let is_svg = output
        .image
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));

    let encoded = if is_svg {
        None
    } else {
        Some(rasterize(&scene, output.width, output.height)?)
    };

    if let Some(parent) = output.image.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }

    match encoded {
        None => fs::write(&output.image, scene)
            .with_context(|| format!("Failed to write SVG: {:?}", output.image))?,
        Some(img) => img
            .save(&output.image)
            .with_context(|| format!("Failed to save image: {:?}", output.image))?,
    }

    info!("Wrote {:?}", output.image);
    Ok(())
}

/// Linear lon/lat -> pixel mapping that keeps the aspect ratio and flips y.
#[derive(Debug, Clone, Copy)]
struct Projection {
    min_x: f64,
    max_y: f64,
    scale: f64,
    origin_x: f64,
    origin_y: f64,
}

impl Projection {
    fn fit(bounds: Rect<f64>, frame: Rect<f64>) -> Result<Self> {
        let (data_w, data_h) = (bounds.width(), bounds.height());
        if data_w <= 0.0 && data_h <= 0.0 {
            return Err(anyhow!("Map geometry has an empty extent"));
        }

        let sx = if data_w > 0.0 { frame.width() / data_w } else { f64::INFINITY };
        let sy = if data_h > 0.0 { frame.height() / data_h } else { f64::INFINITY };
        let scale = sx.min(sy);

        Ok(Self {
            min_x: bounds.min().x,
            max_y: bounds.max().y,
            scale,
            origin_x: frame.min().x + (frame.width() - data_w * scale) / 2.0,
            origin_y: frame.min().y + (frame.height() - data_h * scale) / 2.0,
        })
    }

    fn project(&self, c: Coord<f64>) -> (f64, f64) {
        (
            self.origin_x + (c.x - self.min_x) * self.scale,
            self.origin_y + (self.max_y - c.y) * self.scale,
        )
    }
}

struct Label {
    centroid: Coord<f64>,
    anchor: Coord<f64>,
    align: HAlign,
    leader: bool,
    lines: Vec<String>,
}

struct LegendLayout {
    rows: usize,
    font_px: f64,
    row_h: f64,
    swatch_w: f64,
    col_w: f64,
    pad: f64,
    width: f64,
    height: f64,
}

impl LegendLayout {
    fn new(output: &OutputConfig) -> Self {
        let font_px = output.legend_font_size * PX_PER_PT;
        let rows = LEGEND_ORDER.len().div_ceil(LEGEND_COLUMNS);
        let longest = LEGEND_ORDER
            .iter()
            .map(|c| c.display_text().chars().count())
            .max()
            .unwrap_or(0);
        let pad = font_px * 0.6;
        let row_h = font_px * 1.5;
        let swatch_w = font_px * 1.8;
        let col_w = swatch_w + pad + longest as f64 * font_px * CHAR_WIDTH + pad;
        Self {
            rows,
            font_px,
            row_h,
            swatch_w,
            col_w,
            pad,
            width: col_w * LEGEND_COLUMNS as f64 + pad * 2.0,
            height: row_h * (rows + 1) as f64 + pad * 2.0,
        }
    }
}

fn extend(bounds: Option<Rect<f64>>, rect: Rect<f64>) -> Rect<f64> {
    match bounds {
        None => rect,
        Some(b) => Rect::new(
            Coord { x: b.min().x.min(rect.min().x), y: b.min().y.min(rect.min().y) },
            Coord { x: b.max().x.max(rect.max().x), y: b.max().y.max(rect.max().y) },
        ),
    }
}

fn collect_labels(config: &AppConfig, layers: &MapLayers) -> Vec<Label> {
    let mut labels = Vec::new();
    for region in &layers.regions {
        let Some(centroid) = region.geometry.centroid() else {
            warn!("{} has no centroid, skipping its label", region.canonical_name);
            continue;
        };
        let centroid = centroid.0;
        let placement = config.placement_for(&region.canonical_name);
        labels.push(Label {
            centroid,
            anchor: Coord { x: centroid.x + placement.dx, y: centroid.y + placement.dy },
            align: placement.align,
            leader: placement.has_leader(),
            lines: label_lines(region),
        });
    }
    labels
}

/// Composes the full map as an SVG document.
pub fn build_svg(config: &AppConfig, layers: &MapLayers) -> Result<String> {
    let output = &config.output;
    let (width, height) = (output.width as f64, output.height as f64);
    let legend = LegendLayout::new(output);
    let labels = collect_labels(config, layers);

    let shapes = layers
        .unmatched
        .iter()
        .map(|g| &g.geometry)
        .chain(layers.regions.iter().map(|r| &r.geometry));
    let mut bounds = None;
    for shape in shapes {
        if let Some(rect) = shape.bounding_rect() {
            bounds = Some(extend(bounds, rect));
        }
    }
    for label in &labels {
        bounds = Some(extend(bounds, Rect::new(label.anchor, label.anchor)));
    }
    let bounds = bounds.ok_or_else(|| anyhow!("Nothing to draw: no region geometry"))?;

    let frame = Rect::new(
        Coord { x: MARGIN, y: MARGIN },
        Coord {
            x: (width - MARGIN).max(MARGIN + 1.0),
            y: (height - legend.height - MARGIN * 2.0).max(MARGIN + 1.0),
        },
    );
    let projection = Projection::fit(bounds, frame)?;

    let mut svg = String::new();
    writeln!(
        svg,
        r#"<svg xmlns="{}" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="{}">"#,
        "http://www.w3.org/2000/svg",
        FONT_FAMILY,
        w = output.width,
        h = output.height,
    )?;
    writeln!(svg, r##"<rect width="{width}" height="{height}" fill="#ffffff"/>"##)?;

    writeln!(svg, r#"<g id="regions" {} stroke-linejoin="round">"#, outline())?;
    for region in &layers.unmatched {
        let name = &region.region_name;
        write_region(&mut svg, &projection, &region.geometry, UNMAPPED_COLOR, name)?;
    }
    for region in &layers.regions {
        let name = &region.canonical_name;
        write_region(&mut svg, &projection, &region.geometry, region.color, name)?;
    }
    writeln!(svg, "</g>")?;

    let font_px = output.label_font_size * PX_PER_PT;
    writeln!(svg, r#"<g id="labels" font-size="{font_px:.1}">"#)?;
    for label in &labels {
        write_label(&mut svg, &projection, label, font_px)?;
    }
    writeln!(svg, "</g>")?;

    write_legend(&mut svg, &legend, width, height)?;
    writeln!(svg, "</svg>")?;

    Ok(svg)
}

fn write_region(
    svg: &mut String,
    projection: &Projection,
    geometry: &MultiPolygon<f64>,
    fill: &str,
    name: &str,
) -> Result<()> {
    let mut d = String::new();
    for polygon in geometry {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            for (i, coord) in ring.coords().enumerate() {
                let (x, y) = projection.project(*coord);
                write!(d, "{}{:.2},{:.2} ", if i == 0 { "M" } else { "L" }, x, y)?;
            }
            d.push('Z');
        }
    }
    writeln!(
        svg,
        r#"<path d="{}" fill="{}" fill-rule="evenodd"><title>{}</title></path>"#,
        d.trim_end(),
        fill,
        xml_escape(name)
    )?;
    Ok(())
}

fn write_label(
    svg: &mut String,
    projection: &Projection,
    label: &Label,
    font_px: f64,
) -> Result<()> {
    let (cx, cy) = projection.project(label.centroid);
    let (ax, ay) = projection.project(label.anchor);

    let pad = font_px * 0.5;
    let line_h = font_px * LINE_SPACING;
    let longest = label.lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let text_w = longest as f64 * font_px * CHAR_WIDTH;
    let text_h = line_h * label.lines.len() as f64;

    // Lines are left-aligned inside the block; the block itself follows `align`.
    let left = match label.align {
        HAlign::Left => ax,
        HAlign::Center => ax - text_w / 2.0,
        HAlign::Right => ax - text_w,
    };

    if label.leader {
        writeln!(
            svg,
            r#"<line x1="{cx:.2}" y1="{cy:.2}" x2="{ax:.2}" y2="{ay:.2}" {}/>"#,
            outline()
        )?;
    }
    writeln!(
        svg,
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.1}" {BOX_FILL} {}/>"#,
        left - pad,
        ay,
        text_w + pad * 2.0,
        text_h + pad * 2.0,
        pad * 0.6,
        outline(),
    )?;
    write!(svg, "<text>")?;
    for (i, line) in label.lines.iter().enumerate() {
        let baseline = ay + pad + font_px + line_h * i as f64;
        write!(svg, r#"<tspan x="{left:.2}" y="{baseline:.2}">{}</tspan>"#, xml_escape(line))?;
    }
    writeln!(svg, "</text>")?;
    Ok(())
}

fn write_legend(svg: &mut String, legend: &LegendLayout, width: f64, height: f64) -> Result<()> {
    let left = (width - legend.width) / 2.0;
    let top = height - MARGIN - legend.height;

    writeln!(svg, r#"<g id="legend" font-size="{:.1}">"#, legend.font_px)?;
    write!(
        svg,
        r#"<rect x="{left:.2}" y="{top:.2}" width="{:.2}" height="{:.2}" rx="4""#,
        legend.width, legend.height,
    )?;
    writeln!(svg, r##" {BOX_FILL} stroke="#cccccc"/>"##)?;
    writeln!(
        svg,
        r#"<text x="{:.2}" y="{:.2}" text-anchor="middle">{}</text>"#,
        width / 2.0,
        top + legend.pad + legend.font_px,
        LEGEND_TITLE
    )?;

    // Filled column by column.
    for (i, category) in LEGEND_ORDER.iter().enumerate() {
        let col = i / legend.rows;
        let row = i % legend.rows;
        let x = left + legend.pad + col as f64 * legend.col_w;
        let y = top + legend.pad + legend.row_h * (row + 1) as f64;
        let swatch_h = legend.font_px * 0.9;
        writeln!(
            svg,
            r#"<rect x="{x:.2}" y="{:.2}" width="{:.2}" height="{swatch_h:.2}" fill="{}" {}/>"#,
            y + (legend.row_h - swatch_h) / 2.0,
            legend.swatch_w,
            category.color(),
            outline(),
        )?;
        writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}">{}</text>"#,
            x + legend.swatch_w + legend.pad,
            y + legend.row_h / 2.0 + legend.font_px * 0.35,
            xml_escape(category.display_text())
        )?;
    }
    writeln!(svg, "</g>")?;
    Ok(())
}

fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn rasterize(svg: &str, width: u32, height: u32) -> Result<RgbaImage> {
    let mut fontdb = usvg::fontdb::Database::new();
    fontdb.load_system_fonts();
    if fontdb.len() == 0 {
        warn!("No system fonts found; labels and legend text will be missing");
    }

    let mut opt = usvg::Options::default();
    opt.fontdb = Arc::new(fontdb);

    let tree = usvg::Tree::from_str(svg, &opt)
        .map_err(|e| anyhow!("Failed to parse map SVG: {}", e))?;
    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("Invalid image size {}x{}", width, height))?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    // Opaque background, so premultiplied and straight RGBA agree.
    RgbaImage::from_raw(width, height, pixmap.take())
        .ok_or_else(|| anyhow!("Failed to build {}x{} image buffer", width, height))
}
