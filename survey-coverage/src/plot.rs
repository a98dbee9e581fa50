//! Rendering survey footprints onto an all-sky map.
//!
//! The footprint is rasterized on the projection's pixel grid: each pixel
//! centre is deprojected and tested against the MOC. Covered pixels are
//! filled row by row; the border follows the grid edges between covered and
//! uncovered pixels. No text is drawn, so no font backend is needed.

use crate::error::{Result, SurveyError};
use crate::survey::SurveyRecord;
use crate::wcs::SkyProjection;
use celestial_moc::Moc;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// SVG output is drawn at this multiple of the projection size.
const SVG_SCALE: u32 = 2;
const FRAME_SAMPLES: usize = 360;

const DEFAULT_FILL: RGBColor = RGBColor(0x1f, 0x77, 0xb4);

/// Drawing style for the filled region or its border.
///
/// Built from `key=value` pairs. Recognised keys: `color` (or `c`), `alpha`,
/// `linewidth` (or `lw`) and `filled` (or `fill`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleOptions {
    pub color: RGBColor,
    pub alpha: f64,
    pub line_width: u32,
    pub filled: bool,
}

impl StyleOptions {
    pub fn fill() -> Self {
        Self {
            color: DEFAULT_FILL,
            alpha: 0.6,
            line_width: 1,
            filled: true,
        }
    }

    pub fn border() -> Self {
        Self {
            color: BLACK,
            alpha: 0.7,
            line_width: 1,
            filled: false,
        }
    }

    /// Apply `key=value` overrides on top of `self`.
    ///
    /// # Errors
    /// [`SurveyError::InputValidation`] for an unknown key or a value that
    /// cannot be parsed.
    pub fn with_pairs<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in pairs {
            self.set(key.as_ref(), value.as_ref())?;
        }
        Ok(self)
    }

    /// Apply a single `key=value` assignment.
    pub fn with_assignment(self, assignment: &str) -> Result<Self> {
        let (key, value) = split_assignment(assignment)?;
        self.with_pairs([(key, value)])
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key.trim() {
            "color" | "c" => self.color = parse_color(value)?,
            "alpha" => {
                let alpha: f64 = value
                    .parse()
                    .map_err(|_| SurveyError::input(format!("invalid alpha '{}'", value)))?;
                if !(0.0..=1.0).contains(&alpha) {
                    return Err(SurveyError::input(format!(
                        "alpha {} outside [0, 1]",
                        alpha
                    )));
                }
                self.alpha = alpha;
            }
            "linewidth" | "lw" => {
                self.line_width = value
                    .parse()
                    .map_err(|_| SurveyError::input(format!("invalid linewidth '{}'", value)))?;
            }
            "filled" | "fill" => self.filled = parse_bool(value)?,
            other => {
                return Err(SurveyError::input(format!("unknown style key '{}'", other)));
            }
        }
        Ok(())
    }

    fn shape(&self, filled: bool) -> ShapeStyle {
        ShapeStyle {
            color: self.color.mix(self.alpha),
            filled,
            stroke_width: self.line_width,
        }
    }
}

/// What to draw and where.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotOptions {
    pub projection: SkyProjection,
    pub style: StyleOptions,
    /// Border style, or `None` for no border.
    pub border: Option<StyleOptions>,
    /// Outline the projection boundary.
    pub frame: bool,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            projection: SkyProjection::all_sky(),
            style: StyleOptions::fill(),
            border: Some(StyleOptions::border()),
            frame: true,
        }
    }
}

impl SurveyRecord {
    /// Draw this survey's footprint onto `area`.
    ///
    /// The projection's pixel grid is stretched over the whole area, with
    /// pixel row 1 at the bottom.
    ///
    /// # Errors
    /// [`SurveyError::Decode`] if the coverage file cannot be read and
    /// [`SurveyError::Plot`] if the backend fails.
    pub fn plot_coverage<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        options: &PlotOptions,
    ) -> Result<()> {
        let moc = self.moc()?;
        tracing::debug!(survey = %self.name(), "plotting coverage");
        render_moc(moc, area, options)
    }

    /// Render the footprint to a new SVG file at `path`.
    pub fn plot_coverage_svg(&self, path: impl AsRef<Path>, options: &PlotOptions) -> Result<()> {
        let path = path.as_ref();
        let moc = self.moc()?;
        let size = (
            options.projection.width() * SVG_SCALE,
            options.projection.height() * SVG_SCALE,
        );
        let root = SVGBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;
        render_moc(moc, &root, options)?;
        root.present().map_err(plot_error)?;
        tracing::info!(survey = %self.name(), path = %path.display(), "wrote coverage plot");
        Ok(())
    }
}

/// Draw `moc` onto `area` using `options`.
pub fn render_moc<DB: DrawingBackend>(
    moc: &Moc,
    area: &DrawingArea<DB, Shift>,
    options: &PlotOptions,
) -> Result<()> {
    let grid = CoverageGrid::rasterize(moc, &options.projection);
    let device = DeviceMap::new(area, &options.projection);

    if options.style.filled {
        let style = options.style.shape(true);
        for (row, start, end) in grid.runs() {
            let corner_a = device.map(start as f64 + 0.5, row as f64 + 0.5);
            let corner_b = device.map(end as f64 + 1.5, row as f64 + 1.5);
            area.draw(&Rectangle::new([corner_a, corner_b], style))
                .map_err(plot_error)?;
        }
    }

    if let Some(border) = &options.border {
        let style = border.shape(false);
        for ((x0, y0), (x1, y1)) in grid.border_edges() {
            let points = vec![device.map(x0, y0), device.map(x1, y1)];
            area.draw(&PathElement::new(points, style))
                .map_err(plot_error)?;
        }
    }

    if options.frame {
        let points: Vec<(i32, i32)> = options
            .projection
            .frame(FRAME_SAMPLES)
            .into_iter()
            .map(|(x, y)| device.map(x, y))
            .collect();
        area.draw(&PathElement::new(points, BLACK.stroke_width(1)))
            .map_err(plot_error)?;
    }
    Ok(())
}

/// Coverage of each projection pixel, row-major from the bottom row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageGrid {
    width: usize,
    height: usize,
    covered: Vec<bool>,
}

impl CoverageGrid {
    pub fn rasterize(moc: &Moc, projection: &SkyProjection) -> Self {
        let width = projection.width() as usize;
        let height = projection.height() as usize;
        let mut covered = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                let on = projection
                    .pixel_to_sky(col as f64 + 1.0, row as f64 + 1.0)
                    .is_some_and(|(ra, dec)| moc.contains(ra, dec));
                covered.push(on);
            }
        }
        Self {
            width,
            height,
            covered,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the pixel at zero-based `(col, row)` is covered.
    pub fn is_covered(&self, col: usize, row: usize) -> bool {
        col < self.width && row < self.height && self.covered[row * self.width + col]
    }

    pub fn covered_count(&self) -> usize {
        self.covered.iter().filter(|&&c| c).count()
    }

    /// Maximal horizontal runs of covered pixels as `(row, first, last)`.
    pub fn runs(&self) -> Vec<(usize, usize, usize)> {
        let mut runs = Vec::new();
        for row in 0..self.height {
            let mut start = None;
            for col in 0..=self.width {
                match (self.is_covered(col, row), start) {
                    (true, None) => start = Some(col),
                    (false, Some(first)) => {
                        runs.push((row, first, col - 1));
                        start = None;
                    }
                    _ => {}
                }
            }
        }
        runs
    }

    /// Grid edges separating covered from uncovered pixels, in FITS pixel
    /// coordinates.
    pub fn border_edges(&self) -> Vec<((f64, f64), (f64, f64))> {
        let mut edges = Vec::new();
        for row in 0..self.height {
            for col in 0..self.width {
                if !self.is_covered(col, row) {
                    continue;
                }
                let left = col as f64 + 0.5;
                let right = col as f64 + 1.5;
                let bottom = row as f64 + 0.5;
                let top = row as f64 + 1.5;
                if col == 0 || !self.is_covered(col - 1, row) {
                    edges.push(((left, bottom), (left, top)));
                }
                if !self.is_covered(col + 1, row) {
                    edges.push(((right, bottom), (right, top)));
                }
                if row == 0 || !self.is_covered(col, row - 1) {
                    edges.push(((left, bottom), (right, bottom)));
                }
                if !self.is_covered(col, row + 1) {
                    edges.push(((left, top), (right, top)));
                }
            }
        }
        edges
    }
}

/// Maps FITS pixel coordinates onto backend coordinates, flipping y.
struct DeviceMap {
    scale_x: f64,
    scale_y: f64,
    height: f64,
}

impl DeviceMap {
    fn new<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, projection: &SkyProjection) -> Self {
        let (width, height) = area.dim_in_pixel();
        Self {
            scale_x: f64::from(width) / f64::from(projection.width()),
            scale_y: f64::from(height) / f64::from(projection.height()),
            height: f64::from(height),
        }
    }

    fn map(&self, x: f64, y: f64) -> (i32, i32) {
        let device_x = (x - 0.5) * self.scale_x;
        let device_y = self.height - (y - 0.5) * self.scale_y;
        (device_x.round() as i32, device_y.round() as i32)
    }
}

fn plot_error(err: impl std::fmt::Display) -> SurveyError {
    SurveyError::Plot(err.to_string())
}

fn split_assignment(assignment: &str) -> Result<(&str, &str)> {
    assignment
        .split_once('=')
        .ok_or_else(|| SurveyError::input(format!("expected key=value, got '{}'", assignment)))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(SurveyError::input(format!("invalid boolean '{}'", value))),
    }
}

fn parse_color(value: &str) -> Result<RGBColor> {
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex_color(hex)
            .ok_or_else(|| SurveyError::input(format!("invalid colour '{}'", value)));
    }
    let rgb = match value.to_ascii_lowercase().as_str() {
        "black" | "k" => (0, 0, 0),
        "white" | "w" => (255, 255, 255),
        "red" | "r" => (255, 0, 0),
        "green" | "g" => (0, 128, 0),
        "blue" | "b" => (0, 0, 255),
        "cyan" => (0, 255, 255),
        "magenta" => (255, 0, 255),
        "yellow" => (255, 255, 0),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "grey" | "gray" => (128, 128, 128),
        "c0" => (0x1f, 0x77, 0xb4),
        "c1" => (0xff, 0x7f, 0x0e),
        "c2" => (0x2c, 0xa0, 0x2c),
        "c3" => (0xd6, 0x27, 0x28),
        "c4" => (0x94, 0x67, 0xbd),
        _ => return Err(SurveyError::input(format!("unknown colour '{}'", value))),
    };
    Ok(RGBColor(rgb.0, rgb.1, rgb.2))
}

fn parse_hex_color(hex: &str) -> Option<RGBColor> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(RGBColor(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => {
            let expand = |s: &str| channel(s).map(|v| v * 17);
            Some(RGBColor(
                expand(&hex[0..1])?,
                expand(&hex[1..2])?,
                expand(&hex[2..3])?,
            ))
        }
        _ => None,
    }
}
