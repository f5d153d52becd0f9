use crate::colormap::{gradient_at, Rgb};
use crate::config::ImageConfig;
use crate::error::RenderError;
use crate::selector::RenderParameters;
use crate::style::{LayerContent, StyledLayer};
use geo::{Geometry, LineString, Rect};
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use rayon::prelude::*;
use std::f64::consts::PI;
use std::io::Cursor;
use tracing::{debug, warn};

// Web Mercator is undefined past this latitude
const MAX_LATITUDE: f64 = 85.051_128_78;
// Smallest projected extent a viewport covers, so single points still get a view
const MIN_SPAN: f64 = 1e-5;
const MARGIN: f64 = 0.05;
// Keeps projected coordinates inside i32 for the backend
const MAX_PIXEL: f64 = 1e6;

const FILL_ALPHA: f64 = 0.85;
const GEOMETRY_ALPHA: f64 = 0.7;
const POINT_RADIUS: i32 = 4;
const LINE_WIDTH: u32 = 2;

const HEAT_RADIUS: f64 = 25.0;
const HEAT_MIN_OPACITY: f64 = 0.05;
const HEAT_CUTOFF: f64 = 0.01;
const HEAT_GRADIENT: &[(f64, Rgb)] = &[
    (0.4, Rgb::new(0, 0, 255)),
    (0.65, Rgb::new(0, 255, 0)),
    (1.0, Rgb::new(255, 0, 0)),
];

type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageOptions {
    pub width: u32,
    pub height: u32,
    pub background: Rgb,
}

impl ImageOptions {
    pub fn from_config(config: &ImageConfig) -> Self {
        let background = Rgb::parse(&config.background).unwrap_or_else(|| {
            warn!("Invalid image background '{}', using white", config.background);
            Rgb::WHITE
        });
        Self {
            width: config.width.max(1),
            height: config.height.max(1),
            background,
        }
    }
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self::from_config(&ImageConfig::default())
    }
}

/// Web Mercator normalised to the unit square, y growing southwards.
pub fn project(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat.to_radians();
    let y = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0;
    (x, y)
}

/// Maps lon/lat to pixels so that some bounds fill the image, centered, with a margin.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    center: (f64, f64),
    scale: f64,
    width: u32,
    height: u32,
}

impl Viewport {
    pub fn fit(bounds: Rect<f64>, width: u32, height: u32) -> Self {
        let (x0, y1) = project(bounds.min().x, bounds.min().y);
        let (x1, y0) = project(bounds.max().x, bounds.max().y);
        let span_x = (x1 - x0).max(MIN_SPAN);
        let span_y = (y1 - y0).max(MIN_SPAN);

        let usable_w = width as f64 * (1.0 - 2.0 * MARGIN);
        let usable_h = height as f64 * (1.0 - 2.0 * MARGIN);
        Self {
            center: ((x0 + x1) / 2.0, (y0 + y1) / 2.0),
            scale: (usable_w / span_x).min(usable_h / span_y),
            width,
            height,
        }
    }

    pub fn to_pixel(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (x, y) = project(lon, lat);
        (
            self.width as f64 / 2.0 + (x - self.center.0) * self.scale,
            self.height as f64 / 2.0 + (y - self.center.1) * self.scale,
        )
    }

    fn to_backend(&self, lon: f64, lat: f64) -> (i32, i32) {
        let (x, y) = self.to_pixel(lon, lat);
        (
            x.floor().clamp(-MAX_PIXEL, MAX_PIXEL) as i32,
            y.floor().clamp(-MAX_PIXEL, MAX_PIXEL) as i32,
        )
    }
}

/// How one feature is painted: its fill, and the background holes are punched back to.
#[derive(Debug, Clone, Copy)]
struct Paint {
    fill: RGBAColor,
    background: RGBColor,
}

fn rgb(color: Rgb) -> RGBColor {
    RGBColor(color.r, color.g, color.b)
}

fn draw_error(e: impl std::error::Error) -> RenderError {
    RenderError::Draw(e.to_string())
}

/// Rasterize one layer, fitted to its own bounds.
pub fn render_layer(layer: &StyledLayer, options: &ImageOptions) -> Result<RgbImage, RenderError> {
    let bounds = layer.bounds.ok_or(RenderError::NoGeometries)?;
    let viewport = Viewport::fit(bounds, options.width, options.height);
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&rgb(options.background)).map_err(draw_error)?;

        if let LayerContent::Features(features) = &layer.content {
            let plain = matches!(layer.params, RenderParameters::Geometry);
            for styled in features {
                let Some(geometry) = layer
                    .dataset
                    .features
                    .get(styled.index)
                    .and_then(|f| f.geometry.as_ref())
                else {
                    continue;
                };
                let fill = if plain {
                    rgb(Rgb::LIGHT_BLUE).mix(GEOMETRY_ALPHA)
                } else {
                    rgb(styled.fill).mix(FILL_ALPHA)
                };
                let paint = Paint {
                    fill,
                    background: rgb(options.background),
                };
                draw_geometry(&root, &viewport, geometry, paint)?;
            }
        }
        root.present().map_err(draw_error)?;
    }

    if let LayerContent::Heat(points) = &layer.content {
        draw_heat(&mut buffer, width as usize, height as usize, &viewport, points);
    }

    debug!("Rendered layer '{}' at {}x{}", layer.name, width, height);
    RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| RenderError::Draw("pixel buffer does not match the image size".to_string()))
}

pub fn render_layer_png(layer: &StyledLayer, options: &ImageOptions) -> Result<Vec<u8>, RenderError> {
    let canvas = render_layer(layer, options)?;
    let mut bytes = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

fn draw_geometry(root: &Canvas, vp: &Viewport, geometry: &Geometry<f64>, paint: Paint) -> Result<(), RenderError> {
    match geometry {
        Geometry::Point(p) => draw_point(root, vp.to_backend(p.x(), p.y()), paint),
        Geometry::MultiPoint(mp) => mp
            .iter()
            .try_for_each(|p| draw_point(root, vp.to_backend(p.x(), p.y()), paint)),
        Geometry::Line(line) => {
            let ls = LineString::from(vec![line.start, line.end]);
            draw_line_string(root, vp, &ls, paint)
        }
        Geometry::LineString(ls) => draw_line_string(root, vp, ls, paint),
        Geometry::MultiLineString(mls) => mls.iter().try_for_each(|ls| draw_line_string(root, vp, ls, paint)),
        Geometry::Polygon(polygon) => draw_polygon(root, vp, polygon, paint),
        Geometry::MultiPolygon(mp) => mp.iter().try_for_each(|polygon| draw_polygon(root, vp, polygon, paint)),
        Geometry::Rect(rect) => draw_polygon(root, vp, &rect.to_polygon(), paint),
        Geometry::Triangle(triangle) => draw_polygon(root, vp, &triangle.to_polygon(), paint),
        Geometry::GeometryCollection(collection) => collection
            .iter()
            .try_for_each(|member| draw_geometry(root, vp, member, paint)),
    }
}

fn project_ring(vp: &Viewport, ring: &LineString<f64>) -> Vec<(i32, i32)> {
    ring.coords().map(|c| vp.to_backend(c.x, c.y)).collect()
}

/// Exterior filled, holes painted back to the background, black outline on every ring.
fn draw_polygon(root: &Canvas, vp: &Viewport, polygon: &geo::Polygon<f64>, paint: Paint) -> Result<(), RenderError> {
    let exterior = project_ring(vp, polygon.exterior());
    let holes: Vec<Vec<(i32, i32)>> = polygon.interiors().iter().map(|ring| project_ring(vp, ring)).collect();

    root.draw(&Polygon::new(exterior.clone(), paint.fill.filled()))
        .map_err(draw_error)?;
    for hole in &holes {
        root.draw(&Polygon::new(hole.clone(), paint.background.filled()))
            .map_err(draw_error)?;
    }
    for ring in std::iter::once(exterior).chain(holes) {
        root.draw(&PathElement::new(ring, BLACK.stroke_width(1)))
            .map_err(draw_error)?;
    }
    Ok(())
}

fn draw_line_string(root: &Canvas, vp: &Viewport, ls: &LineString<f64>, paint: Paint) -> Result<(), RenderError> {
    let points = project_ring(vp, ls);
    root.draw(&PathElement::new(points, paint.fill.stroke_width(LINE_WIDTH)))
        .map_err(draw_error)
}

fn draw_point(root: &Canvas, center: (i32, i32), paint: Paint) -> Result<(), RenderError> {
    let RGBAColor(r, g, b, alpha) = paint.fill;
    let fill = RGBAColor(r, g, b, alpha.max(FILL_ALPHA));
    root.draw(&Circle::new(center, POINT_RADIUS, fill.filled()))
        .map_err(draw_error)?;
    root.draw(&Circle::new(center, POINT_RADIUS, BLACK.stroke_width(1)))
        .map_err(draw_error)
}

fn blend_channels(channels: &mut [u8], color: Rgb, alpha: f64) {
    let alpha = alpha.clamp(0.0, 1.0);
    for (channel, value) in channels.iter_mut().zip([color.r, color.g, color.b]) {
        *channel = (*channel as f64 * (1.0 - alpha) + value as f64 * alpha).round() as u8;
    }
}

/// Gaussian kernel density of the points, colored with the Leaflet.heat gradient
/// and blended straight into the RGB pixel buffer.
fn draw_heat(buffer: &mut [u8], width: usize, height: usize, vp: &Viewport, points: &[[f64; 2]]) {
    let mut density = vec![0.0f64; width * height];

    let sigma = HEAT_RADIUS / 2.0;
    let reach = HEAT_RADIUS.ceil() as i64;
    for &[lat, lon] in points {
        let (px, py) = vp.to_pixel(lon, lat);
        let (cx, cy) = (px.floor() as i64, py.floor() as i64);
        for y in (cy - reach).max(0)..=(cy + reach).min(height as i64 - 1) {
            for x in (cx - reach).max(0)..=(cx + reach).min(width as i64 - 1) {
                let dx = x as f64 + 0.5 - px;
                let dy = y as f64 + 0.5 - py;
                let d2 = dx * dx + dy * dy;
                if d2 <= HEAT_RADIUS * HEAT_RADIUS {
                    density[y as usize * width + x as usize] += (-d2 / (2.0 * sigma * sigma)).exp();
                }
            }
        }
    }

    let max = density.iter().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return;
    }

    buffer
        .par_chunks_mut(width * 3)
        .enumerate()
        .for_each(|(row, pixels)| {
            for (col, pixel) in pixels.chunks_exact_mut(3).enumerate() {
                let t = density[row * width + col] / max;
                if t < HEAT_CUTOFF {
                    continue;
                }
                let alpha = t.max(HEAT_MIN_OPACITY);
                blend_channels(pixel, gradient_at(HEAT_GRADIENT, t), alpha);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{build_render_parameters, VisualizationRequest, VizMode};
    use crate::style::style_layer;
    use crate::test_support::{polygon_dataset, shared_sample};
    use geo::coord;

    fn options() -> ImageOptions {
        ImageOptions {
            width: 300,
            height: 200,
            background: Rgb::WHITE,
        }
    }

    fn pixel_at(canvas: &RgbImage, vp: &Viewport, lon: f64, lat: f64) -> Rgb {
        let (x, y) = vp.to_pixel(lon, lat);
        let p = canvas.get_pixel(x as u32, y as u32);
        Rgb::new(p[0], p[1], p[2])
    }

    // Alpha blending in the backend may round either way
    fn assert_close(actual: Rgb, expected: Rgb) {
        let near = |a: u8, b: u8| a.abs_diff(b) <= 2;
        assert!(
            near(actual.r, expected.r) && near(actual.g, expected.g) && near(actual.b, expected.b),
            "{actual:?} is not close to {expected:?}"
        );
    }

    #[test]
    fn test_projection() {
        let (x, y) = project(0.0, 0.0);
        assert!((x - 0.5).abs() < 1e-12);
        assert!((y - 0.5).abs() < 1e-12);

        let (x, y) = project(-180.0, 90.0);
        assert_eq!(x, 0.0);
        assert!(y.abs() < 1e-6);

        // Northern latitudes are higher up the image
        assert!(project(10.0, 52.0).1 < project(10.0, 50.0).1);
    }

    #[test]
    fn test_viewport_centers_bounds() {
        let bounds = Rect::new(coord! { x: 9.0, y: 50.0 }, coord! { x: 12.5, y: 52.5 });
        let vp = Viewport::fit(bounds, 400, 300);
        let (x0, y0) = vp.to_pixel(9.0, 52.5);
        let (x1, y1) = vp.to_pixel(12.5, 50.0);
        assert!((x0 + x1 - 400.0).abs() < 1e-6);
        assert!((y0 + y1 - 300.0).abs() < 1e-6);
        assert!(x0 >= 20.0 - 1e-6 && y0 >= 15.0 - 1e-6);
        assert!(x1 <= 380.0 + 1e-6 && y1 <= 285.0 + 1e-6);
    }

    #[test]
    fn test_single_point_viewport() {
        let point = Rect::new(coord! { x: 5.0, y: 5.0 }, coord! { x: 5.0, y: 5.0 });
        let vp = Viewport::fit(point, 100, 100);
        let (x, y) = vp.to_pixel(5.0, 5.0);
        assert!((x - 50.0).abs() < 1e-9 && (y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_with_hole() {
        let dataset = polygon_dataset();
        let params = build_render_parameters(&dataset, &VisualizationRequest::new(VizMode::Geometry)).unwrap();
        let layer = style_layer("polygons", dataset, params).unwrap();

        let options = options();
        let canvas = render_layer(&layer, &options).unwrap();
        let vp = Viewport::fit(layer.bounds.unwrap(), options.width, options.height);

        // Inside the hole
        assert_eq!(pixel_at(&canvas, &vp, 2.0, 2.0), Rgb::WHITE);
        // Inside the ring: light blue at 70% over white
        assert_close(pixel_at(&canvas, &vp, 0.5, 2.0), Rgb::new(198, 228, 238));
        // Outside everything
        assert_eq!(pixel_at(&canvas, &vp, 4.5, 3.5), Rgb::WHITE);
    }

    #[test]
    fn test_choropleth_fill_colors() {
        let dataset = shared_sample();
        let request = VisualizationRequest::new(VizMode::ChoroplethClassified)
            .column("population")
            .scheme("EqualInterval")
            .classes(2)
            .colormap("Blues");
        let params = build_render_parameters(&dataset, &request).unwrap();
        let layer = style_layer("population", dataset, params).unwrap();

        let options = options();
        let canvas = render_layer(&layer, &options).unwrap();
        let vp = Viewport::fit(layer.bounds.unwrap(), options.width, options.height);

        // Alpha is in the lower class: #f7fbff at 85% over white
        assert_close(pixel_at(&canvas, &vp, 9.5, 50.5), Rgb::new(248, 252, 255));
        // Delta is in the upper class: a point marker, #08306b at 85% over white
        assert_close(pixel_at(&canvas, &vp, 12.0, 52.0), Rgb::new(45, 79, 129));
    }

    #[test]
    fn test_heatmap_draws_around_points() {
        let dataset = shared_sample();
        let params = build_render_parameters(&dataset, &VisualizationRequest::new(VizMode::Heatmap)).unwrap();
        let layer = style_layer("heat", dataset, params).unwrap();

        let options = options();
        let canvas = render_layer(&layer, &options).unwrap();
        let vp = Viewport::fit(layer.bounds.unwrap(), options.width, options.height);

        let hot = pixel_at(&canvas, &vp, 12.0, 52.0);
        assert_ne!(hot, Rgb::WHITE);
        assert!(hot.r > hot.b);
        // Image corners are far from both points
        let corner = canvas.get_pixel(0, options.height - 1);
        assert_eq!((corner[0], corner[1], corner[2]), (255, 255, 255));
    }

    #[test]
    fn test_png_encoding() {
        let dataset = shared_sample();
        let params = build_render_parameters(&dataset, &VisualizationRequest::new(VizMode::Geometry)).unwrap();
        let layer = style_layer("all", dataset, params).unwrap();

        let bytes = render_layer_png(&layer, &options()).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (300, 200));
    }

    #[test]
    fn test_background_from_config() {
        let config = ImageConfig {
            width: 10,
            height: 20,
            background: "black".to_string(),
        };
        let options = ImageOptions::from_config(&config);
        assert_eq!(options.background, Rgb::BLACK);

        let config = ImageConfig {
            background: "not-a-color".to_string(),
            ..ImageConfig::default()
        };
        assert_eq!(ImageOptions::from_config(&config).background, Rgb::WHITE);
    }
}
