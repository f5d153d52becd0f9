//! Named colormaps and color interpolation.
//!
//! Names follow matplotlib (`viridis`, `YlOrRd`, `Set3`, ...). Lookup is
//! case-insensitive and a `_r` suffix reverses the map.

use palette::{LinSrgb, Mix, Srgb};
use std::fmt;

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);
    /// Fill for features whose value is missing.
    pub const LIGHT_GREY: Self = Self::new(211, 211, 211);
    pub const LIGHT_BLUE: Self = Self::new(173, 216, 230);
    /// Leaflet's default path color, used for plain geometry layers.
    pub const LEAFLET_BLUE: Self = Self::new(51, 136, 255);

    /// Any CSS color: named, hex, `rgb()`, `hsl()`.
    pub fn parse(value: &str) -> Option<Self> {
        let color = csscolorparser::parse(value).ok()?;
        let [r, g, b, _] = color.to_rgba8();
        Some(Self::new(r, g, b))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn to_linear(self) -> LinSrgb<f32> {
        Srgb::new(self.r, self.g, self.b)
            .into_format::<f32>()
            .into_linear()
    }

    fn from_linear(color: LinSrgb<f32>) -> Self {
        let srgb: Srgb<u8> = Srgb::<f32>::from_linear(color).into_format();
        Self::new(srgb.red, srgb.green, srgb.blue)
    }

    /// Mix in linear RGB; `t = 0` is `self`, `t = 1` is `other`.
    pub fn mix(self, other: Rgb, t: f64) -> Rgb {
        if t <= 0.0 {
            return self;
        }
        if t >= 1.0 {
            return other;
        }
        Self::from_linear(self.to_linear().mix(other.to_linear(), t as f32))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Evaluate a gradient given as `(position, color)` stops with ascending positions in [0, 1].
pub fn gradient_at(stops: &[(f64, Rgb)], t: f64) -> Rgb {
    let Some(&(_, first)) = stops.first() else {
        return Rgb::BLACK;
    };
    if t <= stops[0].0 {
        return first;
    }
    for pair in stops.windows(2) {
        let ((t0, c0), (t1, c1)) = (pair[0], pair[1]);
        if t <= t1 {
            let ratio = if t1 > t0 { (t - t0) / (t1 - t0) } else { 1.0 };
            return c0.mix(c1, ratio);
        }
    }
    stops[stops.len() - 1].1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColormapKind {
    Sequential,
    Diverging,
    /// Discrete colors for categories; never interpolated.
    Qualitative,
}

struct CatalogEntry {
    name: &'static str,
    kind: ColormapKind,
    colors: &'static [&'static str],
}

const fn entry(
    name: &'static str,
    kind: ColormapKind,
    colors: &'static [&'static str],
) -> CatalogEntry {
    CatalogEntry { name, kind, colors }
}

use ColormapKind::{Diverging, Qualitative, Sequential};

// =============================================================================
// Catalog
// =============================================================================

const CATALOG: &[CatalogEntry] = &[
    // Perceptually uniform
    entry("viridis", Sequential, &[
        "#440154", "#482878", "#3e4989", "#31688e", "#26828e",
        "#1f9e89", "#35b779", "#6ece58", "#b5de2b", "#fde725",
    ]),
    entry("plasma", Sequential, &[
        "#0d0887", "#46039f", "#7201a8", "#9c179e", "#bd3786",
        "#d8576b", "#ed7953", "#fb9f3a", "#fdca26", "#f0f921",
    ]),
    entry("inferno", Sequential, &[
        "#000004", "#1b0c41", "#4a0c6b", "#781c6d", "#a52c60",
        "#cf4446", "#ed6925", "#fb9b06", "#f7d13d", "#fcffa4",
    ]),
    entry("magma", Sequential, &[
        "#000004", "#180f3d", "#440f76", "#721f81", "#9e2f7f",
        "#cd4071", "#f1605d", "#fd9668", "#feca8d", "#fcfdbf",
    ]),
    entry("cividis", Sequential, &[
        "#00224e", "#123570", "#3b496c", "#575d6d", "#707173",
        "#8a8678", "#a59c74", "#c3b369", "#e1cc55", "#fee838",
    ]),
    // ColorBrewer sequential
    entry("YlOrRd", Sequential, &[
        "#ffffcc", "#ffeda0", "#fed976", "#feb24c", "#fd8d3c",
        "#fc4e2a", "#e31a1c", "#bd0026", "#800026",
    ]),
    entry("YlOrBr", Sequential, &[
        "#ffffe5", "#fff7bc", "#fee391", "#fec44f", "#fe9929",
        "#ec7014", "#cc4c02", "#993404", "#662506",
    ]),
    entry("YlGnBu", Sequential, &[
        "#ffffd9", "#edf8b1", "#c7e9b4", "#7fcdbb", "#41b6c4",
        "#1d91c0", "#225ea8", "#253494", "#081d58",
    ]),
    entry("YlGn", Sequential, &[
        "#ffffe5", "#f7fcb9", "#d9f0a3", "#addd8e", "#78c679",
        "#41ab5d", "#238443", "#006837", "#004529",
    ]),
    entry("OrRd", Sequential, &[
        "#fff7ec", "#fee8c8", "#fdd49e", "#fdbb84", "#fc8d59",
        "#ef6548", "#d7301f", "#b30000", "#7f0000",
    ]),
    entry("PuBu", Sequential, &[
        "#fff7fb", "#ece7f2", "#d0d1e6", "#a6bddb", "#74a9cf",
        "#3690c0", "#0570b0", "#045a8d", "#023858",
    ]),
    entry("BuGn", Sequential, &[
        "#f7fcfd", "#e5f5f9", "#ccece6", "#99d8c9", "#66c2a4",
        "#41ae76", "#238b45", "#006d2c", "#00441b",
    ]),
    entry("RdPu", Sequential, &[
        "#fff7f3", "#fde0dd", "#fcc5c0", "#fa9fb5", "#f768a1",
        "#dd3497", "#ae017e", "#7a0177", "#49006a",
    ]),
    entry("Blues", Sequential, &[
        "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6",
        "#4292c6", "#2171b5", "#08519c", "#08306b",
    ]),
    entry("Greens", Sequential, &[
        "#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476",
        "#41ab5d", "#238b45", "#006d2c", "#00441b",
    ]),
    entry("Reds", Sequential, &[
        "#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a",
        "#ef3b2c", "#cb181d", "#a50f15", "#67000d",
    ]),
    entry("Oranges", Sequential, &[
        "#fff5eb", "#fee6ce", "#fdd0a2", "#fdae6b", "#fd8d3c",
        "#f16913", "#d94801", "#a63603", "#7f2704",
    ]),
    entry("Purples", Sequential, &[
        "#fcfbfd", "#efedf5", "#dadaeb", "#bcbddc", "#9e9ac8",
        "#807dba", "#6a51a3", "#54278f", "#3f007d",
    ]),
    entry("Greys", Sequential, &[
        "#ffffff", "#f0f0f0", "#d9d9d9", "#bdbdbd", "#969696",
        "#737373", "#525252", "#252525", "#000000",
    ]),
    // Diverging
    entry("RdBu", Diverging, &[
        "#67001f", "#b2182b", "#d6604d", "#f4a582", "#fddbc7",
        "#f7f7f7", "#d1e5f0", "#92c5de", "#4393c3", "#2166ac", "#053061",
    ]),
    entry("RdYlGn", Diverging, &[
        "#a50026", "#d73027", "#f46d43", "#fdae61", "#fee08b",
        "#ffffbf", "#d9ef8b", "#a6d96a", "#66bd63", "#1a9850", "#006837",
    ]),
    entry("RdYlBu", Diverging, &[
        "#a50026", "#d73027", "#f46d43", "#fdae61", "#fee090",
        "#ffffbf", "#e0f3f8", "#abd9e9", "#74add1", "#4575b4", "#313695",
    ]),
    entry("Spectral", Diverging, &[
        "#9e0142", "#d53e4f", "#f46d43", "#fdae61", "#fee08b",
        "#ffffbf", "#e6f598", "#abdda4", "#66c2a5", "#3288bd", "#5e4fa2",
    ]),
    entry("BrBG", Diverging, &[
        "#543005", "#8c510a", "#bf812d", "#dfc27d", "#f6e8c3",
        "#f5f5f5", "#c7eae5", "#80cdc1", "#35978f", "#01665e", "#003c30",
    ]),
    entry("PiYG", Diverging, &[
        "#8e0152", "#c51b7d", "#de77ae", "#f1b6da", "#fde0ef",
        "#f7f7f7", "#e6f5d0", "#b8e186", "#7fbc41", "#4d9221", "#276419",
    ]),
    entry("coolwarm", Diverging, &[
        "#3b4cc0", "#6788ee", "#9abbff", "#c9d7f0", "#edd1c2",
        "#f7a889", "#e26952", "#b40426",
    ]),
    // Qualitative
    entry("Set1", Qualitative, &[
        "#e41a1c", "#377eb8", "#4daf4a", "#984ea3", "#ff7f00",
        "#ffff33", "#a65628", "#f781bf", "#999999",
    ]),
    entry("Set2", Qualitative, &[
        "#66c2a5", "#fc8d62", "#8da0cb", "#e78ac3", "#a6d854",
        "#ffd92f", "#e5c494", "#b3b3b3",
    ]),
    entry("Set3", Qualitative, &[
        "#8dd3c7", "#ffffb3", "#bebada", "#fb8072", "#80b1d3",
        "#fdb462", "#b3de69", "#fccde5", "#d9d9d9", "#bc80bd",
        "#ccebc5", "#ffed6f",
    ]),
    entry("Pastel1", Qualitative, &[
        "#fbb4ae", "#b3cde3", "#ccebc5", "#decbe4", "#fed9a6",
        "#ffffcc", "#e5d8bd", "#fddaec", "#f2f2f2",
    ]),
    entry("Pastel2", Qualitative, &[
        "#b3e2cd", "#fdcdac", "#cbd5e8", "#f4cae4", "#e6f5c9",
        "#fff2ae", "#f1e2cc", "#cccccc",
    ]),
    entry("Dark2", Qualitative, &[
        "#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e",
        "#e6ab02", "#a6761d", "#666666",
    ]),
    entry("Accent", Qualitative, &[
        "#7fc97f", "#beaed4", "#fdc086", "#ffff99", "#386cb0",
        "#f0027f", "#bf5b17", "#666666",
    ]),
    entry("Paired", Qualitative, &[
        "#a6cee3", "#1f78b4", "#b2df8a", "#33a02c", "#fb9a99",
        "#e31a1c", "#fdbf6f", "#ff7f00", "#cab2d6", "#6a3d9a",
        "#ffff99", "#b15928",
    ]),
    entry("tab10", Qualitative, &[
        "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
        "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
    ]),
];

/// Canonical names of every colormap, without the reversed variants.
pub fn names() -> Vec<&'static str> {
    CATALOG.iter().map(|e| e.name).collect()
}

/// Look up a colormap by name. `None` if the name is unknown.
pub fn lookup(name: &str) -> Option<Colormap> {
    let trimmed = name.trim();
    let (base, reversed) = match trimmed.len().checked_sub(2) {
        Some(split) if trimmed.is_char_boundary(split) && trimmed[split..].eq_ignore_ascii_case("_r") => {
            (&trimmed[..split], true)
        }
        _ => (trimmed, false),
    };

    let entry = CATALOG.iter().find(|e| e.name.eq_ignore_ascii_case(base))?;
    let mut colors: Vec<Rgb> = entry.colors.iter().filter_map(|c| Rgb::parse(c)).collect();
    let mut name = entry.name.to_string();
    if reversed {
        colors.reverse();
        name.push_str("_r");
    }

    Some(Colormap {
        name,
        kind: entry.kind,
        colors,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Colormap {
    /// Canonical name, `_r` included for reversed maps.
    pub name: String,
    pub kind: ColormapKind,
    colors: Vec<Rgb>,
}

impl Colormap {
    /// A map that paints everything in one color.
    pub fn single(color: Rgb) -> Self {
        Self {
            name: color.to_hex(),
            kind: Sequential,
            colors: vec![color],
        }
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Color at `t` in [0, 1]. Continuous maps interpolate between evenly spaced
    /// stops; qualitative maps pick the color whose slot contains `t`.
    pub fn at(&self, t: f64) -> Rgb {
        let n = self.colors.len();
        if n == 0 {
            return Rgb::BLACK;
        }
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        if self.kind == Qualitative {
            let idx = ((t * n as f64).floor() as usize).min(n - 1);
            return self.colors[idx];
        }
        if n == 1 {
            return self.colors[0];
        }

        let segments = (n - 1) as f64;
        let position = t * segments;
        let segment = (position.floor() as usize).min(n - 2);
        self.colors[segment].mix(self.colors[segment + 1], position - segment as f64)
    }

    /// `count` colors evenly spaced from one end of the map to the other.
    pub fn sample(&self, count: usize) -> Vec<Rgb> {
        match count {
            0 => Vec::new(),
            1 => vec![self.at(0.0)],
            _ => (0..count)
                .map(|i| self.at(i as f64 / (count - 1) as f64))
                .collect(),
        }
    }

    /// One color per category. Qualitative maps hand out their colors in order
    /// and cycle once exhausted; continuous maps are sampled.
    pub fn category_colors(&self, count: usize) -> Vec<Rgb> {
        if self.kind == Qualitative && !self.colors.is_empty() {
            self.colors.iter().copied().cycle().take(count).collect()
        } else {
            self.sample(count)
        }
    }

    /// CSS stops for a colorbar legend.
    pub fn css_stops(&self, count: usize) -> Vec<String> {
        self.sample(count).iter().map(Rgb::to_hex).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_catalog_color_parses() {
        for entry in CATALOG {
            let map = lookup(entry.name).unwrap();
            assert_eq!(map.colors().len(), entry.colors.len(), "{}", entry.name);
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let map = lookup("ylorrd").unwrap();
        assert_eq!(map.name, "YlOrRd");
        assert_eq!(map.kind, ColormapKind::Sequential);
        assert!(lookup("VIRIDIS").is_some());
        assert!(lookup("not_a_colormap").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_reversed_suffix() {
        let forward = lookup("Blues").unwrap();
        let reversed = lookup("Blues_r").unwrap();
        assert_eq!(reversed.name, "Blues_r");
        assert_eq!(reversed.at(0.0), forward.at(1.0));
        assert_eq!(reversed.at(1.0), forward.at(0.0));
    }

    #[test]
    fn test_endpoints_are_exact() {
        let map = lookup("viridis").unwrap();
        assert_eq!(map.at(0.0).to_hex(), "#440154");
        assert_eq!(map.at(1.0).to_hex(), "#fde725");
        assert_eq!(map.at(-3.0), map.at(0.0));
        assert_eq!(map.at(7.0), map.at(1.0));
    }

    #[test]
    fn test_interpolation_stays_between_stops() {
        let map = lookup("Greys").unwrap();
        let mid = map.at(0.5);
        // Greys is symmetric around its middle stop
        assert_eq!(mid.to_hex(), "#969696");
        let quarter = map.at(0.3);
        assert!(quarter.r < 255 && quarter.r > 0x96);
    }

    #[test]
    fn test_qualitative_is_discrete() {
        let map = lookup("Set1").unwrap();
        assert_eq!(map.at(0.0).to_hex(), "#e41a1c");
        assert_eq!(map.at(0.1).to_hex(), "#e41a1c");
        assert_eq!(map.at(1.0).to_hex(), "#999999");
    }

    #[test]
    fn test_sample() {
        let map = lookup("YlOrRd").unwrap();
        let colors = map.sample(5);
        assert_eq!(colors.len(), 5);
        assert_eq!(colors[0].to_hex(), "#ffffcc");
        assert_eq!(colors[4].to_hex(), "#800026");
        assert!(map.sample(0).is_empty());
        assert_eq!(map.sample(1), vec![map.at(0.0)]);
    }

    #[test]
    fn test_category_colors_cycle() {
        let map = lookup("Dark2").unwrap();
        let colors = map.category_colors(10);
        assert_eq!(colors.len(), 10);
        assert_eq!(colors[0], colors[8]);
        assert_eq!(colors[1], colors[9]);
        assert_ne!(colors[0], colors[1]);
    }

    #[test]
    fn test_category_colors_from_continuous_map() {
        let map = lookup("viridis").unwrap();
        let colors = map.category_colors(3);
        assert_eq!(colors, map.sample(3));
    }

    #[test]
    fn test_parse_css_colors() {
        assert_eq!(Rgb::parse("lightgrey"), Some(Rgb::LIGHT_GREY));
        assert_eq!(Rgb::parse("#ff0000"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(Rgb::parse("rgb(0, 128, 0)"), Some(Rgb::new(0, 128, 0)));
        assert_eq!(Rgb::parse("definitely not a color"), None);
    }

    #[test]
    fn test_gradient_at() {
        let stops = [
            (0.4, Rgb::new(0, 0, 255)),
            (0.65, Rgb::new(0, 255, 0)),
            (1.0, Rgb::new(255, 0, 0)),
        ];
        assert_eq!(gradient_at(&stops, 0.0), Rgb::new(0, 0, 255));
        assert_eq!(gradient_at(&stops, 0.65), Rgb::new(0, 255, 0));
        assert_eq!(gradient_at(&stops, 1.0), Rgb::new(255, 0, 0));
        assert_eq!(gradient_at(&[], 0.5), Rgb::BLACK);
    }

    #[test]
    fn test_mix_endpoints() {
        let a = Rgb::new(10, 20, 30);
        let b = Rgb::new(200, 100, 0);
        assert_eq!(a.mix(b, 0.0), a);
        assert_eq!(a.mix(b, 1.0), b);
    }
}
