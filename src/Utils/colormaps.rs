//! Sequential colormaps, piecewise linear through nine anchor colors (ColorBrewer for the
//! single/multi-hue maps, evenly spaced samples of viridis).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    GnBu,
    Viridis,
    Greys,
    Purples,
    YlOrRd,
}

const GNBU: [u32; 9] = [
    0xf7fcf0, 0xe0f3db, 0xccebc5, 0xa8ddb5, 0x7bccc4, 0x4eb3d3, 0x2b8cbe, 0x0868ac, 0x084081,
];
const VIRIDIS: [u32; 9] = [
    0x440154, 0x472d7b, 0x3b528b, 0x2c728e, 0x21918c, 0x28ae80, 0x5ec962, 0xaddc30, 0xfde725,
];
const GREYS: [u32; 9] = [
    0xffffff, 0xf0f0f0, 0xd9d9d9, 0xbdbdbd, 0x969696, 0x737373, 0x525252, 0x252525, 0x000000,
];
const PURPLES: [u32; 9] = [
    0xfcfbfd, 0xefedf5, 0xdadaeb, 0xbcbddc, 0x9e9ac8, 0x807dba, 0x6a51a3, 0x54278f, 0x3f007d,
];
const YLORRD: [u32; 9] = [
    0xffffcc, 0xffeda0, 0xfed976, 0xfeb24c, 0xfd8d3c, 0xfc4e2a, 0xe31a1c, 0xbd0026, 0x800026,
];

fn hex_to_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

impl Colormap {
    fn anchors(&self) -> &'static [u32; 9] {
        match self {
            Colormap::GnBu => &GNBU,
            Colormap::Viridis => &VIRIDIS,
            Colormap::Greys => &GREYS,
            Colormap::Purples => &PURPLES,
            Colormap::YlOrRd => &YLORRD,
        }
    }

    /// part of the map the ensemble is spread over; the pale ends of some maps vanish on a
    /// dark background
    pub fn range(&self) -> (f64, f64) {
        match self {
            Colormap::Greys => (0.0, 0.8),
            Colormap::Purples => (0.3, 1.0),
            _ => (0.0, 1.0),
        }
    }

    /// color at x in [0, 1], values outside are clamped
    pub fn sample(&self, x: f64) -> [f32; 3] {
        let anchors = self.anchors();
        let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
        let pos = x * (anchors.len() - 1) as f64;
        let i = (pos.floor() as usize).min(anchors.len() - 2);
        let frac = (pos - i as f64) as f32;
        let a = hex_to_rgb(anchors[i]);
        let b = hex_to_rgb(anchors[i + 1]);
        [
            a[0] + (b[0] - a[0]) * frac,
            a[1] + (b[1] - a[1]) * frac,
            a[2] + (b[2] - a[2]) * frac,
        ]
    }

    /// `n` colors evenly spaced over `range()`
    pub fn colors(&self, n: usize) -> Vec<[f32; 3]> {
        let (lo, hi) = self.range();
        match n {
            0 => Vec::new(),
            1 => vec![self.sample(lo)],
            _ => (0..n)
                .map(|i| self.sample(lo + (hi - lo) * i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_endpoints_hit_anchors() {
        assert_eq!(Colormap::GnBu.sample(0.0), hex_to_rgb(0xf7fcf0));
        assert_eq!(Colormap::GnBu.sample(1.0), hex_to_rgb(0x084081));
        assert_eq!(Colormap::Greys.sample(1.0), [0.0, 0.0, 0.0]);
        assert_eq!(Colormap::Viridis.sample(-3.0), Colormap::Viridis.sample(0.0));
    }

    #[test]
    fn test_midpoint_interpolates() {
        let c = Colormap::Greys.sample(1.0 / 16.0);
        // halfway between ffffff and f0f0f0
        assert_relative_eq!(c[0], (1.0 + 240.0 / 255.0) / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_colors_follow_range() {
        let colors = Colormap::Purples.colors(50);
        assert_eq!(colors.len(), 50);
        assert_eq!(colors[0], Colormap::Purples.sample(0.3));
        assert_eq!(colors[49], Colormap::Purples.sample(1.0));
        assert!(Colormap::GnBu.colors(0).is_empty());
        assert_eq!(Colormap::GnBu.colors(1).len(), 1);
    }
}
