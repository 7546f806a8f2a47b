use crate::band::Band;

pub const MB_SIZE: u32 = 16;

/// Outer-region scale applied to the HIGH band baseline.
const HIGH_BAND_OUTER_FACTOR: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiPattern {
    Uniform,
    Central,
    Surrounding,
}

/// Row-major macroblock grid of QP deltas handed to the encoder with each
/// picture.
#[derive(Debug, Clone)]
pub struct RoiMap {
    width_mbs: u32,
    height_mbs: u32,
    cells: Vec<i8>,
    central_next: bool,
    last_pattern: Option<RoiPattern>,
}

impl RoiMap {
    pub fn new(width: u32, height: u32) -> Self {
        let width_mbs = width.div_ceil(MB_SIZE);
        let height_mbs = height.div_ceil(MB_SIZE);
        Self {
            width_mbs,
            height_mbs,
            cells: vec![0; width_mbs as usize * height_mbs as usize],
            central_next: true,
            last_pattern: None,
        }
    }

    pub fn width_mbs(&self) -> u32 {
        self.width_mbs
    }

    pub fn height_mbs(&self) -> u32 {
        self.height_mbs
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn as_slice(&self) -> &[i8] {
        &self.cells
    }

    /// `None` outside the grid.
    pub fn get(&self, row: u32, col: u32) -> Option<i8> {
        if row >= self.height_mbs || col >= self.width_mbs {
            return None;
        }
        self.cells
            .get(row as usize * self.width_mbs as usize + col as usize)
            .copied()
    }

    pub fn last_pattern(&self) -> Option<RoiPattern> {
        self.last_pattern
    }

    /// True when the next non-uniform paint uses the central pattern.
    pub fn central_next(&self) -> bool {
        self.central_next
    }

    fn is_central(&self, row: u32, col: u32) -> bool {
        let (h, w) = (self.height_mbs, self.width_mbs);
        row > h / 4 && row < h * 3 / 4 && col > w / 4 && col < w * 3 / 4
    }

    /// Repaints the grid. Equal values fill it uniformly and leave the
    /// alternation untouched; otherwise central and surrounding layouts
    /// alternate on every call.
    pub fn paint(&mut self, main: i32, other: i32) -> RoiPattern {
        let main = to_delta(main);
        let other = to_delta(other);

        if main == other {
            self.cells.fill(main);
            self.last_pattern = Some(RoiPattern::Uniform);
            return RoiPattern::Uniform;
        }

        let central = self.central_next;
        for row in 0..self.height_mbs {
            for col in 0..self.width_mbs {
                let favored = self.is_central(row, col) == central;
                self.cells[row as usize * self.width_mbs as usize + col as usize] =
                    if favored { main } else { other };
            }
        }
        self.central_next = !central;

        let pattern = if central {
            RoiPattern::Central
        } else {
            RoiPattern::Surrounding
        };
        self.last_pattern = Some(pattern);
        pattern
    }
}

/// `(main, other)` region values for a band's baseline. A zero spatial
/// offset disables the regions for every band.
pub fn region_values(band: Band, baseline: i32, spatial_offset: i32) -> (i32, i32) {
    if spatial_offset == 0 {
        return (baseline, baseline);
    }
    match band {
        Band::High => (baseline, (f64::from(baseline) * HIGH_BAND_OUTER_FACTOR) as i32),
        Band::Medium | Band::Low => (baseline - spatial_offset, baseline + spatial_offset),
    }
}

fn to_delta(value: i32) -> i8 {
    value.clamp(i32::from(i8::MIN), i32::from(i8::MAX)) as i8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(map: &RoiMap) -> Vec<i8> {
        map.as_slice().to_vec()
    }

    #[test]
    fn grid_rounds_up_to_macroblocks() {
        let map = RoiMap::new(1920, 1080);
        assert_eq!(map.width_mbs(), 120);
        assert_eq!(map.height_mbs(), 68);
        assert_eq!(map.len(), 120 * 68);

        let map = RoiMap::new(17, 16);
        assert_eq!((map.width_mbs(), map.height_mbs()), (2, 1));
    }

    #[test]
    fn fresh_map_is_zeroed() {
        let map = RoiMap::new(64, 64);
        assert!(map.as_slice().iter().all(|&v| v == 0));
        assert_eq!(map.last_pattern(), None);
    }

    #[test]
    fn equal_values_fill_uniformly_without_toggling() {
        let mut map = RoiMap::new(128, 128);
        assert!(map.central_next());
        assert_eq!(map.paint(3, 3), RoiPattern::Uniform);
        assert!(map.as_slice().iter().all(|&v| v == 3));
        assert!(map.central_next());
    }

    #[test]
    fn central_pattern_favors_inner_half() {
        let mut map = RoiMap::new(128, 128);
        assert_eq!(map.paint(2, 6), RoiPattern::Central);
        // 8x8 grid: rows/cols 3..=5 are strictly inside (2, 6)
        assert_eq!(map.get(4, 4), Some(2));
        assert_eq!(map.get(3, 5), Some(2));
        assert_eq!(map.get(2, 4), Some(6));
        assert_eq!(map.get(4, 6), Some(6));
        assert_eq!(map.get(0, 0), Some(6));
        assert_eq!(map.get(7, 7), Some(6));
    }

    #[test]
    fn surrounding_pattern_is_complement() {
        let mut map = RoiMap::new(128, 128);
        map.paint(2, 6);
        let central = snapshot(&map);
        assert_eq!(map.paint(2, 6), RoiPattern::Surrounding);
        let surrounding = snapshot(&map);
        for (c, s) in central.iter().zip(&surrounding) {
            assert_ne!(c, s);
        }
        assert_eq!(map.get(4, 4), Some(6));
        assert_eq!(map.get(0, 0), Some(2));
    }

    #[test]
    fn alternation_has_period_two() {
        let mut map = RoiMap::new(320, 240);
        map.paint(1, 4);
        let first = snapshot(&map);
        map.paint(1, 4);
        let second = snapshot(&map);
        map.paint(1, 4);
        let third = snapshot(&map);
        assert_ne!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn uniform_fill_does_not_break_alternation() {
        let mut map = RoiMap::new(320, 240);
        assert_eq!(map.paint(1, 4), RoiPattern::Central);
        assert_eq!(map.paint(5, 5), RoiPattern::Uniform);
        assert_eq!(map.paint(1, 4), RoiPattern::Surrounding);
    }

    #[test]
    fn values_saturate_to_i8() {
        let mut map = RoiMap::new(16, 16);
        map.paint(500, 500);
        assert_eq!(map.get(0, 0), Some(i8::MAX));
        map.paint(-500, -500);
        assert_eq!(map.get(0, 0), Some(i8::MIN));
    }

    #[test]
    fn high_band_scales_outer_region() {
        assert_eq!(region_values(Band::High, 5, 2), (5, 6));
        assert_eq!(region_values(Band::High, 10, 2), (10, 12));
        // 4 * 1.2 truncates back to 4
        assert_eq!(region_values(Band::High, 4, 2), (4, 4));
    }

    #[test]
    fn lower_bands_use_symmetric_offset() {
        assert_eq!(region_values(Band::Medium, 4, 2), (2, 6));
        assert_eq!(region_values(Band::Low, 6, 0), (6, 6));
    }

    #[test]
    fn zero_offset_is_uniform_for_every_band() {
        // 5 * 1.2 would otherwise truncate to 6
        assert_eq!(region_values(Band::High, 5, 0), (5, 5));
        assert_eq!(region_values(Band::Medium, 3, 0), (3, 3));
        let mut map = RoiMap::new(1280, 720);
        let (main, other) = region_values(Band::High, 5, 0);
        assert_eq!(map.paint(main, other), RoiPattern::Uniform);
        assert!(map.as_slice().iter().all(|&v| v == 5));
    }

    #[test]
    fn get_outside_grid_is_none() {
        let map = RoiMap::new(128, 128);
        assert_eq!(map.get(7, 7), Some(0));
        assert_eq!(map.get(8, 0), None);
        assert_eq!(map.get(0, 8), None);
        assert_eq!(map.get(u32::MAX, u32::MAX), None);
    }
}
