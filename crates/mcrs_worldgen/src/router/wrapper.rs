use crate::noise::improved_noise::{lerp, lerp3};
use std::mem;

/// Per-chunk state installed for a cache or interpolation marker.
#[derive(Debug, Clone)]
pub enum Wrapper {
    Interpolated(Interpolator),
    FlatCache(FlatCache),
    Cache2d(Cache2d),
    CacheOnce(CacheOnce),
    CellCache(CellCache),
}

/// Corner values of the two x faces around the current cell, plus the
/// partially interpolated values of the current y, x and z step.
#[derive(Debug, Clone)]
pub struct Interpolator {
    count_y: usize,
    slice0: Vec<f64>,
    slice1: Vec<f64>,
    noise000: f64,
    noise001: f64,
    noise100: f64,
    noise101: f64,
    noise010: f64,
    noise011: f64,
    noise110: f64,
    noise111: f64,
    value_xz00: f64,
    value_xz10: f64,
    value_xz01: f64,
    value_xz11: f64,
    value_z0: f64,
    value_z1: f64,
    value: f64,
}

impl Interpolator {
    pub fn new(count_xz: usize, count_y: usize) -> Self {
        let len = (count_xz + 1) * (count_y + 1);
        Self {
            count_y,
            slice0: vec![0.0; len],
            slice1: vec![0.0; len],
            noise000: 0.0,
            noise001: 0.0,
            noise100: 0.0,
            noise101: 0.0,
            noise010: 0.0,
            noise011: 0.0,
            noise110: 0.0,
            noise111: 0.0,
            value_xz00: 0.0,
            value_xz10: 0.0,
            value_xz01: 0.0,
            value_xz11: 0.0,
            value_z0: 0.0,
            value_z1: 0.0,
            value: 0.0,
        }
    }

    #[inline]
    fn index(&self, z: usize, y: usize) -> usize {
        z * (self.count_y + 1) + y
    }

    /// The y column at `z` of the first or second slice.
    pub fn column(&self, first: bool, z: usize) -> &[f64] {
        let start = self.index(z, 0);
        let slice = if first { &self.slice0 } else { &self.slice1 };
        &slice[start..start + self.count_y + 1]
    }

    pub fn put_column(&mut self, first: bool, z: usize, column: &[f64]) {
        let start = self.index(z, 0);
        let slice = if first {
            &mut self.slice0
        } else {
            &mut self.slice1
        };
        slice[start..start + column.len()].copy_from_slice(column);
    }

    pub fn select_cell_yz(&mut self, y: usize, z: usize) {
        let (i00, i01, i10, i11) = (
            self.index(z, y),
            self.index(z + 1, y),
            self.index(z, y + 1),
            self.index(z + 1, y + 1),
        );
        self.noise000 = self.slice0[i00];
        self.noise001 = self.slice0[i01];
        self.noise100 = self.slice1[i00];
        self.noise101 = self.slice1[i01];
        self.noise010 = self.slice0[i10];
        self.noise011 = self.slice0[i11];
        self.noise110 = self.slice1[i10];
        self.noise111 = self.slice1[i11];
    }

    pub fn update_for_y(&mut self, delta: f64) {
        self.value_xz00 = lerp(delta, self.noise000, self.noise010);
        self.value_xz10 = lerp(delta, self.noise100, self.noise110);
        self.value_xz01 = lerp(delta, self.noise001, self.noise011);
        self.value_xz11 = lerp(delta, self.noise101, self.noise111);
    }

    pub fn update_for_x(&mut self, delta: f64) {
        self.value_z0 = lerp(delta, self.value_xz00, self.value_xz10);
        self.value_z1 = lerp(delta, self.value_xz01, self.value_xz11);
    }

    pub fn update_for_z(&mut self, delta: f64) {
        self.value = lerp(delta, self.value_z0, self.value_z1);
    }

    /// Result of the last y, x, z update.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Trilinear value inside the selected cell, used while cell caches fill.
    pub fn lerp_in_cell(&self, dx: f64, dy: f64, dz: f64) -> f64 {
        lerp3(
            dx,
            dy,
            dz,
            self.noise000,
            self.noise100,
            self.noise010,
            self.noise110,
            self.noise001,
            self.noise101,
            self.noise011,
            self.noise111,
        )
    }

    pub fn swap_slices(&mut self) {
        mem::swap(&mut self.slice0, &mut self.slice1);
    }
}

/// One value per quart column over the chunk and a one-quart border, sampled at y = 0.
#[derive(Debug, Clone)]
pub struct FlatCache {
    first_quart_x: i32,
    first_quart_z: i32,
    size: usize,
    values: Vec<f64>,
}

impl FlatCache {
    pub fn new(first_quart_x: i32, first_quart_z: i32, size: usize, values: Vec<f64>) -> Self {
        Self {
            first_quart_x,
            first_quart_z,
            size,
            values,
        }
    }

    /// Cached value for the quart column holding block `x`, `z`, if it is covered.
    pub fn get(&self, x: i32, z: i32) -> Option<f64> {
        let dx = (x >> 2) - self.first_quart_x;
        let dz = (z >> 2) - self.first_quart_z;
        if dx < 0 || dz < 0 || dx as usize >= self.size || dz as usize >= self.size {
            return None;
        }
        self.values.get(dx as usize * self.size + dz as usize).copied()
    }
}

/// Last value computed per column.
#[derive(Debug, Clone, Default)]
pub struct Cache2d {
    last_column: Option<(i32, i32)>,
    last_value: f64,
}

impl Cache2d {
    pub fn get(&self, x: i32, z: i32) -> Option<f64> {
        (self.last_column == Some((x, z))).then_some(self.last_value)
    }

    pub fn store(&mut self, x: i32, z: i32, value: f64) {
        self.last_column = Some((x, z));
        self.last_value = value;
    }
}

/// Last value per interpolation step and last filled array per array fill.
#[derive(Debug, Clone, Default)]
pub struct CacheOnce {
    last_counter: Option<u64>,
    last_value: f64,
    last_array_counter: Option<u64>,
    last_array: Vec<f64>,
}

impl CacheOnce {
    pub fn get(&self, interpolation_counter: u64, array_counter: u64, array_index: usize) -> Option<f64> {
        if self.last_array_counter == Some(array_counter) {
            if let Some(value) = self.last_array.get(array_index) {
                return Some(*value);
            }
        }
        (self.last_counter == Some(interpolation_counter)).then_some(self.last_value)
    }

    pub fn store(&mut self, interpolation_counter: u64, value: f64) {
        self.last_counter = Some(interpolation_counter);
        self.last_value = value;
    }

    pub fn array(&self, array_counter: u64, len: usize) -> Option<&[f64]> {
        (self.last_array_counter == Some(array_counter) && self.last_array.len() == len)
            .then_some(self.last_array.as_slice())
    }

    pub fn store_array(&mut self, array_counter: u64, values: &[f64]) {
        self.last_array.clear();
        self.last_array.extend_from_slice(values);
        self.last_array_counter = Some(array_counter);
    }
}

/// Every block value of the current cell, y descending, then x, then z.
#[derive(Debug, Clone)]
pub struct CellCache {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl CellCache {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width * width * height],
        }
    }

    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<f64> {
        let (w, h) = (self.width as i32, self.height as i32);
        if x < 0 || y < 0 || z < 0 || x >= w || y >= h || z >= w {
            return None;
        }
        self.values
            .get((((h - 1 - y) * w + x) * w + z) as usize)
            .copied()
    }

    pub fn take_values(&mut self) -> Vec<f64> {
        mem::take(&mut self.values)
    }

    pub fn put_values(&mut self, values: Vec<f64>) {
        self.values = values;
    }
}

#[cfg(test)]
mod test {
    use crate::router::wrapper::{CacheOnce, CellCache, FlatCache, Interpolator};

    #[test]
    fn interpolator_hits_corners() {
        let mut interpolator = Interpolator::new(1, 1);
        interpolator.put_column(true, 0, &[1.0, 2.0]);
        interpolator.put_column(true, 1, &[3.0, 4.0]);
        interpolator.put_column(false, 0, &[5.0, 6.0]);
        interpolator.put_column(false, 1, &[7.0, 8.0]);
        interpolator.select_cell_yz(0, 0);
        let corners = [
            ((0.0, 0.0, 0.0), 1.0),
            ((0.0, 1.0, 0.0), 2.0),
            ((0.0, 0.0, 1.0), 3.0),
            ((1.0, 0.0, 0.0), 5.0),
            ((1.0, 1.0, 1.0), 8.0),
        ];
        for ((x, y, z), expected) in corners {
            interpolator.update_for_y(y);
            interpolator.update_for_x(x);
            interpolator.update_for_z(z);
            assert_eq!(interpolator.value(), expected);
            assert_eq!(interpolator.lerp_in_cell(x, y, z), expected);
        }
        interpolator.update_for_y(0.5);
        interpolator.update_for_x(0.5);
        interpolator.update_for_z(0.5);
        assert_eq!(interpolator.value(), 4.5);

        interpolator.swap_slices();
        assert_eq!(interpolator.column(true, 1), &[7.0, 8.0]);
    }

    #[test]
    fn flat_cache_covers_border() {
        let values = (0..25).map(|i| i as f64).collect();
        let cache = FlatCache::new(4, -4, 5, values);
        assert_eq!(cache.get(16, -16), Some(0.0));
        assert_eq!(cache.get(35, -16), Some(20.0));
        assert_eq!(cache.get(35, 0), Some(24.0));
        assert_eq!(cache.get(36, 0), None);
        assert_eq!(cache.get(15, 0), None);
    }

    #[test]
    fn cache_once_prefers_array() {
        let mut cache = CacheOnce::default();
        assert_eq!(cache.get(1, 1, 0), None);
        cache.store(3, 0.5);
        assert_eq!(cache.get(3, 9, 0), Some(0.5));
        cache.store_array(9, &[1.0, 2.0]);
        assert_eq!(cache.get(3, 9, 1), Some(2.0));
        assert_eq!(cache.get(4, 9, 5), None);
        assert_eq!(cache.array(9, 2), Some(&[1.0, 2.0][..]));
        assert_eq!(cache.array(9, 3), None);
    }

    #[test]
    fn cell_cache_layout() {
        let mut cache = CellCache::new(2, 2);
        cache.put_values((0..8).map(|i| i as f64).collect());
        // top layer first
        assert_eq!(cache.get(0, 1, 0), Some(0.0));
        assert_eq!(cache.get(1, 1, 1), Some(3.0));
        assert_eq!(cache.get(0, 0, 1), Some(5.0));
        assert_eq!(cache.get(2, 0, 0), None);
    }
}
