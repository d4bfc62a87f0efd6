use rustc_hash::FxHashMap;
use std::hash::Hash;

/// 3d array indexed by y,z,x
pub type AbstractCube<T, const DIM: usize> = [[[T; DIM]; DIM]; DIM];

#[derive(Debug, Clone)]
pub struct HeterogeneousPaletteData<V: Hash + Eq + Copy, const DIM: usize> {
    cube: Box<AbstractCube<V, DIM>>,
    palette: Vec<V>,
    counts: Vec<u16>,
    /// Reverse index: value → palette index. Kept in sync with `palette`.
    index: FxHashMap<V, usize>,
}

impl<V: Hash + Eq + Copy, const DIM: usize> HeterogeneousPaletteData<V, DIM> {
    fn get(&self, x: usize, y: usize, z: usize) -> V {
        debug_assert!(x < DIM && y < DIM && z < DIM);
        self.cube[y][z][x]
    }

    /// Returns the previous value.
    fn set(&mut self, x: usize, y: usize, z: usize, value: V) -> V {
        debug_assert!(x < DIM && y < DIM && z < DIM);

        let original = self.cube[y][z][x];
        if original == value {
            return original;
        }
        let original_index = self.index[&original];
        self.counts[original_index] -= 1;

        if self.counts[original_index] == 0 {
            self.index.remove(&original);
            let last = self.palette.len() - 1;
            if original_index != last {
                // swap_remove moves the last entry into the freed slot
                self.index.insert(self.palette[last], original_index);
            }
            self.palette.swap_remove(original_index);
            self.counts.swap_remove(original_index);
        }

        self.cube[y][z][x] = value;

        if let Some(&existing_index) = self.index.get(&value) {
            self.counts[existing_index] += 1;
        } else {
            self.index.insert(value, self.palette.len());
            self.palette.push(value);
            self.counts.push(1);
        }

        original
    }
}

/// A cube of values that collapses to a single entry while homogeneous.
#[derive(Debug, Clone)]
pub enum PalettedContainer<V: Hash + Eq + Copy + Default, const DIM: usize> {
    Homogeneous(V),
    Heterogeneous(Box<HeterogeneousPaletteData<V, DIM>>),
}

impl<V: Hash + Eq + Copy + Default, const DIM: usize> PalettedContainer<V, DIM> {
    pub const SIZE: usize = DIM;
    pub const VOLUME: usize = DIM * DIM * DIM;

    fn from_cube(cube: Box<AbstractCube<V, DIM>>) -> Self {
        let mut palette: Vec<V> = Vec::new();
        let mut counts: Vec<u16> = Vec::new();
        let mut index: FxHashMap<V, usize> = FxHashMap::default();

        for val in cube.as_flattened().as_flattened().iter() {
            if let Some(&idx) = index.get(val) {
                counts[idx] += 1;
            } else {
                index.insert(*val, palette.len());
                palette.push(*val);
                counts.push(1);
            }
        }

        if palette.len() == 1 {
            Self::Homogeneous(palette[0])
        } else {
            Self::Heterogeneous(Box::new(HeterogeneousPaletteData {
                cube,
                palette,
                counts,
                index,
            }))
        }
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> V {
        match self {
            Self::Homogeneous(value) => *value,
            Self::Heterogeneous(data) => data.get(x, y, z),
        }
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: V) -> V {
        match self {
            Self::Homogeneous(original) => {
                let original = *original;
                if value != original {
                    let mut cube = Box::new([[[original; DIM]; DIM]; DIM]);
                    cube[y][z][x] = value;
                    *self = Self::from_cube(cube);
                }
                original
            }
            Self::Heterogeneous(data) => {
                let original = data.set(x, y, z, value);
                if data.counts.len() == 1 {
                    *self = Self::Homogeneous(data.palette[0]);
                }
                original
            }
        }
    }

    /// Distinct values and how many cells hold each.
    pub fn palette_counts(&self) -> Vec<(V, usize)> {
        match self {
            Self::Homogeneous(value) => vec![(*value, Self::VOLUME)],
            Self::Heterogeneous(data) => data
                .palette
                .iter()
                .zip(&data.counts)
                .map(|(value, count)| (*value, *count as usize))
                .collect(),
        }
    }
}

impl<V: Default + Hash + Eq + Copy, const DIM: usize> Default for PalettedContainer<V, DIM> {
    fn default() -> Self {
        Self::Homogeneous(V::default())
    }
}

#[cfg(test)]
mod test {
    use crate::world::chunk::palette::PalettedContainer;

    #[test]
    fn collapses_back_to_homogeneous() {
        let mut container = PalettedContainer::<u16, 4>::default();
        assert_eq!(container.set(1, 2, 3, 7), 0);
        assert_eq!(container.get(1, 2, 3), 7);
        assert!(matches!(container, PalettedContainer::Heterogeneous(_)));
        assert_eq!(container.set(1, 2, 3, 0), 7);
        assert!(matches!(container, PalettedContainer::Homogeneous(0)));
    }

    #[test]
    fn counts_track_sets() {
        let mut container = PalettedContainer::<u16, 2>::default();
        container.set(0, 0, 0, 5);
        container.set(1, 0, 0, 5);
        let mut counts = container.palette_counts();
        counts.sort();
        assert_eq!(counts, vec![(0, 6), (5, 2)]);
    }
}
