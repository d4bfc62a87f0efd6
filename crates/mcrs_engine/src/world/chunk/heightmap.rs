use crate::world::block::BlockKind;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum HeightmapKind {
    /// Highest non-air block.
    WorldSurfaceWg,
    /// Highest block that blocks motion; fluids do not count.
    OceanFloorWg,
}

impl HeightmapKind {
    pub const ALL: [HeightmapKind; 2] = [HeightmapKind::WorldSurfaceWg, HeightmapKind::OceanFloorWg];

    pub fn is_opaque(self, kind: BlockKind) -> bool {
        match self {
            HeightmapKind::WorldSurfaceWg => !kind.is_air(),
            HeightmapKind::OceanFloorWg => kind.blocks_motion(),
        }
    }
}

/// Per column, the first y above the highest matching block.
#[derive(Clone, Debug)]
pub struct Heightmap {
    kind: HeightmapKind,
    min_y: i32,
    first_available: [i32; 256],
}

impl Heightmap {
    pub fn new(kind: HeightmapKind, min_y: i32) -> Self {
        Self {
            kind,
            min_y,
            first_available: [min_y; 256],
        }
    }

    pub fn kind(&self) -> HeightmapKind {
        self.kind
    }

    #[inline]
    fn index(x: usize, z: usize) -> usize {
        x + z * 16
    }

    pub fn first_available(&self, x: usize, z: usize) -> i32 {
        self.first_available[Self::index(x, z)]
    }

    /// Y of the highest matching block, `min_y - 1` for an empty column.
    pub fn highest_taken(&self, x: usize, z: usize) -> i32 {
        self.first_available(x, z) - 1
    }

    /// Applies a block change at `y`. `below` reads the kind of the block at a lower y
    /// and is only consulted when the current top is removed. Returns whether the height changed.
    pub fn update(
        &mut self,
        x: usize,
        y: i32,
        z: usize,
        kind: BlockKind,
        below: impl Fn(i32) -> BlockKind,
    ) -> bool {
        let index = Self::index(x, z);
        let first = self.first_available[index];
        if y <= first - 2 {
            return false;
        }
        if self.kind.is_opaque(kind) {
            if y >= first {
                self.first_available[index] = y + 1;
                return true;
            }
        } else if first - 1 == y {
            let mut scan = y - 1;
            while scan >= self.min_y {
                if self.kind.is_opaque(below(scan)) {
                    self.first_available[index] = scan + 1;
                    return true;
                }
                scan -= 1;
            }
            self.first_available[index] = self.min_y;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod test {
    use crate::world::block::BlockKind;
    use crate::world::chunk::heightmap::{Heightmap, HeightmapKind};

    #[test]
    fn raises_on_opaque_blocks() {
        let mut map = Heightmap::new(HeightmapKind::WorldSurfaceWg, -64);
        assert!(map.update(3, 10, 4, BlockKind::Solid, |_| BlockKind::Air));
        assert_eq!(map.highest_taken(3, 4), 10);
        assert!(!map.update(3, 5, 4, BlockKind::Solid, |_| BlockKind::Air));
    }

    #[test]
    fn ocean_floor_ignores_water() {
        let mut map = Heightmap::new(HeightmapKind::OceanFloorWg, 0);
        map.update(0, 20, 0, BlockKind::Solid, |_| BlockKind::Air);
        assert!(!map.update(0, 30, 0, BlockKind::Water, |_| BlockKind::Air));
        assert_eq!(map.highest_taken(0, 0), 20);
    }

    #[test]
    fn rescans_when_top_is_removed() {
        let mut map = Heightmap::new(HeightmapKind::WorldSurfaceWg, 0);
        map.update(1, 8, 1, BlockKind::Solid, |_| BlockKind::Air);
        let below = |y: i32| if y <= 4 { BlockKind::Solid } else { BlockKind::Air };
        assert!(map.update(1, 8, 1, BlockKind::Air, below));
        assert_eq!(map.highest_taken(1, 1), 4);
    }
}
