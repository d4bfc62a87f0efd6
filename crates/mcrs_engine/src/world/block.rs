use bevy_math::DVec3;
use bevy_math::prelude::*;
use indexmap::IndexMap;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct BlockPos(IVec3);

impl Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl ::core::ops::Deref for BlockPos {
    type Target = IVec3;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl BlockPos {
    const PACKED_X_LENGTH: usize = 26;
    const PACKED_Z_LENGTH: usize = 26;
    const PACKED_Y_LENGTH: usize = 12;
    const PACKED_X_MASK: u64 = (1 << Self::PACKED_X_LENGTH) - 1;
    const PACKED_Y_MASK: u64 = (1 << Self::PACKED_Y_LENGTH) - 1;
    const PACKED_Z_MASK: u64 = (1 << Self::PACKED_Z_LENGTH) - 1;

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(IVec3::new(x, y, z))
    }

    /// Packs into the 26/12/26 bit layout used as a stable map key.
    pub fn as_long(&self) -> u64 {
        (self.x as u64 & Self::PACKED_X_MASK) << 38
            | (self.y as u64 & Self::PACKED_Y_MASK)
            | (self.z as u64 & Self::PACKED_Z_MASK) << 12
    }

    pub fn with_y(self, y: i32) -> Self {
        Self::new(self.x, y, self.z)
    }

    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self(self.0 + IVec3::new(dx, dy, dz))
    }
}

impl Hash for BlockPos {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_long().hash(state);
    }
}

impl From<DVec3> for BlockPos {
    fn from(value: DVec3) -> Self {
        BlockPos::new(
            value.x.floor() as i32,
            value.y.floor() as i32,
            value.z.floor() as i32,
        )
    }
}

impl From<IVec3> for BlockPos {
    fn from(value: IVec3) -> Self {
        BlockPos(value)
    }
}

impl From<BlockPos> for IVec3 {
    fn from(pos: BlockPos) -> Self {
        pos.0
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        BlockPos::new(x, y, z)
    }
}

/// Index of a block state in a [`BlockStates`] registry. Id 0 is always air.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct BlockStateId(pub u16);

impl BlockStateId {
    pub const AIR: BlockStateId = BlockStateId(0);
}

/// What terrain code needs to know about a block state.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum BlockKind {
    Air,
    Water,
    Lava,
    Solid,
}

impl BlockKind {
    pub fn is_air(self) -> bool {
        self == BlockKind::Air
    }

    pub fn is_fluid(self) -> bool {
        matches!(self, BlockKind::Water | BlockKind::Lava)
    }

    /// Solid and not a fluid.
    pub fn blocks_motion(self) -> bool {
        self == BlockKind::Solid
    }
}

/// Interns block state names into dense ids.
#[derive(Debug, Clone)]
pub struct BlockStates {
    states: IndexMap<String, BlockKind>,
}

impl Default for BlockStates {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStates {
    pub const AIR_NAME: &'static str = "minecraft:air";

    pub fn new() -> Self {
        let mut states = IndexMap::new();
        states.insert(Self::AIR_NAME.to_owned(), BlockKind::Air);
        Self { states }
    }

    /// Returns the existing id when the name is already known.
    pub fn register(&mut self, name: impl Into<String>, kind: BlockKind) -> BlockStateId {
        let (index, _) = self.states.insert_full(name.into(), kind);
        BlockStateId(index as u16)
    }

    pub fn id(&self, name: &str) -> Option<BlockStateId> {
        self.states
            .get_index_of(name)
            .map(|index| BlockStateId(index as u16))
    }

    pub fn name(&self, id: BlockStateId) -> Option<&str> {
        self.states
            .get_index(id.0 as usize)
            .map(|(name, _)| name.as_str())
    }

    pub fn kind(&self, id: BlockStateId) -> BlockKind {
        self.states
            .get_index(id.0 as usize)
            .map(|(_, kind)| *kind)
            .unwrap_or(BlockKind::Air)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod test {
    use crate::world::block::{BlockKind, BlockPos, BlockStateId, BlockStates};

    #[test]
    fn air_is_zero() {
        let states = BlockStates::new();
        assert_eq!(states.id("minecraft:air"), Some(BlockStateId::AIR));
        assert_eq!(states.kind(BlockStateId::AIR), BlockKind::Air);
    }

    #[test]
    fn register_is_idempotent() {
        let mut states = BlockStates::new();
        let stone = states.register("minecraft:stone", BlockKind::Solid);
        let water = states.register("minecraft:water", BlockKind::Water);
        assert_eq!(states.register("minecraft:stone", BlockKind::Solid), stone);
        assert_ne!(stone, water);
        assert_eq!(states.name(water), Some("minecraft:water"));
        assert!(states.kind(water).is_fluid());
        assert!(states.kind(stone).blocks_motion());
    }

    #[test]
    fn packed_position_round_trips_sign() {
        let a = BlockPos::new(-1, -64, 7);
        let b = BlockPos::new(-1, -63, 7);
        assert_ne!(a.as_long(), b.as_long());
        assert_eq!(a.offset(0, 1, 0), b);
    }
}
