pub mod heightmap;
pub mod palette;

use crate::math::BitSize;
use crate::world::block::{BlockKind, BlockPos, BlockStateId, BlockStates};
use crate::world::chunk::heightmap::{Heightmap, HeightmapKind};
use crate::world::chunk::palette::PalettedContainer;
use bevy_math::prelude::*;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

pub type BLOCKS = BitSize<4>;

/// Column position in chunk coordinates.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ChunkPos(pub IVec2);

impl Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}:{})", self.x, self.y)
    }
}

impl ::core::ops::Deref for ChunkPos {
    type Target = IVec2;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self(IVec2::new(x, z))
    }

    pub fn z(&self) -> i32 {
        self.0.y
    }

    pub fn min_block_x(&self) -> i32 {
        self.x << BLOCKS::BITS
    }

    pub fn min_block_z(&self) -> i32 {
        self.0.y << BLOCKS::BITS
    }

    pub fn as_long(&self) -> u64 {
        (self.x as u32 as u64) | ((self.0.y as u32 as u64) << 32)
    }
}

impl Hash for ChunkPos {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_long().hash(state);
    }
}

impl From<BlockPos> for ChunkPos {
    fn from(pos: BlockPos) -> Self {
        Self::new(pos.x >> BLOCKS::BITS, pos.z >> BLOCKS::BITS)
    }
}

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("chunk height {0} is not a positive multiple of 16")]
    InvalidHeight(u32),
    #[error("minimum y {0} is not aligned to a section")]
    UnalignedMinY(i32),
}

/// Minimal read/write contract terrain generation needs from chunk storage.
pub trait ChunkAccess {
    fn pos(&self) -> ChunkPos;

    fn min_y(&self) -> i32;

    fn height(&self) -> u32;

    fn max_y(&self) -> i32 {
        self.min_y() + self.height() as i32 - 1
    }

    fn block_states(&self) -> &BlockStates;

    /// Air outside the vertical range.
    fn block_state(&self, pos: BlockPos) -> BlockStateId;

    /// Returns the previous state.
    fn set_block_state(&mut self, pos: BlockPos, state: BlockStateId) -> BlockStateId;

    fn block_kind(&self, pos: BlockPos) -> BlockKind {
        self.block_states().kind(self.block_state(pos))
    }

    /// Y of the highest block matching `kind` in the column at world `x`, `z`.
    fn height_at(&self, kind: HeightmapKind, x: i32, z: i32) -> i32;

    fn schedule_fluid_tick(&mut self, pos: BlockPos);
}

#[derive(Debug, Default)]
pub struct Section {
    blocks: PalettedContainer<BlockStateId, 16>,
    pins: Arc<AtomicU32>,
}

impl Section {
    pub fn blocks(&self) -> &PalettedContainer<BlockStateId, 16> {
        &self.blocks
    }

    pub fn is_pinned(&self) -> bool {
        self.pins.load(Ordering::Acquire) > 0
    }
}

/// Holds sections alive while a fill writes into them. Released on drop,
/// including while unwinding.
#[must_use]
pub struct SectionPins {
    pins: Vec<Arc<AtomicU32>>,
}

impl SectionPins {
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

impl Drop for SectionPins {
    fn drop(&mut self) {
        for pin in &self.pins {
            pin.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// A chunk column under generation.
pub struct ProtoChunk {
    pos: ChunkPos,
    min_y: i32,
    height: u32,
    states: Arc<BlockStates>,
    sections: Vec<Section>,
    heightmaps: [Heightmap; 2],
    fluid_ticks: Vec<BlockPos>,
}

impl ProtoChunk {
    pub fn new(
        pos: ChunkPos,
        min_y: i32,
        height: u32,
        states: Arc<BlockStates>,
    ) -> Result<Self, ChunkError> {
        if height == 0 || height as usize % BLOCKS::SIZE != 0 {
            return Err(ChunkError::InvalidHeight(height));
        }
        if min_y & BLOCKS::MASK as i32 != 0 {
            return Err(ChunkError::UnalignedMinY(min_y));
        }
        let sections = (0..height as usize / BLOCKS::SIZE)
            .map(|_| Section::default())
            .collect();
        Ok(Self {
            pos,
            min_y,
            height,
            states,
            sections,
            heightmaps: HeightmapKind::ALL.map(|kind| Heightmap::new(kind, min_y)),
            fluid_ticks: Vec::new(),
        })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn heightmap(&self, kind: HeightmapKind) -> &Heightmap {
        &self.heightmaps[kind as usize]
    }

    pub fn fluid_ticks(&self) -> &[BlockPos] {
        &self.fluid_ticks
    }

    /// Pins every section overlapping `min_y..=max_y`.
    pub fn pin_sections(&self, min_y: i32, max_y: i32) -> SectionPins {
        let first = self.section_index(min_y.max(self.min_y));
        let last = self.section_index(max_y.min(self.max_y()));
        let pins = match (first, last) {
            (Some(first), Some(last)) => self.sections[first..=last]
                .iter()
                .map(|section| {
                    section.pins.fetch_add(1, Ordering::AcqRel);
                    section.pins.clone()
                })
                .collect(),
            _ => Vec::new(),
        };
        SectionPins { pins }
    }

    fn section_index(&self, y: i32) -> Option<usize> {
        if y < self.min_y || y > self.max_y() {
            return None;
        }
        Some(((y - self.min_y) >> BLOCKS::BITS) as usize)
    }

    /// Counts every state across all sections.
    pub fn count_states(&self) -> Vec<(BlockStateId, usize)> {
        let mut totals: Vec<(BlockStateId, usize)> = Vec::new();
        for section in &self.sections {
            for (state, count) in section.blocks.palette_counts() {
                match totals.iter_mut().find(|(id, _)| *id == state) {
                    Some((_, total)) => *total += count,
                    None => totals.push((state, count)),
                }
            }
        }
        totals.sort();
        totals
    }
}

fn read_state(sections: &[Section], min_y: i32, pos: BlockPos) -> BlockStateId {
    let offset = pos.y - min_y;
    if offset < 0 {
        return BlockStateId::AIR;
    }
    let (section, y) = BLOCKS::split(offset);
    let Some(section) = sections.get(section as usize) else {
        return BlockStateId::AIR;
    };
    let (_, x) = BLOCKS::split(pos.x);
    let (_, z) = BLOCKS::split(pos.z);
    section.blocks.get(x, y, z)
}

impl ChunkAccess for ProtoChunk {
    fn pos(&self) -> ChunkPos {
        self.pos
    }

    fn min_y(&self) -> i32 {
        self.min_y
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn block_states(&self) -> &BlockStates {
        &self.states
    }

    fn block_state(&self, pos: BlockPos) -> BlockStateId {
        read_state(&self.sections, self.min_y, pos)
    }

    fn set_block_state(&mut self, pos: BlockPos, state: BlockStateId) -> BlockStateId {
        let Some(index) = self.section_index(pos.y) else {
            return BlockStateId::AIR;
        };
        let (_, x) = BLOCKS::split(pos.x);
        let (_, y) = BLOCKS::split(pos.y - self.min_y);
        let (_, z) = BLOCKS::split(pos.z);
        let previous = self.sections[index].blocks.set(x, y, z, state);
        if previous != state {
            let kind = self.states.kind(state);
            let (sections, states, min_y) = (&self.sections, &self.states, self.min_y);
            for heightmap in &mut self.heightmaps {
                heightmap.update(x, pos.y, z, kind, |below| {
                    states.kind(read_state(sections, min_y, pos.with_y(below)))
                });
            }
        }
        previous
    }

    fn height_at(&self, kind: HeightmapKind, x: i32, z: i32) -> i32 {
        let (_, x) = BLOCKS::split(x);
        let (_, z) = BLOCKS::split(z);
        self.heightmap(kind).highest_taken(x, z)
    }

    fn schedule_fluid_tick(&mut self, pos: BlockPos) {
        self.fluid_ticks.push(pos);
    }
}

#[cfg(test)]
mod test {
    use crate::world::block::{BlockKind, BlockPos, BlockStateId, BlockStates};
    use crate::world::chunk::heightmap::HeightmapKind;
    use crate::world::chunk::{ChunkAccess, ChunkError, ChunkPos, ProtoChunk};
    use std::sync::Arc;

    fn states() -> (Arc<BlockStates>, BlockStateId, BlockStateId) {
        let mut states = BlockStates::new();
        let stone = states.register("minecraft:stone", BlockKind::Solid);
        let water = states.register("minecraft:water", BlockKind::Water);
        (Arc::new(states), stone, water)
    }

    #[test]
    fn rejects_unaligned_shapes() {
        let (states, _, _) = states();
        assert!(matches!(
            ProtoChunk::new(ChunkPos::new(0, 0), -64, 100, states.clone()),
            Err(ChunkError::InvalidHeight(100))
        ));
        assert!(matches!(
            ProtoChunk::new(ChunkPos::new(0, 0), -60, 64, states),
            Err(ChunkError::UnalignedMinY(-60))
        ));
    }

    #[test]
    fn set_updates_heightmaps() {
        let (states, stone, water) = states();
        let mut chunk = ProtoChunk::new(ChunkPos::new(-1, 2), -16, 48, states).unwrap();
        chunk.set_block_state(BlockPos::new(-3, 4, 40), stone);
        chunk.set_block_state(BlockPos::new(-3, 5, 40), water);
        assert_eq!(chunk.block_state(BlockPos::new(-3, 4, 40)), stone);
        assert_eq!(chunk.height_at(HeightmapKind::WorldSurfaceWg, -3, 40), 5);
        assert_eq!(chunk.height_at(HeightmapKind::OceanFloorWg, -3, 40), 4);
        assert_eq!(chunk.block_state(BlockPos::new(-3, 400, 40)), BlockStateId::AIR);
    }

    #[test]
    fn pins_release_on_drop() {
        let (states, _, _) = states();
        let chunk = ProtoChunk::new(ChunkPos::new(0, 0), 0, 64, states).unwrap();
        {
            let pins = chunk.pin_sections(10, 40);
            assert_eq!(pins.len(), 3);
            assert!(chunk.sections()[0].is_pinned());
            assert!(!chunk.sections()[3].is_pinned());
        }
        assert!(chunk.sections().iter().all(|section| !section.is_pinned()));
    }
}
