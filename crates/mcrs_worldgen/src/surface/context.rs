use crate::biome::{BiomeId, BiomeSource};
use crate::chunk::surface_height::SurfaceHeightEstimator;
use crate::noise::improved_noise::lerp2;
use crate::router::NoiseRouter;
use crate::surface::SurfaceSystem;
use bevy_math::IVec3;

/// Cursor of the surface pass.
///
/// Facts about the current column are recomputed when [`update_xz`](Self::update_xz)
/// bumps the column counter, facts about the current block when either counter moves.
pub struct SurfaceContext<'a> {
    system: &'a SurfaceSystem,
    biome_source: &'a dyn BiomeSource,
    heights: SurfaceHeightEstimator<'a>,
    last_update_xz: u64,
    last_update_y: u64,
    block_x: i32,
    block_y: i32,
    block_z: i32,
    surface_depth: i32,
    stone_depth_above: i32,
    stone_depth_below: i32,
    water_height: i32,
    surface_secondary: Option<(u64, f64)>,
    min_surface_level: Option<(u64, i32)>,
    biome: Option<(u64, BiomeId)>,
    conditions: Vec<Option<(u64, bool)>>,
}

impl<'a> SurfaceContext<'a> {
    pub fn new(
        system: &'a SurfaceSystem,
        biome_source: &'a dyn BiomeSource,
        router: &'a NoiseRouter,
    ) -> Self {
        Self {
            system,
            biome_source,
            heights: SurfaceHeightEstimator::new(router),
            last_update_xz: 0,
            last_update_y: 0,
            block_x: 0,
            block_y: 0,
            block_z: 0,
            surface_depth: 0,
            stone_depth_above: 0,
            stone_depth_below: 0,
            water_height: i32::MIN,
            surface_secondary: None,
            min_surface_level: None,
            biome: None,
            conditions: vec![None; system.rules().condition_count()],
        }
    }

    pub fn update_xz(&mut self, x: i32, z: i32) {
        self.last_update_xz += 1;
        self.last_update_y += 1;
        self.block_x = x;
        self.block_z = z;
        self.surface_depth = self.system.surface_depth(x, z);
    }

    pub fn update_y(
        &mut self,
        stone_depth_above: i32,
        stone_depth_below: i32,
        water_height: i32,
        y: i32,
    ) {
        self.last_update_y += 1;
        self.block_y = y;
        self.stone_depth_above = stone_depth_above;
        self.stone_depth_below = stone_depth_below;
        self.water_height = water_height;
    }

    #[inline]
    pub fn system(&self) -> &'a SurfaceSystem {
        self.system
    }

    #[inline]
    pub fn last_update_xz(&self) -> u64 {
        self.last_update_xz
    }

    #[inline]
    pub fn last_update_y(&self) -> u64 {
        self.last_update_y
    }

    #[inline]
    pub fn block_pos(&self) -> IVec3 {
        IVec3::new(self.block_x, self.block_y, self.block_z)
    }

    #[inline]
    pub fn block_x(&self) -> i32 {
        self.block_x
    }

    #[inline]
    pub fn block_y(&self) -> i32 {
        self.block_y
    }

    #[inline]
    pub fn block_z(&self) -> i32 {
        self.block_z
    }

    #[inline]
    pub fn surface_depth(&self) -> i32 {
        self.surface_depth
    }

    #[inline]
    pub fn stone_depth_above(&self) -> i32 {
        self.stone_depth_above
    }

    #[inline]
    pub fn stone_depth_below(&self) -> i32 {
        self.stone_depth_below
    }

    /// Y just above the nearest fluid surface over this block, `i32::MIN` when dry.
    #[inline]
    pub fn water_height(&self) -> i32 {
        self.water_height
    }

    pub fn surface_secondary(&mut self) -> f64 {
        match self.surface_secondary {
            Some((stamp, value)) if stamp == self.last_update_xz => value,
            _ => {
                let value = self.system.surface_secondary(self.block_x, self.block_z);
                self.surface_secondary = Some((self.last_update_xz, value));
                value
            }
        }
    }

    /// Preliminary surface lerped between the four surrounding chunk corners,
    /// lowered by eight blocks minus the surface depth.
    pub fn min_surface_level(&mut self) -> i32 {
        if let Some((stamp, value)) = self.min_surface_level {
            if stamp == self.last_update_xz {
                return value;
            }
        }
        let corner_x = (self.block_x >> 4) << 4;
        let corner_z = (self.block_z >> 4) << 4;
        let mut corner = |dx: i32, dz: i32| self.heights.estimate(corner_x + dx, corner_z + dz) as f64;
        let (c00, c10, c01, c11) = (corner(0, 0), corner(16, 0), corner(0, 16), corner(16, 16));
        let level = lerp2(
            ((self.block_x & 15) as f32 / 16.0) as f64,
            ((self.block_z & 15) as f32 / 16.0) as f64,
            c00,
            c10,
            c01,
            c11,
        )
        .floor() as i32;
        let value = level + self.surface_depth - 8;
        self.min_surface_level = Some((self.last_update_xz, value));
        value
    }

    pub fn biome(&mut self) -> BiomeId {
        match self.biome {
            Some((stamp, biome)) if stamp == self.last_update_y => biome,
            _ => {
                let biome = self.biome_source.biome_at_block(self.block_pos());
                self.biome = Some((self.last_update_y, biome));
                biome
            }
        }
    }

    #[inline]
    pub(crate) fn remembered(&self, condition: usize, stamp: u64) -> Option<bool> {
        match self.conditions[condition] {
            Some((at, value)) if at == stamp => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn remember(&mut self, condition: usize, stamp: u64, value: bool) {
        self.conditions[condition] = Some((stamp, value));
    }
}
