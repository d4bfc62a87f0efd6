//! Underground water and lava placement.
//!
//! Fluid levels are sampled on a jittered lattice (16 x 12 x 16 blocks by
//! default). A position takes the status of its nearest lattice point; where
//! two points with different statuses are almost equally close, a pressure
//! term carves air between the two bodies of fluid.

use crate::chunk::surface_height::SurfaceHeightEstimator;
use crate::density_function::FunctionContext;
use crate::density_function::math::{clamped_map, map};
use crate::error::{BuildError, GenerationError};
use crate::router::RouterOutput;
use crate::router::chunk::{ChunkNoiseRouter, SampleContext};
use bevy_math::IVec3;
use mcrs_random::Random;
use mcrs_random::positional::PositionalRandom;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Level given to lattice points that hold no fluid at all.
pub(crate) const WAY_BELOW_MIN_Y: i32 = -32512;

/// Chunk offsets probed around a lattice point for the local surface. The
/// point's own chunk comes first.
const SURFACE_SAMPLING_OFFSETS_IN_CHUNKS: [(i32, i32); 13] = [
    (0, 0),
    (-2, -1),
    (-1, -1),
    (0, -1),
    (1, -1),
    (-3, 0),
    (-2, 0),
    (-1, 0),
    (1, 0),
    (-2, 1),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Squared lattice distances at which a settled fluid stops needing a tick.
const FLOWING_UPDATE_DISTANCES: (i32, i32) = (10 * 10, 12 * 12);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FluidKind {
    Water,
    Lava,
}

/// A fluid filling everything strictly below `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FluidStatus {
    pub level: i32,
    pub fluid: FluidKind,
}

impl FluidStatus {
    pub fn new(level: i32, fluid: FluidKind) -> Self {
        Self { level, fluid }
    }

    /// The fluid at `y`, or `None` for air.
    #[inline]
    pub fn at(&self, y: i32) -> Option<FluidKind> {
        (y < self.level).then_some(self.fluid)
    }
}

/// Fluid used where no aquifer overrides it: sea water, with a lava sea below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FluidPicker {
    pub sea_level: i32,
    pub lava_level: i32,
}

impl FluidPicker {
    pub fn new(sea_level: i32, lava_level: i32) -> Self {
        Self {
            sea_level,
            lava_level,
        }
    }

    pub fn status(&self, y: i32) -> FluidStatus {
        if y < self.lava_level.min(self.sea_level) {
            FluidStatus::new(self.lava_level, FluidKind::Lava)
        } else {
            FluidStatus::new(self.sea_level, FluidKind::Water)
        }
    }
}

/// Tuning constants of the aquifer lattice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AquiferSettings {
    pub spacing_xz: i32,
    pub spacing_y: i32,
    pub sample_offset_xz: i32,
    pub sample_offset_y: i32,
    pub jitter_xz: i32,
    pub jitter_y: i32,
    /// Squared distance gap over which two lattice points stop blending.
    pub similarity_range: f64,
    pub lava_water_pressure: f64,
    /// Margin added to the estimated surface when comparing it with a lattice cell.
    pub surface_margin: i32,
    pub fluid_cell_xz: i32,
    pub fluid_cell_y: i32,
    pub spread_scale: f64,
    pub spread_step: i32,
    pub lava_cell_xz: i32,
    pub lava_cell_y: i32,
    pub lava_threshold: f64,
    /// Local levels above this never turn into lava.
    pub lava_level_cutoff: i32,
    pub deep_lava_level: i32,
}

impl Default for AquiferSettings {
    fn default() -> Self {
        Self {
            spacing_xz: 16,
            spacing_y: 12,
            sample_offset_xz: -5,
            sample_offset_y: 1,
            jitter_xz: 10,
            jitter_y: 9,
            similarity_range: 25.0,
            lava_water_pressure: 2.0,
            surface_margin: 8,
            fluid_cell_xz: 16,
            fluid_cell_y: 40,
            spread_scale: 10.0,
            spread_step: 3,
            lava_cell_xz: 64,
            lava_cell_y: 40,
            lava_threshold: f64::from(0.3_f32),
            lava_level_cutoff: -10,
            deep_lava_level: -54,
        }
    }
}

impl AquiferSettings {
    /// 1 for equally distant points, falling to 0 once the squared distances
    /// differ by `similarity_range`.
    #[inline]
    pub fn similarity(&self, first_distance: i32, second_distance: i32) -> f64 {
        1.0 - f64::from(second_distance - first_distance) / self.similarity_range
    }

    /// Lowest similarity at which two differing statuses still need a fluid tick.
    #[inline]
    pub fn flowing_similarity(&self) -> f64 {
        let (near, far) = FLOWING_UPDATE_DISTANCES;
        self.similarity(near, far)
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        let positive = [
            ("spacing_xz", self.spacing_xz),
            ("spacing_y", self.spacing_y),
            ("jitter_xz", self.jitter_xz),
            ("jitter_y", self.jitter_y),
            ("fluid_cell_xz", self.fluid_cell_xz),
            ("fluid_cell_y", self.fluid_cell_y),
            ("spread_step", self.spread_step),
            ("lava_cell_xz", self.lava_cell_xz),
            ("lava_cell_y", self.lava_cell_y),
        ];
        if let Some((field, _)) = positive.into_iter().find(|(_, value)| *value <= 0) {
            return Err(BuildError::InvalidAquiferSetting(field));
        }
        if !(self.similarity_range > 0.0) {
            return Err(BuildError::InvalidAquiferSetting("similarity_range"));
        }
        Ok(())
    }
}

/// Per-chunk aquifer state. Lattice jitter and fluid statuses are cached for
/// the lifetime of the chunk.
pub struct Aquifer {
    settings: AquiferSettings,
    picker: FluidPicker,
    random: PositionalRandom,
    locations: FxHashMap<IVec3, IVec3>,
    statuses: FxHashMap<IVec3, FluidStatus>,
    should_schedule_fluid_update: bool,
}

impl Aquifer {
    pub fn new(random: PositionalRandom, picker: FluidPicker, settings: AquiferSettings) -> Self {
        Self {
            settings,
            picker,
            random,
            locations: FxHashMap::default(),
            statuses: FxHashMap::default(),
            should_schedule_fluid_update: false,
        }
    }

    /// Whether the last substance returned is a fluid that may still flow.
    #[inline]
    pub fn should_schedule_fluid_update(&self) -> bool {
        self.should_schedule_fluid_update
    }

    /// Number of lattice points whose fluid status has been computed.
    pub fn resolved_points(&self) -> usize {
        self.statuses.len()
    }

    /// Decides what fills a position: `None` for air, otherwise a fluid.
    pub fn compute_substance(
        &mut self,
        router: &mut ChunkNoiseRouter,
        heights: &mut SurfaceHeightEstimator,
        ctx: SampleContext,
        density: f64,
    ) -> Result<Option<FluidKind>, GenerationError> {
        self.should_schedule_fluid_update = false;
        if density > 0.0 {
            return Ok(None);
        }
        let pos = ctx.block_pos();
        if self.picker.status(pos.y).at(pos.y) == Some(FluidKind::Lava) {
            return Ok(Some(FluidKind::Lava));
        }

        let s = self.settings;
        let anchor = IVec3::new(
            (pos.x + s.sample_offset_xz).div_euclid(s.spacing_xz),
            (pos.y + s.sample_offset_y).div_euclid(s.spacing_y),
            (pos.z + s.sample_offset_xz).div_euclid(s.spacing_xz),
        );
        // four nearest lattice cells, ascending by squared distance
        let mut nearest = [(i32::MAX, IVec3::ZERO); 4];
        for dx in 0..=1 {
            for dy in -1..=1 {
                for dz in 0..=1 {
                    let cell = anchor + IVec3::new(dx, dy, dz);
                    let distance = (self.location(cell) - pos).length_squared();
                    if let Some(slot) = nearest.iter().position(|(d, _)| *d >= distance) {
                        nearest[slot..].rotate_right(1);
                        nearest[slot] = (distance, cell);
                    }
                }
            }
        }

        let first = self.status(nearest[0].1, router, heights)?;
        let fluid = first.at(pos.y);
        let similarity = s.similarity(nearest[0].0, nearest[1].0);
        let flowing = s.flowing_similarity();
        if similarity <= 0.0 {
            self.should_schedule_fluid_update = similarity >= flowing
                && first != self.status(nearest[1].1, router, heights)?;
            return Ok(fluid);
        }
        if fluid == Some(FluidKind::Water)
            && self.picker.status(pos.y - 1).at(pos.y - 1) == Some(FluidKind::Lava)
        {
            self.should_schedule_fluid_update = true;
            return Ok(fluid);
        }

        let mut barrier = None;
        let second = self.status(nearest[1].1, router, heights)?;
        if density + similarity * self.pressure(router, ctx, &mut barrier, first, second)? > 0.0 {
            return Ok(None);
        }
        let near = [(nearest[0].0, first), (nearest[1].0, second)];
        let mut far = [None; 2];
        for (index, &(far_distance, far_cell)) in nearest[2..].iter().enumerate() {
            for &(near_distance, near_status) in &near {
                let pair_similarity = s.similarity(near_distance, far_distance);
                if pair_similarity <= 0.0 {
                    continue;
                }
                let far_status = self.cached_status(&mut far[index], far_cell, router, heights)?;
                let pressure = self.pressure(router, ctx, &mut barrier, near_status, far_status)?;
                if density + similarity * pair_similarity * pressure > 0.0 {
                    return Ok(None);
                }
            }
        }

        // a tick is only needed where two different statuses meet
        let mut meets = first != second;
        let (third_distance, third_cell) = nearest[2];
        for &(near_distance, near_status) in &near {
            if !meets && s.similarity(near_distance, third_distance) >= flowing {
                meets = near_status != self.cached_status(&mut far[0], third_cell, router, heights)?;
            }
        }
        let (fourth_distance, fourth_cell) = nearest[3];
        if !meets && s.similarity(nearest[0].0, fourth_distance) >= flowing {
            meets = first != self.cached_status(&mut far[1], fourth_cell, router, heights)?;
        }
        self.should_schedule_fluid_update = meets;
        Ok(fluid)
    }

    fn cached_status(
        &mut self,
        slot: &mut Option<FluidStatus>,
        cell: IVec3,
        router: &mut ChunkNoiseRouter,
        heights: &mut SurfaceHeightEstimator,
    ) -> Result<FluidStatus, GenerationError> {
        if let Some(status) = *slot {
            return Ok(status);
        }
        let status = self.status(cell, router, heights)?;
        *slot = Some(status);
        Ok(status)
    }

    /// Jittered center of a lattice cell.
    fn location(&mut self, cell: IVec3) -> IVec3 {
        let s = self.settings;
        let random = self.random;
        *self.locations.entry(cell).or_insert_with(|| {
            let mut random = random.at(cell.x, cell.y, cell.z);
            IVec3::new(
                cell.x * s.spacing_xz + random.next_i32_bound(s.jitter_xz),
                cell.y * s.spacing_y + random.next_i32_bound(s.jitter_y),
                cell.z * s.spacing_xz + random.next_i32_bound(s.jitter_xz),
            )
        })
    }

    fn status(
        &mut self,
        cell: IVec3,
        router: &mut ChunkNoiseRouter,
        heights: &mut SurfaceHeightEstimator,
    ) -> Result<FluidStatus, GenerationError> {
        if let Some(status) = self.statuses.get(&cell) {
            return Ok(*status);
        }
        let location = self.location(cell);
        let status = self.compute_fluid(location, router, heights)?;
        self.statuses.insert(cell, status);
        Ok(status)
    }

    fn compute_fluid(
        &self,
        pos: IVec3,
        router: &mut ChunkNoiseRouter,
        heights: &mut SurfaceHeightEstimator,
    ) -> Result<FluidStatus, GenerationError> {
        let s = &self.settings;
        let global = self.picker.status(pos.y);
        let top = pos.y + s.spacing_y;
        let bottom = pos.y - s.spacing_y;
        let mut lowest_surface = i32::MAX;
        let mut center_under_fluid = false;
        for (offset_x, offset_z) in SURFACE_SAMPLING_OFFSETS_IN_CHUNKS {
            let x = pos.x + (offset_x << 4);
            let z = pos.z + (offset_z << 4);
            let surface = heights.estimate(x, z);
            let adjusted = surface + s.surface_margin;
            let is_center = offset_x == 0 && offset_z == 0;
            if is_center && bottom > adjusted {
                return Ok(global);
            }
            let pokes_above = top > adjusted;
            if pokes_above || is_center {
                let at_surface = self.picker.status(adjusted);
                if at_surface.at(adjusted).is_some() {
                    if is_center {
                        center_under_fluid = true;
                    }
                    if pokes_above {
                        return Ok(at_surface);
                    }
                }
            }
            lowest_surface = lowest_surface.min(surface);
        }
        let level = self.compute_surface_level(pos, global, lowest_surface, center_under_fluid, router)?;
        let fluid = self.compute_fluid_kind(pos, global, level, router)?;
        Ok(FluidStatus::new(level, fluid))
    }

    fn compute_surface_level(
        &self,
        pos: IVec3,
        global: FluidStatus,
        lowest_surface: i32,
        center_under_fluid: bool,
        router: &mut ChunkNoiseRouter,
    ) -> Result<i32, GenerationError> {
        let s = &self.settings;
        let point = SampleContext::Point(pos);
        let erosion = router.compute(RouterOutput::Erosion, point)?;
        let depth = router.compute(RouterOutput::Depth, point)?;
        // deep dark regions stay dry
        let (partially_flooded, fully_flooded) =
            if erosion < f64::from(-0.225_f32) && depth > f64::from(0.9_f32) {
                (-1.0, -1.0)
            } else {
                let below_surface = lowest_surface + s.surface_margin - pos.y;
                let factor = if center_under_fluid {
                    clamped_map(below_surface as f64, 0.0, 64.0, 1.0, 0.0)
                } else {
                    0.0
                };
                let floodedness = router
                    .compute(RouterOutput::FluidLevelFloodedness, point)?
                    .clamp(-1.0, 1.0);
                let fully = map(factor, 1.0, 0.0, f64::from(-0.3_f32), f64::from(0.8_f32));
                let partially = map(factor, 1.0, 0.0, f64::from(-0.8_f32), f64::from(0.4_f32));
                (floodedness - partially, floodedness - fully)
            };
        if fully_flooded > 0.0 {
            Ok(global.level)
        } else if partially_flooded > 0.0 {
            self.randomized_surface_level(pos, lowest_surface, router)
        } else {
            Ok(WAY_BELOW_MIN_Y)
        }
    }

    fn randomized_surface_level(
        &self,
        pos: IVec3,
        lowest_surface: i32,
        router: &mut ChunkNoiseRouter,
    ) -> Result<i32, GenerationError> {
        let s = &self.settings;
        let cell = IVec3::new(
            pos.x.div_euclid(s.fluid_cell_xz),
            pos.y.div_euclid(s.fluid_cell_y),
            pos.z.div_euclid(s.fluid_cell_xz),
        );
        let middle = cell.y * s.fluid_cell_y + s.fluid_cell_y / 2;
        let spread = router.compute(RouterOutput::FluidLevelSpread, SampleContext::Point(cell))?
            * s.spread_scale;
        let quantized = (spread / s.spread_step as f64).floor() as i32 * s.spread_step;
        Ok(lowest_surface.min(middle + quantized))
    }

    fn compute_fluid_kind(
        &self,
        pos: IVec3,
        global: FluidStatus,
        level: i32,
        router: &mut ChunkNoiseRouter,
    ) -> Result<FluidKind, GenerationError> {
        let s = &self.settings;
        if level <= s.lava_level_cutoff && level != WAY_BELOW_MIN_Y && global.fluid != FluidKind::Lava {
            let cell = IVec3::new(
                pos.x.div_euclid(s.lava_cell_xz),
                pos.y.div_euclid(s.lava_cell_y),
                pos.z.div_euclid(s.lava_cell_xz),
            );
            let lava = router.compute(RouterOutput::Lava, SampleContext::Point(cell))?;
            if lava.abs() > s.lava_threshold {
                return Ok(FluidKind::Lava);
            }
        }
        Ok(global.fluid)
    }

    /// Density added between two lattice statuses. Water touching lava gets a
    /// fixed push towards air, so the two bodies are kept apart by a cave.
    fn pressure(
        &self,
        router: &mut ChunkNoiseRouter,
        ctx: SampleContext,
        barrier: &mut Option<f64>,
        first: FluidStatus,
        second: FluidStatus,
    ) -> Result<f64, GenerationError> {
        let y = ctx.block_pos().y;
        match (first.at(y), second.at(y)) {
            (Some(FluidKind::Lava), Some(FluidKind::Water))
            | (Some(FluidKind::Water), Some(FluidKind::Lava)) => {
                return Ok(self.settings.lava_water_pressure);
            }
            _ => {}
        }
        let level_gap = (first.level - second.level).abs();
        if level_gap == 0 {
            return Ok(0.0);
        }
        let average_level = 0.5 * f64::from(first.level + second.level);
        let above_average = f64::from(y) + 0.5 - average_level;
        let edge_distance = f64::from(level_gap) / 2.0 - above_average.abs();
        let gradient = if above_average > 0.0 {
            if edge_distance > 0.0 {
                edge_distance / 1.5
            } else {
                edge_distance / 2.5
            }
        } else {
            let center = 3.0 + edge_distance;
            if center > 0.0 { center / 3.0 } else { center / 10.0 }
        };
        let noise = if (-2.0..=2.0).contains(&gradient) {
            match *barrier {
                Some(value) => value,
                None => *barrier.insert(router.compute(RouterOutput::Barrier, ctx)?),
            }
        } else {
            0.0
        };
        Ok(2.0 * (noise + gradient))
    }
}

#[cfg(test)]
mod test {
    use crate::aquifer::{Aquifer, AquiferSettings, FluidKind, FluidPicker, FluidStatus};
    use crate::chunk::surface_height::SurfaceHeightEstimator;
    use crate::density_function::proto::DensityFunctionHolder;
    use crate::error::BuildError;
    use crate::proto::{NoiseSettings, ProtoNoiseRouter};
    use crate::random_state::RandomState;
    use crate::router::NoiseRouter;
    use crate::router::chunk::{CellLayout, ChunkNoiseRouter, SampleContext};
    use bevy_math::IVec3;
    use mcrs_engine::world::chunk::ChunkPos;
    use std::collections::BTreeMap;

    #[test]
    fn picker_puts_lava_under_the_sea() {
        let picker = FluidPicker::new(62, -54);
        assert_eq!(picker.status(70), FluidStatus::new(62, FluidKind::Water));
        assert_eq!(picker.status(70).at(70), None);
        assert_eq!(picker.status(0).at(0), Some(FluidKind::Water));
        assert_eq!(picker.status(-60).at(-60), Some(FluidKind::Lava));
        // a sea below the lava level takes over
        let low = FluidPicker::new(-60, -54);
        assert_eq!(low.status(-58).fluid, FluidKind::Water);
    }

    #[test]
    fn similarity_falls_with_distance_gap() {
        let settings = AquiferSettings::default();
        assert_eq!(settings.similarity(40, 40), 1.0);
        assert_eq!(settings.similarity(40, 65), 0.0);
        let mut previous = f64::INFINITY;
        for gap in 0..80 {
            let similarity = settings.similarity(100, 100 + gap);
            assert!(similarity <= previous);
            previous = similarity;
        }
    }

    #[test]
    fn settings_default_from_empty_json() {
        let settings: AquiferSettings = serde_json::from_str(r#"{"spacing_y": 8}"#).unwrap();
        assert_eq!(settings.spacing_y, 8);
        assert_eq!(settings.similarity_range, 25.0);
        assert_eq!(settings.lava_water_pressure, 2.0);
    }

    fn noise_settings() -> NoiseSettings {
        NoiseSettings {
            min_y: -64,
            height: 384,
            size_horizontal: 1,
            size_vertical: 2,
        }
    }

    /// A router that is -1 everywhere, so every lattice point sees the global sea.
    fn sea(seed: u64) -> (NoiseRouter, Aquifer) {
        let mut state = RandomState::new(seed, false, BTreeMap::new());
        let router = NoiseRouter::new(
            &ProtoNoiseRouter::uniform(DensityFunctionHolder::from(-1.0)),
            &BTreeMap::new(),
            &mut state,
        )
        .unwrap();
        let aquifer = Aquifer::new(
            *state.aquifer_random(),
            FluidPicker::new(62, -54),
            AquiferSettings::default(),
        );
        (router, aquifer)
    }

    #[test]
    fn zero_spacing_or_jitter_is_rejected() {
        assert_eq!(AquiferSettings::default().validate(), Ok(()));
        let settings: AquiferSettings = serde_json::from_str(r#"{"spacing_xz": 0}"#).unwrap();
        assert_eq!(
            settings.validate(),
            Err(BuildError::InvalidAquiferSetting("spacing_xz"))
        );
        let settings = AquiferSettings {
            jitter_y: -3,
            ..AquiferSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(BuildError::InvalidAquiferSetting("jitter_y"))
        );
        let settings = AquiferSettings {
            similarity_range: 0.0,
            ..AquiferSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(BuildError::InvalidAquiferSetting("similarity_range"))
        );
    }

    #[test]
    fn uniform_sea_needs_no_fluid_ticks() {
        let (router, mut aquifer) = sea(11);
        let mut chunk = ChunkNoiseRouter::new(&router, CellLayout::new(&noise_settings(), ChunkPos::new(0, 0))).unwrap();
        let mut heights = SurfaceHeightEstimator::new(&router);
        let mut water = 0;
        for x in 0..16 {
            for z in 0..16 {
                for y in 20..40 {
                    let pos = SampleContext::Point(IVec3::new(x, y, z));
                    let fluid = aquifer.compute_substance(&mut chunk, &mut heights, pos, -1.0).unwrap();
                    assert_eq!(fluid, Some(FluidKind::Water));
                    assert!(!aquifer.should_schedule_fluid_update(), "tick at {x} {y} {z}");
                    water += 1;
                }
            }
        }
        assert_eq!(water, 16 * 16 * 20);
    }

    #[test]
    fn water_meeting_lava_is_split_and_ticked() {
        let (router, mut aquifer) = sea(5);
        let mut chunk = ChunkNoiseRouter::new(&router, CellLayout::new(&noise_settings(), ChunkPos::new(0, 0))).unwrap();
        let mut heights = SurfaceHeightEstimator::new(&router);
        // water west of lattice x 0, lava from there on, both up to y 62
        for x in -6..=6 {
            for y in -2..=6 {
                for z in -3..=3 {
                    let fluid = if x < 0 { FluidKind::Water } else { FluidKind::Lava };
                    aquifer.statuses.insert(IVec3::new(x, y, z), FluidStatus::new(62, fluid));
                }
            }
        }
        let settings = AquiferSettings::default();
        let (mut air, mut ticked, mut water, mut lava) = (0, 0, 0, 0);
        for x in -48..48 {
            for z in 0..16 {
                for y in 20..40 {
                    let pos = IVec3::new(x, y, z);
                    let fluid = aquifer
                        .compute_substance(&mut chunk, &mut heights, SampleContext::Point(pos), -1.0)
                        .unwrap();
                    let flagged = aquifer.should_schedule_fluid_update();

                    let anchor = IVec3::new(
                        (x + settings.sample_offset_xz).div_euclid(settings.spacing_xz),
                        (y + settings.sample_offset_y).div_euclid(settings.spacing_y),
                        (z + settings.sample_offset_xz).div_euclid(settings.spacing_xz),
                    );
                    let mut nearest = Vec::new();
                    for dx in 0..=1 {
                        for dy in -1..=1 {
                            for dz in 0..=1 {
                                let cell = anchor + IVec3::new(dx, dy, dz);
                                nearest.push(((aquifer.location(cell) - pos).length_squared(), cell));
                            }
                        }
                    }
                    nearest.sort_by_key(|(distance, _)| *distance);
                    if settings.similarity(nearest[0].0, nearest[1].0) <= 0.0 {
                        assert_eq!(fluid, aquifer.statuses[&nearest[0].1].at(y));
                    }
                    if x < -40 || x >= 40 {
                        // all four nearest points hold the same fluid
                        assert!(fluid.is_some() && !flagged, "unexpected split at {x} {y} {z}");
                    }
                    match fluid {
                        None => air += 1,
                        Some(FluidKind::Water) => water += 1,
                        Some(FluidKind::Lava) => lava += 1,
                    }
                    if flagged {
                        assert!(fluid.is_some());
                        ticked += 1;
                    }
                }
            }
        }
        assert!(air > 0);
        assert!(ticked > 0);
        assert!(water > 0 && lava > 0);
    }

    #[test]
    fn air_above_sea_and_lava_at_the_bottom() {
        let mut state = RandomState::new(11, false, BTreeMap::new());
        let router = NoiseRouter::new(
            &ProtoNoiseRouter::uniform(DensityFunctionHolder::from(-1.0)),
            &BTreeMap::new(),
            &mut state,
        )
        .unwrap();
        let mut chunk = ChunkNoiseRouter::new(&router, CellLayout::new(&noise_settings(), ChunkPos::new(0, 0))).unwrap();
        let mut heights = SurfaceHeightEstimator::new(&router);
        let mut aquifer = Aquifer::new(
            *state.aquifer_random(),
            FluidPicker::new(62, -54),
            AquiferSettings::default(),
        );
        for (x, z) in [(0, 0), (7, 9), (15, 15)] {
            let high = SampleContext::Point(IVec3::new(x, 70, z));
            assert_eq!(aquifer.compute_substance(&mut chunk, &mut heights, high, -1.0), Ok(None));
            let low = SampleContext::Point(IVec3::new(x, -60, z));
            assert_eq!(
                aquifer.compute_substance(&mut chunk, &mut heights, low, -1.0),
                Ok(Some(FluidKind::Lava))
            );
            assert!(!aquifer.should_schedule_fluid_update());
        }
        // positive density is never handed a fluid
        let pos = SampleContext::Point(IVec3::new(3, 20, 3));
        assert_eq!(aquifer.compute_substance(&mut chunk, &mut heights, pos, 0.5), Ok(None));
        assert!(aquifer.resolved_points() > 0);
    }
}
