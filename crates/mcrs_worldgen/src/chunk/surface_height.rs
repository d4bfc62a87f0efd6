use crate::router::{NoiseRouter, RouterOutput};
use bevy_math::IVec3;
use rustc_hash::FxHashMap;

/// Coarse terrain height per quart column, read from `preliminary_surface_level`.
pub struct SurfaceHeightEstimator<'a> {
    router: &'a NoiseRouter,
    heights: FxHashMap<(i32, i32), i32>,
}

impl<'a> SurfaceHeightEstimator<'a> {
    pub fn new(router: &'a NoiseRouter) -> Self {
        Self {
            router,
            heights: FxHashMap::default(),
        }
    }

    /// Estimated surface y of the quart column holding block `x`, `z`.
    pub fn estimate(&mut self, x: i32, z: i32) -> i32 {
        let quart = (x >> 2, z >> 2);
        let router = self.router;
        *self.heights.entry(quart).or_insert_with(|| {
            let pos = IVec3::new(quart.0 << 2, 0, quart.1 << 2);
            router.compute(RouterOutput::PreliminarySurfaceLevel, pos).floor() as i32
        })
    }

    /// Number of quart columns evaluated so far.
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}
