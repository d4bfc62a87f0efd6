use thiserror::Error;

/// Problems found while binding a declarative terrain description to a seed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("unknown density function `{0}`")]
    UnknownDensityFunction(String),
    #[error("unknown noise `{0}`")]
    UnknownNoise(String),
    #[error("density function `{0}` references itself")]
    CyclicReference(String),
    #[error("spline has no points")]
    EmptySpline,
    #[error("spline point count mismatch: {locations} locations, {values} values, {derivatives} derivatives")]
    MalformedSpline {
        locations: usize,
        values: usize,
        derivatives: usize,
    },
    #[error("invalid cell size {width}x{height}")]
    InvalidCellSize { width: i32, height: i32 },
    #[error("world height {height} starting at {min_y} is not cell aligned")]
    InvalidHeight { min_y: i32, height: i32 },
    #[error("unknown biome `{0}`")]
    UnknownBiome(String),
    #[error("multi noise biome source has no biomes")]
    EmptyBiomeSource,
    #[error("unknown block `{0}`")]
    UnknownBlock(String),
    #[error("aquifer setting `{0}` must be positive")]
    InvalidAquiferSetting(&'static str),
}

/// Misuse of the chunk evaluator. These abort the chunk being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("an interpolation sweep is already running on this chunk")]
    SweepAlreadyActive,
    #[error("no interpolation sweep is running on this chunk")]
    SweepNotActive,
    #[error("cell cache or interpolator sampled outside an interpolation sweep")]
    SampledOutsideSweep,
    #[error("cell ({cell_y}, {cell_z}) is outside the {count_y}x{count_xz} cell grid")]
    CellOutOfRange {
        cell_y: i32,
        cell_z: i32,
        count_y: i32,
        count_xz: i32,
    },
    #[error("chunk at min y {chunk_min_y} with height {chunk_height} does not match the generator")]
    ChunkMismatch { chunk_min_y: i32, chunk_height: i32 },
}
