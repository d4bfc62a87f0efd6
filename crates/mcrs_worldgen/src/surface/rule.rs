use crate::biome::{BiomeId, BiomeRegistry};
use crate::density_function::math::map;
use crate::error::BuildError;
use crate::noise::normal_noise::NormalNoise;
use crate::proto::{BlockState, CaveSurface, ConditionSource, NoiseSettings, SurfaceRule};
use crate::random_state::{RandomState, qualified};
use crate::surface::context::SurfaceContext;
use mcrs_engine::world::block::{BlockStateId, BlockStates};
use mcrs_engine::world::chunk::ChunkAccess;
use mcrs_engine::world::chunk::heightmap::HeightmapKind;
use mcrs_random::Random;
use mcrs_random::positional::PositionalRandom;
use std::sync::Arc;

/// How long a condition result stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Column,
    Block,
    Uncached,
}

/// A condition bound to a seed and a block registry.
#[derive(Debug)]
pub enum Condition {
    Biome(Vec<BiomeId>),
    NoiseThreshold {
        noise: Arc<NormalNoise>,
        min: f64,
        max: f64,
    },
    VerticalGradient {
        random: PositionalRandom,
        true_at_and_below: i32,
        false_at_and_above: i32,
    },
    YAbove {
        y: i32,
        surface_depth_multiplier: i32,
        add_stone_depth: bool,
    },
    Water {
        offset: i32,
        surface_depth_multiplier: i32,
        add_stone_depth: bool,
    },
    Temperature,
    Steep,
    Not(usize),
    Hole,
    AbovePreliminarySurface,
    StoneDepth {
        offset: i32,
        add_surface_depth: bool,
        secondary_depth_range: i32,
        ceiling: bool,
    },
}

impl Condition {
    pub fn scope(&self) -> Scope {
        match self {
            Condition::NoiseThreshold { .. } | Condition::Steep | Condition::Hole => Scope::Column,
            Condition::Biome(_)
            | Condition::VerticalGradient { .. }
            | Condition::YAbove { .. }
            | Condition::Water { .. }
            | Condition::Temperature => Scope::Block,
            Condition::Not(_) | Condition::AbovePreliminarySurface | Condition::StoneDepth { .. } => {
                Scope::Uncached
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Block(BlockStateId),
    Sequence(Vec<Rule>),
    Condition { condition: usize, then_run: Box<Rule> },
    Bandlands,
}

impl Rule {
    pub fn uses_bandlands(&self) -> bool {
        match self {
            Rule::Bandlands => true,
            Rule::Block(_) => false,
            Rule::Sequence(rules) => rules.iter().any(Rule::uses_bandlands),
            Rule::Condition { then_run, .. } => then_run.uses_bandlands(),
        }
    }
}

/// A compiled rule tree. Conditions live in one arena so each one is
/// memoized once per chunk no matter how many rules share it.
#[derive(Debug)]
pub struct SurfaceRules {
    rule: Rule,
    conditions: Vec<Condition>,
}

impl SurfaceRules {
    pub fn compile(
        rule: &SurfaceRule,
        noise: &NoiseSettings,
        random_state: &mut RandomState,
        blocks: &BlockStates,
        biomes: &BiomeRegistry,
    ) -> Result<Self, BuildError> {
        let mut compiler = RuleCompiler {
            noise,
            random_state,
            blocks,
            biomes,
            sources: Vec::new(),
            conditions: Vec::new(),
        };
        let rule = compiler.rule(rule)?;
        Ok(Self {
            rule,
            conditions: compiler.conditions,
        })
    }

    #[inline]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    #[inline]
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// State replacing the placeholder at the context's block, if any rule matches.
    pub fn try_apply<C: ChunkAccess + ?Sized>(
        &self,
        ctx: &mut SurfaceContext<'_>,
        chunk: &C,
    ) -> Option<BlockStateId> {
        self.apply(&self.rule, ctx, chunk)
    }

    fn apply<C: ChunkAccess + ?Sized>(
        &self,
        rule: &Rule,
        ctx: &mut SurfaceContext<'_>,
        chunk: &C,
    ) -> Option<BlockStateId> {
        match rule {
            Rule::Block(state) => Some(*state),
            Rule::Sequence(rules) => rules.iter().find_map(|rule| self.apply(rule, ctx, chunk)),
            Rule::Condition {
                condition,
                then_run,
            } => {
                if self.test(*condition, ctx, chunk) {
                    self.apply(then_run, ctx, chunk)
                } else {
                    None
                }
            }
            Rule::Bandlands => {
                ctx.system()
                    .band(ctx.block_x(), ctx.block_y(), ctx.block_z())
            }
        }
    }

    pub fn test<C: ChunkAccess + ?Sized>(
        &self,
        index: usize,
        ctx: &mut SurfaceContext<'_>,
        chunk: &C,
    ) -> bool {
        let condition = &self.conditions[index];
        let stamp = match condition.scope() {
            Scope::Column => Some(ctx.last_update_xz()),
            Scope::Block => Some(ctx.last_update_y()),
            Scope::Uncached => None,
        };
        if let Some(stamp) = stamp {
            if let Some(value) = ctx.remembered(index, stamp) {
                return value;
            }
        }
        let value = self.compute(condition, ctx, chunk);
        if let Some(stamp) = stamp {
            ctx.remember(index, stamp, value);
        }
        value
    }

    fn compute<C: ChunkAccess + ?Sized>(
        &self,
        condition: &Condition,
        ctx: &mut SurfaceContext<'_>,
        chunk: &C,
    ) -> bool {
        match condition {
            Condition::Biome(biomes) => biomes.contains(&ctx.biome()),
            Condition::NoiseThreshold { noise, min, max } => {
                let value = noise.get(ctx.block_x() as f64, 0.0, ctx.block_z() as f64);
                value >= *min && value <= *max
            }
            Condition::VerticalGradient {
                random,
                true_at_and_below,
                false_at_and_above,
            } => {
                let y = ctx.block_y();
                if y <= *true_at_and_below {
                    return true;
                }
                if y >= *false_at_and_above {
                    return false;
                }
                let chance = map(
                    y as f64,
                    *true_at_and_below as f64,
                    *false_at_and_above as f64,
                    1.0,
                    0.0,
                );
                let mut random = random.at(ctx.block_x(), y, ctx.block_z());
                (random.next_f32() as f64) < chance
            }
            Condition::YAbove {
                y,
                surface_depth_multiplier,
                add_stone_depth,
            } => {
                let stone = if *add_stone_depth {
                    ctx.stone_depth_above()
                } else {
                    0
                };
                ctx.block_y() + stone >= y + ctx.surface_depth() * surface_depth_multiplier
            }
            Condition::Water {
                offset,
                surface_depth_multiplier,
                add_stone_depth,
            } => {
                let water = ctx.water_height();
                if water == i32::MIN {
                    return true;
                }
                let stone = if *add_stone_depth {
                    ctx.stone_depth_above()
                } else {
                    0
                };
                ctx.block_y() + stone
                    >= water + offset + ctx.surface_depth() * surface_depth_multiplier
            }
            Condition::Temperature => {
                let biome = ctx.biome();
                ctx.system().is_cold(biome, ctx.block_pos())
            }
            Condition::Steep => is_steep(chunk, ctx.block_x(), ctx.block_z()),
            Condition::Not(inner) => !self.test(*inner, ctx, chunk),
            Condition::Hole => ctx.surface_depth() <= 0,
            Condition::AbovePreliminarySurface => ctx.block_y() >= ctx.min_surface_level(),
            Condition::StoneDepth {
                offset,
                add_surface_depth,
                secondary_depth_range,
                ceiling,
            } => {
                let depth = if *ceiling {
                    ctx.stone_depth_below()
                } else {
                    ctx.stone_depth_above()
                };
                let surface = if *add_surface_depth {
                    ctx.surface_depth()
                } else {
                    0
                };
                let secondary = if *secondary_depth_range == 0 {
                    0
                } else {
                    map(
                        ctx.surface_secondary(),
                        -1.0,
                        1.0,
                        0.0,
                        *secondary_depth_range as f64,
                    ) as i32
                };
                depth <= 1 + offset + surface + secondary
            }
        }
    }
}

/// Whether the terrain rises by four or more blocks across the column's
/// south/north or west/east neighbours within the chunk.
fn is_steep<C: ChunkAccess + ?Sized>(chunk: &C, x: i32, z: i32) -> bool {
    let (base_x, base_z) = (x & !15, z & !15);
    let (local_x, local_z) = (x & 15, z & 15);
    let height = |dx: i32, dz: i32| {
        chunk.height_at(HeightmapKind::WorldSurfaceWg, base_x + dx, base_z + dz)
    };
    let north = height(local_x, (local_z - 1).max(0));
    let south = height(local_x, (local_z + 1).min(15));
    if south >= north + 4 {
        return true;
    }
    let west = height((local_x - 1).max(0), local_z);
    let east = height((local_x + 1).min(15), local_z);
    west >= east + 4
}

struct RuleCompiler<'a> {
    noise: &'a NoiseSettings,
    random_state: &'a mut RandomState,
    blocks: &'a BlockStates,
    biomes: &'a BiomeRegistry,
    sources: Vec<ConditionSource>,
    conditions: Vec<Condition>,
}

impl RuleCompiler<'_> {
    fn rule(&mut self, rule: &SurfaceRule) -> Result<Rule, BuildError> {
        Ok(match rule {
            SurfaceRule::Bandlands => Rule::Bandlands,
            SurfaceRule::Block { result_state } => Rule::Block(self.block(result_state)?),
            SurfaceRule::Sequence { sequence } => Rule::Sequence(
                sequence
                    .iter()
                    .map(|rule| self.rule(rule))
                    .collect::<Result<_, _>>()?,
            ),
            SurfaceRule::Condition { if_true, then_run } => Rule::Condition {
                condition: self.condition(if_true)?,
                then_run: Box::new(self.rule(then_run)?),
            },
        })
    }

    fn block(&self, state: &BlockState) -> Result<BlockStateId, BuildError> {
        self.blocks
            .id(&qualified(&state.name))
            .ok_or_else(|| BuildError::UnknownBlock(state.name.clone()))
    }

    /// Identical sources compile to the same arena slot.
    fn condition(&mut self, source: &ConditionSource) -> Result<usize, BuildError> {
        if let Some(index) = self.sources.iter().position(|known| known == source) {
            return Ok(index);
        }
        let (min_y, height) = (self.noise.min_y, self.noise.height as i32);
        let condition = match source {
            ConditionSource::Biome { biome_is } => Condition::Biome(
                biome_is
                    .iter()
                    .map(|name| self.biomes.resolve(name))
                    .collect::<Result<_, _>>()?,
            ),
            ConditionSource::NoiseThreshold {
                noise,
                min_threshold,
                max_threshold,
            } => Condition::NoiseThreshold {
                noise: self.random_state.noise(noise)?,
                min: *min_threshold,
                max: *max_threshold,
            },
            ConditionSource::VerticalGradient {
                random_name,
                true_at_and_below,
                false_at_and_above,
            } => Condition::VerticalGradient {
                random: self.random_state.random_factory(random_name),
                true_at_and_below: true_at_and_below.resolve(min_y, height),
                false_at_and_above: false_at_and_above.resolve(min_y, height),
            },
            ConditionSource::YAbove {
                anchor,
                surface_depth_multiplier,
                add_stone_depth,
            } => Condition::YAbove {
                y: anchor.resolve(min_y, height),
                surface_depth_multiplier: *surface_depth_multiplier,
                add_stone_depth: *add_stone_depth,
            },
            ConditionSource::Water {
                offset,
                surface_depth_multiplier,
                add_stone_depth,
            } => Condition::Water {
                offset: *offset,
                surface_depth_multiplier: *surface_depth_multiplier,
                add_stone_depth: *add_stone_depth,
            },
            ConditionSource::Temperature => Condition::Temperature,
            ConditionSource::Steep => Condition::Steep,
            ConditionSource::Not { invert } => Condition::Not(self.condition(invert)?),
            ConditionSource::Hole => Condition::Hole,
            ConditionSource::AbovePreliminarySurface => Condition::AbovePreliminarySurface,
            ConditionSource::StoneDepth {
                offset,
                add_surface_depth,
                secondary_depth_range,
                surface_type,
            } => Condition::StoneDepth {
                offset: *offset,
                add_surface_depth: *add_surface_depth,
                secondary_depth_range: *secondary_depth_range,
                ceiling: *surface_type == CaveSurface::Ceiling,
            },
        };
        self.sources.push(source.clone());
        self.conditions.push(condition);
        Ok(self.conditions.len() - 1)
    }
}

#[cfg(test)]
mod test {
    use crate::biome::{Biome, BiomeRegistry};
    use crate::error::BuildError;
    use crate::proto::{ConditionSource, NoiseSettings, SurfaceRule, VerticalAnchor};
    use crate::random_state::RandomState;
    use crate::surface::rule::{Condition, Rule, Scope, SurfaceRules};
    use mcrs_engine::world::block::{BlockKind, BlockStates};
    use std::collections::BTreeMap;

    const NOISE: NoiseSettings = NoiseSettings {
        min_y: -64,
        height: 384,
        size_horizontal: 1,
        size_vertical: 2,
    };

    fn compile(json: &str) -> Result<SurfaceRules, BuildError> {
        let rule: SurfaceRule = serde_json::from_str(json).unwrap();
        let mut blocks = BlockStates::new();
        blocks.register("minecraft:stone", BlockKind::Solid);
        blocks.register("minecraft:grass_block", BlockKind::Solid);
        let mut biomes = BiomeRegistry::new();
        biomes.register("plains", Biome { temperature: 0.8 });
        let mut state = RandomState::new(7, false, BTreeMap::new());
        SurfaceRules::compile(&rule, &NOISE, &mut state, &blocks, &biomes)
    }

    #[test]
    fn shared_conditions_compile_once() {
        let rules = compile(
            r#"{"type": "sequence", "sequence": [
                {"type": "condition", "if_true": {"type": "biome", "biome_is": ["plains"]},
                 "then_run": {"type": "block", "result_state": {"Name": "grass_block"}}},
                {"type": "condition", "if_true": {"type": "not", "invert": {"type": "biome", "biome_is": ["plains"]}},
                 "then_run": {"type": "block", "result_state": {"Name": "minecraft:stone"}}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(rules.condition_count(), 2);
        let Rule::Sequence(sequence) = rules.rule() else {
            panic!("expected a sequence");
        };
        let Rule::Condition { condition, .. } = &sequence[1] else {
            panic!("expected a condition");
        };
        assert!(matches!(rules.conditions[*condition], Condition::Not(0)));
        assert_eq!(rules.conditions[0].scope(), Scope::Block);
        assert_eq!(rules.conditions[1].scope(), Scope::Uncached);
    }

    #[test]
    fn anchors_resolve_against_world_height() {
        let rules = compile(
            r#"{"type": "condition",
                "if_true": {"type": "vertical_gradient", "random_name": "bedrock_floor",
                            "true_at_and_below": {"above_bottom": 0}, "false_at_and_above": {"above_bottom": 5}},
                "then_run": {"type": "block", "result_state": {"Name": "stone"}}}"#,
        )
        .unwrap();
        let Condition::VerticalGradient {
            true_at_and_below,
            false_at_and_above,
            ..
        } = &rules.conditions[0]
        else {
            panic!("expected a vertical gradient");
        };
        assert_eq!((*true_at_and_below, *false_at_and_above), (-64, -59));
        assert_eq!(VerticalAnchor::BelowTop { below_top: 0 }.resolve(-64, 384), 319);
    }

    #[test]
    fn unknown_names_fail_to_compile() {
        assert_eq!(
            compile(r#"{"type": "block", "result_state": {"Name": "sand"}}"#).unwrap_err(),
            BuildError::UnknownBlock("sand".into())
        );
        assert_eq!(
            compile(
                r#"{"type": "condition", "if_true": {"type": "biome", "biome_is": ["desert"]},
                    "then_run": {"type": "block", "result_state": {"Name": "stone"}}}"#
            )
            .unwrap_err(),
            BuildError::UnknownBiome("desert".into())
        );
        assert!(matches!(
            compile(
                r#"{"type": "condition", "if_true": {"type": "noise_threshold", "noise": "no_such_noise", "min_threshold": 0.0, "max_threshold": 1.0},
                    "then_run": {"type": "block", "result_state": {"Name": "stone"}}}"#
            ),
            Err(BuildError::UnknownNoise(_))
        ));
    }

    #[test]
    fn bandlands_is_found_anywhere_in_the_tree() {
        let rules = compile(
            r#"{"type": "sequence", "sequence": [
                {"type": "condition", "if_true": {"type": "hole"}, "then_run": {"type": "bandlands"}}
            ]}"#,
        )
        .unwrap();
        assert!(rules.rule().uses_bandlands());
        assert!(matches!(
            serde_json::from_str::<ConditionSource>(r#"{"type": "steep"}"#),
            Ok(ConditionSource::Steep)
        ));
    }
}
