use crate::noise::octave_perlin_noise::OctavePerlinNoise;
use mcrs_random::Random;

/// Legacy terrain noise: a selector octave stack lerps between two limit stacks.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendedNoise {
    xz_factor: f64,
    y_factor: f64,
    smear_scale_multiplier: f64,
    xz_multiplier: f64,
    y_multiplier: f64,
    max_value: f64,
    min_limit_noise: OctavePerlinNoise,
    max_limit_noise: OctavePerlinNoise,
    main_noise: OctavePerlinNoise,
}

impl BlendedNoise {
    pub fn new<R>(
        random: &mut R,
        xz_scale: f64,
        y_scale: f64,
        xz_factor: f64,
        y_factor: f64,
        smear_scale_multiplier: f64,
    ) -> Self
    where
        R: Random,
    {
        let min_limit_noise = OctavePerlinNoise::new(random, -15, vec![1.0; 16], true);
        let max_limit_noise = OctavePerlinNoise::new(random, -15, vec![1.0; 16], true);
        let main_noise = OctavePerlinNoise::new(random, -7, vec![1.0; 8], true);
        let xz_multiplier = 684.412 * xz_scale;
        let y_multiplier = 684.412 * y_scale;
        let max_value = min_limit_noise.edge_value(y_multiplier + 2.0);
        Self {
            xz_factor,
            y_factor,
            smear_scale_multiplier,
            xz_multiplier,
            y_multiplier,
            max_value,
            min_limit_noise,
            max_limit_noise,
            main_noise,
        }
    }

    pub fn compute(&self, x: i32, y: i32, z: i32) -> f64 {
        let scaled_x = x as f64 * self.xz_multiplier;
        let scaled_y = y as f64 * self.y_multiplier;
        let scaled_z = z as f64 * self.xz_multiplier;

        let factored_x = scaled_x / self.xz_factor;
        let factored_y = scaled_y / self.y_factor;
        let factored_z = scaled_z / self.xz_factor;

        let smear = self.y_multiplier * self.smear_scale_multiplier;
        let factored_smear = smear / self.y_factor;

        let mut selector = 0.0;
        let mut factor = 1.0;
        for i in 0..8 {
            if let Some(noise) = self.main_noise.get_octave(i) {
                selector += noise.sample(
                    OctavePerlinNoise::wrap(factored_x * factor),
                    OctavePerlinNoise::wrap(factored_y * factor),
                    OctavePerlinNoise::wrap(factored_z * factor),
                    factored_smear * factor,
                    factored_y * factor,
                ) / factor;
            }
            factor /= 2.0;
        }

        let delta = (selector / 10.0 + 1.0) / 2.0;
        let skip_min = delta >= 1.0;
        let skip_max = delta <= 0.0;
        let mut min = 0.0;
        let mut max = 0.0;
        factor = 1.0;
        for i in 0..16 {
            let xx = OctavePerlinNoise::wrap(scaled_x * factor);
            let yy = OctavePerlinNoise::wrap(scaled_y * factor);
            let zz = OctavePerlinNoise::wrap(scaled_z * factor);
            let octave_smear = smear * factor;
            if !skip_min {
                if let Some(noise) = self.min_limit_noise.get_octave(i) {
                    min += noise.sample(xx, yy, zz, octave_smear, scaled_y * factor) / factor;
                }
            }
            if !skip_max {
                if let Some(noise) = self.max_limit_noise.get_octave(i) {
                    max += noise.sample(xx, yy, zz, octave_smear, scaled_y * factor) / factor;
                }
            }
            factor /= 2.0;
        }

        let start = min / 512.0;
        let end = max / 512.0;
        let value = if delta < 0.0 {
            start
        } else if delta > 1.0 {
            end
        } else {
            start + delta * (end - start)
        };
        value / 128.0
    }

    #[inline]
    pub fn min_value(&self) -> f64 {
        -self.max_value
    }

    #[inline]
    pub fn max_value(&self) -> f64 {
        self.max_value
    }
}

#[cfg(test)]
mod test {
    use crate::noise::blended_noise::BlendedNoise;
    use mcrs_random::xoroshiro::XoroshiroRandom;

    #[test]
    fn within_bounds() {
        let noise = BlendedNoise::new(&mut XoroshiroRandom::new(0), 0.25, 0.125, 80.0, 160.0, 8.0);
        assert!(noise.max_value() > 0.0);
        for i in -8..8 {
            let v = noise.compute(i * 17, i * 5, -i * 11);
            assert!(v >= noise.min_value() && v <= noise.max_value());
        }
    }
}
