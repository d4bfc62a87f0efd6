use crate::noise::octave_perlin_noise::OctavePerlinNoise;
use mcrs_random::Random;

const INPUT_FACTOR: f64 = 1.0181268882175227;
const TARGET_DEVIATION: f64 = 1.0 / 6.0;

/// Two offset [`OctavePerlinNoise`]s summed and scaled to a roughly unit deviation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalNoise {
    first: OctavePerlinNoise,
    second: OctavePerlinNoise,
    value_factor: f64,
    max_value: f64,
}

impl NormalNoise {
    pub fn new<R>(random: &mut R, first_octave: i32, amplitudes: Vec<f64>, legacy: bool) -> Self
    where
        R: Random,
    {
        let first = OctavePerlinNoise::new(random, first_octave, amplitudes.clone(), legacy);
        let second = OctavePerlinNoise::new(random, first_octave, amplitudes.clone(), legacy);

        let mut min = i32::MAX;
        let mut max = i32::MIN;
        for (i, value) in amplitudes.iter().enumerate() {
            if *value != 0.0 {
                min = min.min(i as i32);
                max = max.max(i as i32);
            }
        }
        let span = if max >= min { max - min } else { 0 };

        let value_factor = TARGET_DEVIATION / expected_deviation(span);
        let max_value = (first.max_value() + second.max_value()) * value_factor;
        Self {
            first,
            second,
            value_factor,
            max_value,
        }
    }

    #[inline]
    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn get(&self, x: f64, y: f64, z: f64) -> f64 {
        let x2 = x * INPUT_FACTOR;
        let y2 = y * INPUT_FACTOR;
        let z2 = z * INPUT_FACTOR;
        (self.first.get(x, y, z) + self.second.get(x2, y2, z2)) * self.value_factor
    }
}

fn expected_deviation(octaves: i32) -> f64 {
    0.1 * (1.0 + 1.0 / (octaves + 1) as f64)
}

#[cfg(test)]
mod test {
    use crate::noise::normal_noise::NormalNoise;
    use mcrs_random::legacy::LegacyRandom;
    use mcrs_random::xoroshiro::XoroshiroRandom;

    #[test]
    fn sample_legacy_octaves() {
        let mut random = LegacyRandom::new(82);
        let noise = NormalNoise::new(&mut random, -6, vec![1.0, 1.0], true);
        assert_eq!(
            format!("{:.10}", noise.get(0.0, 0.0, 0.0)),
            format!("{:.10}", -0.11173738673691287)
        );
        assert_eq!(
            format!("{:.10}", noise.get(0.5, 4.0, -2.0)),
            format!("{:.10}", -0.12418270136523879)
        );
        assert_eq!(
            format!("{:.10}", noise.get(-204.0, 28.0, 12.0)),
            format!("{:.10}", -0.593348747968403)
        );
    }

    #[test]
    fn sample_positional_octaves() {
        let mut random = LegacyRandom::new(82);
        let noise = NormalNoise::new(&mut random, -6, vec![1.0, 1.0], false);
        assert_eq!(
            format!("{:.10}", noise.get(0.0, 0.0, 0.0)),
            format!("{:.10}", -0.06572953082368196)
        );
        assert_eq!(
            format!("{:.10}", noise.get(0.5, 4.0, -2.0)),
            format!("{:.10}", -0.09575115613646172)
        );
        assert_eq!(
            format!("{:.10}", noise.get(-204.0, 28.0, 12.0)),
            format!("{:.10}", -0.06409661404621553)
        );
    }

    #[test]
    fn deterministic_per_seed() {
        let a = NormalNoise::new(&mut XoroshiroRandom::new(5), -7, vec![1.0, 1.0], false);
        let b = NormalNoise::new(&mut XoroshiroRandom::new(5), -7, vec![1.0, 1.0], false);
        let c = NormalNoise::new(&mut XoroshiroRandom::new(6), -7, vec![1.0, 1.0], false);
        assert_eq!(a.get(10.0, 20.0, 30.0), b.get(10.0, 20.0, 30.0));
        assert_ne!(a.get(10.0, 20.0, 30.0), c.get(10.0, 20.0, 30.0));
        assert!(a.max_value() > 0.0);
    }
}
