use crate::noise::improved_noise::ImprovedNoise;
use mcrs_random::Random;

/// Fractal sum of [`ImprovedNoise`] octaves, lowest frequency first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OctavePerlinNoise {
    lowest_freq_input_factor: f64,
    lowest_freq_value_factor: f64,
    max_value: f64,
    amplitudes: Vec<f64>,
    octave_samplers: Vec<Option<ImprovedNoise>>,
}

impl OctavePerlinNoise {
    /// With `legacy` set, octaves are drawn straight from `random` highest frequency first,
    /// skipping the draws of zero-amplitude octaves. Otherwise every octave gets its own
    /// random derived from a positional fork named `octave_{n}`.
    pub fn new<T>(random: &mut T, first_octave: i32, amplitudes: Vec<f64>, legacy: bool) -> Self
    where
        T: Random,
    {
        let len = amplitudes.len();
        let mut octave_samplers: Vec<Option<ImprovedNoise>> = vec![None; len];

        if legacy {
            let top = -first_octave;
            let first = ImprovedNoise::from_random(random);
            if top >= 0 && (top as usize) < len && amplitudes[top as usize] != 0.0 {
                octave_samplers[top as usize] = Some(first);
            }
            for i in (0..top.max(0) as usize).rev() {
                if i < len && amplitudes[i] != 0.0 {
                    octave_samplers[i] = Some(ImprovedNoise::from_random(random));
                } else {
                    random.consume_count(262);
                }
            }
        } else {
            let factory = random.fork_positional();
            for (i, amplitude) in amplitudes.iter().enumerate() {
                if *amplitude != 0.0 {
                    let octave = first_octave + i as i32;
                    let mut octave_random = factory.from_hash_of(&format!("octave_{octave}"));
                    octave_samplers[i] = Some(ImprovedNoise::from_random(&mut octave_random));
                }
            }
        }

        let lowest_freq_input_factor = 2.0_f64.powi(first_octave);
        let lowest_freq_value_factor =
            2.0_f64.powi(len as i32 - 1) / (2.0_f64.powi(len as i32) - 1.0);

        let mut noise = Self {
            lowest_freq_input_factor,
            lowest_freq_value_factor,
            max_value: 0.0,
            amplitudes,
            octave_samplers,
        };
        noise.max_value = noise.edge_value(2.0);
        noise
    }

    /// Octave `i` counted from the highest frequency.
    pub fn get_octave(&self, octave: usize) -> Option<&ImprovedNoise> {
        let len = self.octave_samplers.len();
        if octave >= len {
            return None;
        }
        self.octave_samplers[len - 1 - octave].as_ref()
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn edge_value(&self, scale: f64) -> f64 {
        let mut value = 0.0;
        let mut factor = self.lowest_freq_value_factor;
        for (sampler, amplitude) in self.octave_samplers.iter().zip(&self.amplitudes) {
            if sampler.is_some() {
                value += amplitude * scale * factor;
            }
            factor *= 0.5;
        }
        value
    }

    /// Folds huge coordinates back into a range where f64 still has fractional precision.
    #[inline]
    pub fn wrap(value: f64) -> f64 {
        value - (value / 3.3554432E7 + 0.5).floor() * 3.3554432E7
    }

    pub fn get(&self, x: f64, y: f64, z: f64) -> f64 {
        let mut acc = 0.0;
        let mut input_factor = self.lowest_freq_input_factor;
        let mut value_factor = self.lowest_freq_value_factor;
        for (sampler, amplitude) in self.octave_samplers.iter().zip(&self.amplitudes) {
            if let Some(sampler) = sampler {
                let sample = sampler.sample(
                    Self::wrap(x * input_factor),
                    Self::wrap(y * input_factor),
                    Self::wrap(z * input_factor),
                    0.0,
                    0.0,
                );
                acc += amplitude * sample * value_factor;
            }
            input_factor *= 2.0;
            value_factor /= 2.0;
        }
        acc
    }
}
