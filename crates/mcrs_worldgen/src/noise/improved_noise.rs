use mcrs_random::Random;

pub(crate) const GRADIENT: [[f64; 3]; 16] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
    [1.0, 1.0, 0.0],
    [0.0, -1.0, 1.0],
    [-1.0, 1.0, 0.0],
    [0.0, -1.0, -1.0],
];

/// Single-octave gradient noise over a shuffled permutation table.
#[derive(Debug, Clone, PartialEq)]
pub struct ImprovedNoise {
    permutation: [u8; 256],
    pub origin_x: f64,
    pub origin_y: f64,
    pub origin_z: f64,
}

impl ImprovedNoise {
    pub fn from_random<T>(random: &mut T) -> Self
    where
        T: Random,
    {
        let origin_x = random.next_f64() * 256.0;
        let origin_y = random.next_f64() * 256.0;
        let origin_z = random.next_f64() * 256.0;
        let mut permutation = [0u8; 256];
        for (i, slot) in permutation.iter_mut().enumerate() {
            *slot = i as u8;
        }
        for i in 0..256u32 {
            let j = random.next_u32_bound(256 - i);
            permutation.swap(i as usize, (i + j) as usize);
        }
        Self {
            permutation,
            origin_x,
            origin_y,
            origin_z,
        }
    }

    #[inline]
    fn p(&self, index: i32) -> i32 {
        self.permutation[(index & 0xFF) as usize] as i32
    }

    /// `y_scale`/`y_max` quantise the y offset to produce the legacy smeared look.
    pub fn sample(&self, x: f64, y: f64, z: f64, y_scale: f64, y_max: f64) -> f64 {
        let shifted_x = x + self.origin_x;
        let shifted_y = y + self.origin_y;
        let shifted_z = z + self.origin_z;
        let section_x = shifted_x.floor() as i32;
        let section_y = shifted_y.floor() as i32;
        let section_z = shifted_z.floor() as i32;
        let local_x = shifted_x - section_x as f64;
        let local_y = shifted_y - section_y as f64;
        let local_z = shifted_z - section_z as f64;
        let mut fade = 0.0;
        if y_scale != 0.0 {
            let t = if y_max >= 0.0 && y_max < local_y {
                y_max
            } else {
                local_y
            };
            fade = (t / y_scale + 1.0E-7).floor() * y_scale;
        }
        self.sample_and_lerp(
            section_x,
            section_y,
            section_z,
            local_x,
            local_y - fade,
            local_z,
            local_y,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn sample_and_lerp(
        &self,
        section_x: i32,
        section_y: i32,
        section_z: i32,
        local_x: f64,
        local_y: f64,
        local_z: f64,
        fade_local_y: f64,
    ) -> f64 {
        let i = self.p(section_x);
        let j = self.p(section_x.wrapping_add(1));
        let k = self.p(i + section_y);
        let l = self.p(i + section_y + 1);
        let i1 = self.p(j + section_y);
        let j1 = self.p(j + section_y + 1);

        let d000 = grad_dot(self.p(k + section_z), local_x, local_y, local_z);
        let d100 = grad_dot(self.p(i1 + section_z), local_x - 1.0, local_y, local_z);
        let d010 = grad_dot(self.p(l + section_z), local_x, local_y - 1.0, local_z);
        let d110 = grad_dot(self.p(j1 + section_z), local_x - 1.0, local_y - 1.0, local_z);
        let d001 = grad_dot(self.p(k + section_z + 1), local_x, local_y, local_z - 1.0);
        let d101 = grad_dot(self.p(i1 + section_z + 1), local_x - 1.0, local_y, local_z - 1.0);
        let d011 = grad_dot(self.p(l + section_z + 1), local_x, local_y - 1.0, local_z - 1.0);
        let d111 = grad_dot(
            self.p(j1 + section_z + 1),
            local_x - 1.0,
            local_y - 1.0,
            local_z - 1.0,
        );

        lerp3(
            smoothstep(local_x),
            smoothstep(fade_local_y),
            smoothstep(local_z),
            d000,
            d100,
            d010,
            d110,
            d001,
            d101,
            d011,
            d111,
        )
    }
}

#[inline]
fn grad_dot(hash: i32, x: f64, y: f64, z: f64) -> f64 {
    let g = &GRADIENT[(hash & 15) as usize];
    g[0] * x + g[1] * y + g[2] * z
}

/// t³(6t² - 15t + 10)
#[inline]
pub fn smoothstep(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
pub fn lerp(delta: f64, start: f64, end: f64) -> f64 {
    start + delta * (end - start)
}

#[inline]
pub fn lerp2(dx: f64, dy: f64, v00: f64, v10: f64, v01: f64, v11: f64) -> f64 {
    lerp(dy, lerp(dx, v00, v10), lerp(dx, v01, v11))
}

#[allow(clippy::too_many_arguments)]
#[inline]
pub fn lerp3(
    dx: f64,
    dy: f64,
    dz: f64,
    v000: f64,
    v100: f64,
    v010: f64,
    v110: f64,
    v001: f64,
    v101: f64,
    v011: f64,
    v111: f64,
) -> f64 {
    lerp(
        dz,
        lerp2(dx, dy, v000, v100, v010, v110),
        lerp2(dx, dy, v001, v101, v011, v111),
    )
}
