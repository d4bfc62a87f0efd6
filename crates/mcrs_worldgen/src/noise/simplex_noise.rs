use crate::noise::improved_noise::GRADIENT;
use mcrs_random::Random;

const SQRT_3: f64 = 1.7320508075688772;
const F2: f64 = 0.5 * (SQRT_3 - 1.0);
const G2: f64 = (3.0 - SQRT_3) / 6.0;

/// 2D simplex noise, used by the floating island field.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexNoise {
    permutation: [u8; 256],
    pub origin_x: f64,
    pub origin_y: f64,
    pub origin_z: f64,
}

impl SimplexNoise {
    pub fn from_random<R: Random>(random: &mut R) -> Self {
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

    fn corner(gradient: i32, x: f64, y: f64) -> f64 {
        let t = 0.5 - x * x - y * y;
        if t < 0.0 {
            0.0
        } else {
            let t = t * t;
            let g = &GRADIENT[gradient as usize];
            t * t * (g[0] * x + g[1] * y)
        }
    }

    pub fn get_value(&self, x: f64, y: f64) -> f64 {
        let skew = (x + y) * F2;
        let i = (x + skew).floor() as i32;
        let j = (y + skew).floor() as i32;
        let unskew = (i + j) as f64 * G2;
        let x0 = x - (i as f64 - unskew);
        let y0 = y - (j as f64 - unskew);
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };
        let x1 = x0 - i1 as f64 + G2;
        let y1 = y0 - j1 as f64 + G2;
        let x2 = x0 - 1.0 + 2.0 * G2;
        let y2 = y0 - 1.0 + 2.0 * G2;
        let ii = i & 255;
        let jj = j & 255;
        let g0 = self.p(ii + self.p(jj)) % 12;
        let g1 = self.p(ii + i1 + self.p(jj + j1)) % 12;
        let g2 = self.p(ii + 1 + self.p(jj + 1)) % 12;
        70.0 * (Self::corner(g0, x0, y0) + Self::corner(g1, x1, y1) + Self::corner(g2, x2, y2))
    }
}
