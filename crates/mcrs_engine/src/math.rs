/// Stores the size that spans a fixed amount of bits
/// For example: 1, 2, 4, 8, 16 and 32 sizes match this description
pub struct BitSize<const BITS: usize>;

impl<const BITS: usize> BitSize<BITS> {
    pub const BITS: usize = BITS;
    pub const SIZE: usize = 1 << BITS;
    pub const AREA: usize = Self::SIZE * Self::SIZE;
    pub const VOLUME: usize = Self::AREA * Self::SIZE;
    pub const MASK: usize = Self::SIZE - 1;

    /// Splits a block coordinate into (section coordinate, local offset).
    #[inline]
    pub const fn split(coord: i32) -> (i32, usize) {
        (coord >> BITS, (coord & Self::MASK as i32) as usize)
    }
}

#[cfg(test)]
mod test {
    use crate::math::BitSize;

    #[test]
    fn split_negative_coords() {
        assert_eq!(BitSize::<4>::split(-1), (-1, 15));
        assert_eq!(BitSize::<4>::split(16), (1, 0));
        assert_eq!(BitSize::<4>::split(-64), (-4, 0));
    }
}
