//! 7x7 Gaussian blur weights.

/// Side length of the mask.
pub const MASK_SIZE: usize = 7;

/// Offset from the mask centre to its edge.
pub const MASK_RADIUS: usize = MASK_SIZE / 2;

/// Sum of the integer weights; each weight is divided by this.
pub const MASK_DIVISOR: u32 = 120;

/// Integer weights, row-major. Symmetric about both axes; sums to
/// [`MASK_DIVISOR`].
const WEIGHTS: [[u32; MASK_SIZE]; MASK_SIZE] = [
    [1, 1, 1, 1, 1, 1, 1],
    [1, 2, 2, 4, 2, 2, 1],
    [1, 2, 4, 8, 4, 2, 1],
    [1, 4, 8, 8, 8, 4, 1],
    [1, 2, 4, 8, 4, 2, 1],
    [1, 2, 2, 4, 2, 2, 1],
    [1, 1, 1, 1, 1, 1, 1],
];

/// The read-only blur mask uploaded once per session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianMask {
    values: [f32; MASK_SIZE * MASK_SIZE],
}

impl GaussianMask {
    pub fn new() -> Self {
        let mut values = [0.0f32; MASK_SIZE * MASK_SIZE];
        for (i, w) in WEIGHTS.iter().flatten().enumerate() {
            values[i] = *w as f32 / MASK_DIVISOR as f32;
        }
        Self { values }
    }

    /// Integer weights, row-major.
    pub fn weights() -> impl Iterator<Item = u32> {
        WEIGHTS.into_iter().flatten()
    }

    /// Normalized weights, row-major.
    pub fn normalized(&self) -> [f32; MASK_SIZE * MASK_SIZE] {
        self.values
    }

    /// Bytes as uploaded to the device (native-endian `f32`).
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.values)
    }

    /// Upload size in bytes.
    pub const fn size_bytes() -> u64 {
        (MASK_SIZE * MASK_SIZE * std::mem::size_of::<f32>()) as u64
    }
}

impl Default for GaussianMask {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn weights_sum_to_divisor() {
        assert_eq!(GaussianMask::weights().sum::<u32>(), MASK_DIVISOR);
        assert_eq!(GaussianMask::weights().count(), MASK_SIZE * MASK_SIZE);
    }

    #[test]
    fn normalized_sums_to_one() {
        let sum: f32 = GaussianMask::new().normalized().iter().sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
        assert!(GaussianMask::new().normalized().iter().all(|w| *w > 0.0));
    }

    #[test]
    fn symmetric_and_peaked() {
        let w = GaussianMask::new().normalized();
        let at = |x: usize, y: usize| w[y * MASK_SIZE + x];
        for y in 0..MASK_SIZE {
            for x in 0..MASK_SIZE {
                assert_eq!(at(x, y), at(MASK_SIZE - 1 - x, y));
                assert_eq!(at(x, y), at(x, MASK_SIZE - 1 - y));
                assert_eq!(at(x, y), at(y, x));
            }
        }
        assert!(at(MASK_RADIUS, MASK_RADIUS) >= at(0, 0));
    }

    #[test]
    fn upload_size() {
        assert_eq!(GaussianMask::new().as_bytes().len() as u64, GaussianMask::size_bytes());
        assert_eq!(GaussianMask::size_bytes(), 196);
    }
}
