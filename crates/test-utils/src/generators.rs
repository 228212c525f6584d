//! Value generators for synthetic DAP2 responses.

/// Row-major `Float32` values for a `height` x `width` grid variable.
///
/// The value at `[row][col]` is `col * 1000 + row`, so a sliced or
/// transposed response is easy to spot.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates evenly spaced coordinate values.
///
/// # Example
///
/// ```
/// use test_utils::create_axis;
///
/// assert_eq!(create_axis(-1.0, 0.5, 3), vec![-1.0, -0.5, 0.0]);
/// ```
pub fn create_axis(start: f32, step: f32, count: usize) -> Vec<f32> {
    (0..count).map(|i| start + step * i as f32).collect()
}

/// Bytes that look random but repeat for the same `seed`.
pub fn create_hashed_bytes(count: usize, seed: u32) -> Vec<u8> {
    (0..count)
        .map(|i| (mix(i as u32, seed) & 0xff) as u8)
        .collect()
}

fn mix(index: u32, seed: u32) -> u32 {
    let mut h = seed.wrapping_mul(0x9e37_79b9) ^ index;
    h = (h ^ (h >> 15)).wrapping_mul(0x2c1b_3c6d);
    h = (h ^ (h >> 12)).wrapping_mul(0x297a_2d39);
    h ^ (h >> 15)
}
