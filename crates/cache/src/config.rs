//! Limits that bound the snapshot cache.

/// Default maximum number of cached bitmaps.
pub const DEFAULT_ENTRY_LIMIT: usize = 150;

/// Default maximum total cost in bytes (10 MiB).
pub const DEFAULT_COST_LIMIT: usize = 10 * 1024 * 1024;

/// Default bytes per pixel for a packed RGBA bitmap.
pub const DEFAULT_BYTES_PER_PIXEL: usize = 4;

/// Bounds enforced by [`SnapshotCache`](crate::SnapshotCache).
///
/// The cost of one entry is `width * height * bytes_per_pixel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLimits {
    /// Maximum number of live entries
    pub entry_limit: usize,
    /// Maximum sum of entry costs in bytes
    pub cost_limit: usize,
    /// Bytes charged per pixel
    pub bytes_per_pixel: usize,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            entry_limit: DEFAULT_ENTRY_LIMIT,
            cost_limit: DEFAULT_COST_LIMIT,
            bytes_per_pixel: DEFAULT_BYTES_PER_PIXEL,
        }
    }
}

impl CacheLimits {
    /// Creates limits with the given entry count and byte budget.
    pub fn new(entry_limit: usize, cost_limit: usize) -> Self {
        Self {
            entry_limit,
            cost_limit,
            bytes_per_pixel: DEFAULT_BYTES_PER_PIXEL,
        }
    }

    /// Sets the entry count limit.
    pub fn with_entry_limit(mut self, entry_limit: usize) -> Self {
        self.entry_limit = entry_limit;
        self
    }

    /// Sets the total cost limit in bytes.
    pub fn with_cost_limit(mut self, cost_limit: usize) -> Self {
        self.cost_limit = cost_limit;
        self
    }

    /// Sets the cost charged per pixel.
    pub fn with_bytes_per_pixel(mut self, bytes_per_pixel: usize) -> Self {
        self.bytes_per_pixel = bytes_per_pixel;
        self
    }

    /// Cost in bytes of a bitmap with the given pixel dimensions.
    ///
    /// Saturates instead of overflowing so an absurd bitmap is simply
    /// too expensive to cache.
    pub fn cost_of(&self, width: u32, height: u32) -> usize {
        (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(self.bytes_per_pixel)
    }

    /// Returns the cost limit in megabytes.
    pub fn cost_limit_mb(&self) -> usize {
        self.cost_limit / (1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = CacheLimits::default();
        assert_eq!(limits.entry_limit, 150);
        assert_eq!(limits.cost_limit, 10 * 1024 * 1024);
        assert_eq!(limits.bytes_per_pixel, 4);
        assert_eq!(limits.cost_limit_mb(), 10);
    }

    #[test]
    fn test_builder_methods() {
        let limits = CacheLimits::default()
            .with_entry_limit(10)
            .with_cost_limit(4096)
            .with_bytes_per_pixel(3);

        assert_eq!(limits, CacheLimits { entry_limit: 10, cost_limit: 4096, bytes_per_pixel: 3 });
    }

    #[test]
    fn test_cost_of() {
        let limits = CacheLimits::default();
        assert_eq!(limits.cost_of(100, 50), 100 * 50 * 4);
        assert_eq!(limits.cost_of(0, 50), 0);
    }

    #[test]
    fn test_cost_of_saturates() {
        let limits = CacheLimits::default().with_bytes_per_pixel(usize::MAX);
        assert_eq!(limits.cost_of(2, 2), usize::MAX);
    }
}
