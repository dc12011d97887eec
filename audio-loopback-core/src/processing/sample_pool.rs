/// Initial staging array size, in samples.
pub const INITIAL_POOL_SAMPLES: usize = 512;

/// Growable staging array for captured samples.
///
/// Capacity grows to the next power of two of the request and never shrinks
/// during a session. Growth replaces the whole array: nothing staged before
/// a resize is read again.
#[derive(Debug)]
pub struct SampleBufferPool {
    samples: Vec<i16>,
    max_capacity: usize,
}

impl SampleBufferPool {
    pub fn new(max_capacity: usize) -> Self {
        let max_capacity = max_capacity.max(1);
        Self {
            samples: vec![0; INITIAL_POOL_SAMPLES.min(max_capacity)],
            max_capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Grow so that at least `required` samples fit, up to the pool bound.
    ///
    /// Returns `true` if the array was replaced.
    pub fn ensure_capacity(&mut self, required: usize) -> bool {
        if required <= self.samples.len() || self.samples.len() == self.max_capacity {
            return false;
        }

        let new_capacity = required
            .checked_next_power_of_two()
            .unwrap_or(self.max_capacity)
            .min(self.max_capacity);
        log::debug!(
            "growing sample pool {} -> {} samples",
            self.samples.len(),
            new_capacity
        );
        self.samples = vec![0; new_capacity];
        true
    }

    /// Writable staging area of `len` samples (clamped to capacity).
    pub fn staging_mut(&mut self, len: usize) -> &mut [i16] {
        let len = len.min(self.samples.len());
        &mut self.samples[..len]
    }

    /// The first `length` samples, for synchronous handoff.
    pub fn view(&self, length: usize) -> &[i16] {
        &self.samples[..length.min(self.samples.len())]
    }
}
