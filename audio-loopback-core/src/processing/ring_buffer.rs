/// Fixed-capacity circular buffer of 16-bit samples.
///
/// Backends stage captured audio here between the device callback and
/// `read_samples`. Wrap in `Arc<parking_lot::Mutex<CaptureRing>>` to share
/// it with a callback thread.
///
/// Overflow behavior: drops oldest samples, like a device capture ring.
#[derive(Debug)]
pub struct CaptureRing {
    buffer: Vec<i16>,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
}

impl CaptureRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![0; capacity],
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
        }
    }

    /// Write samples into the ring, returning how many old samples were dropped.
    ///
    /// If `samples` is larger than capacity, only the last `capacity` samples are kept.
    pub fn write(&mut self, samples: &[i16]) -> usize {
        if samples.is_empty() {
            return 0;
        }

        let mut dropped = 0;
        let samples = if samples.len() > self.capacity {
            dropped += samples.len() - self.capacity;
            &samples[samples.len() - self.capacity..]
        } else {
            samples
        };

        let overflow = (self.available + samples.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
            dropped += overflow;
        }

        for &sample in samples {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % self.capacity;
        }
        self.available += samples.len();
        dropped
    }

    /// Move up to `dest.len()` samples into `dest`. Returns the number moved.
    pub fn read_into(&mut self, dest: &mut [i16]) -> usize {
        let to_read = dest.len().min(self.available);
        for (i, slot) in dest.iter_mut().take(to_read).enumerate() {
            *slot = self.buffer[(self.read_index + i) % self.capacity];
        }
        self.read_index = (self.read_index + to_read) % self.capacity;
        self.available -= to_read;
        to_read
    }

    /// Number of samples currently available for reading.
    pub fn count(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(ring: &mut CaptureRing, n: usize) -> Vec<i16> {
        let mut out = vec![0; n];
        let read = ring.read_into(&mut out);
        out.truncate(read);
        out
    }

    #[test]
    fn basic_write_read() {
        let mut ring = CaptureRing::new(10);
        ring.write(&[1, 2, 3]);

        assert_eq!(ring.count(), 3);
        assert_eq!(drain(&mut ring, 3), vec![1, 2, 3]);
        assert!(ring.is_empty());
    }

    #[test]
    fn short_read_is_not_an_error() {
        let mut ring = CaptureRing::new(10);
        ring.write(&[1, 2, 3, 4, 5]);

        assert_eq!(drain(&mut ring, 3), vec![1, 2, 3]);
        assert_eq!(drain(&mut ring, 10), vec![4, 5]);
        assert!(ring.is_empty());
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut ring = CaptureRing::new(4);
        ring.write(&[1, 2, 3, 4]);
        let dropped = ring.write(&[5, 6]);

        assert_eq!(dropped, 2);
        assert_eq!(drain(&mut ring, 4), vec![3, 4, 5, 6]);
    }

    #[test]
    fn write_larger_than_capacity() {
        let mut ring = CaptureRing::new(3);
        let dropped = ring.write(&[1, 2, 3, 4, 5]);

        assert_eq!(dropped, 2);
        assert_eq!(drain(&mut ring, 3), vec![3, 4, 5]);
    }

    #[test]
    fn wraparound() {
        let mut ring = CaptureRing::new(4);
        ring.write(&[1, 2, 3]);
        drain(&mut ring, 2);
        ring.write(&[4, 5, 6]);

        assert_eq!(ring.count(), 4);
        assert_eq!(drain(&mut ring, 4), vec![3, 4, 5, 6]);
    }

    #[test]
    fn reset_clears_ring() {
        let mut ring = CaptureRing::new(10);
        ring.write(&[1, 2, 3]);
        ring.reset();

        assert!(ring.is_empty());
        assert!(drain(&mut ring, 10).is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let ring = CaptureRing::new(0);
        assert_eq!(ring.capacity(), 1);
    }
}
