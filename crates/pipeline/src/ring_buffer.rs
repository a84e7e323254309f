//! Fixed-capacity retained audio (spec §4.B "Buffer discipline").

use std::collections::VecDeque;

/// Always retains the last `capacity_samples` of raw PCM so audio
/// immediately preceding `speech_started` is recoverable.
pub struct RingBuffer {
    samples: VecDeque<i16>,
    capacity_samples: usize,
}

impl RingBuffer {
    pub fn with_capacity_seconds(sample_rate_hz: u32, seconds: u32) -> Self {
        let capacity_samples = (sample_rate_hz * seconds) as usize;
        Self { samples: VecDeque::with_capacity(capacity_samples), capacity_samples }
    }

    pub fn push_frame(&mut self, frame: &[i16]) {
        for &sample in frame {
            if self.samples.len() == self.capacity_samples {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
    }

    /// The trailing `duration_samples`, oldest first. Returns everything
    /// retained if fewer samples than requested are buffered.
    pub fn drain_last(&mut self, duration_samples: usize) -> Vec<i16> {
        let start = self.samples.len().saturating_sub(duration_samples);
        self.samples.iter().skip(start).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Moves the entire buffered utterance out, by move semantics — the
    /// pipeline does not retain a second reference (spec §4.B).
    pub fn take_all(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.samples).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut buf = RingBuffer::with_capacity_seconds(10, 1); // 10 samples
        buf.push_frame(&(0..15).collect::<Vec<i16>>());
        assert_eq!(buf.len(), 10);
        assert_eq!(buf.drain_last(10), (5..15).collect::<Vec<i16>>());
    }

    #[test]
    fn take_all_empties_the_buffer() {
        let mut buf = RingBuffer::with_capacity_seconds(10, 1);
        buf.push_frame(&[1, 2, 3]);
        let taken = buf.take_all();
        assert_eq!(taken, vec![1, 2, 3]);
        assert!(buf.is_empty());
    }
}
