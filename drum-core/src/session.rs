//! Per-strike accumulation buffer.

/// Samples captured since a strike's onset.
///
/// The buffer is sized to the refine window when created and never grows;
/// samples arriving after it is full are dropped.
#[derive(Debug, Clone)]
pub struct StrikeSession {
    buffer: Vec<f32>,
    write_index: usize,
    coarse_sent: bool,
    start_sample: u64,
    last_rms: f32,
}

impl StrikeSession {
    /// Starts a session on a recycled buffer. The buffer is zeroed and resized
    /// to `capacity`, so passing one of that capacity does not allocate.
    pub fn start(mut buffer: Vec<f32>, capacity: usize, start_sample: u64) -> Self {
        buffer.clear();
        buffer.resize(capacity, 0.0);
        Self {
            buffer,
            write_index: 0,
            coarse_sent: false,
            start_sample,
            last_rms: 0.0,
        }
    }

    /// Copies as much of `samples` as fits. Returns the number copied.
    pub fn append(&mut self, samples: &[f32]) -> usize {
        let remaining = self.buffer.len() - self.write_index;
        let count = remaining.min(samples.len());
        self.buffer[self.write_index..self.write_index + count].copy_from_slice(&samples[..count]);
        self.write_index += count;
        count
    }

    pub fn captured(&self) -> usize {
        self.write_index
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_full(&self) -> bool {
        self.write_index >= self.buffer.len()
    }

    /// The first `len` samples of the buffer; positions never written are zero.
    pub fn window(&self, len: usize) -> &[f32] {
        &self.buffer[..len.min(self.buffer.len())]
    }

    pub fn coarse_sent(&self) -> bool {
        self.coarse_sent
    }

    pub fn mark_coarse_sent(&mut self) {
        self.coarse_sent = true;
    }

    pub fn start_sample(&self) -> u64 {
        self.start_sample
    }

    pub fn last_rms(&self) -> f32 {
        self.last_rms
    }

    pub fn set_last_rms(&mut self, rms: f32) {
        self.last_rms = rms;
    }

    /// Ends the session, handing the buffer back for reuse.
    pub fn into_buffer(self) -> Vec<f32> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_truncates_at_capacity() {
        let mut session = StrikeSession::start(Vec::new(), 10, 0);
        assert_eq!(session.append(&[1.0; 6]), 6);
        assert_eq!(session.append(&[2.0; 6]), 4);
        assert!(session.is_full());
        assert_eq!(session.append(&[3.0; 6]), 0);
        assert_eq!(session.captured(), 10);
        assert_eq!(session.window(10)[5..7], [1.0, 2.0]);
    }

    #[test]
    fn recycled_buffer_is_zeroed() {
        let mut session = StrikeSession::start(Vec::new(), 8, 0);
        session.append(&[0.5; 8]);
        let buffer = session.into_buffer();
        let ptr = buffer.as_ptr();

        let session = StrikeSession::start(buffer, 8, 512);
        assert_eq!(session.window(8), &[0.0f32; 8]);
        assert_eq!(session.captured(), 0);
        assert!(!session.coarse_sent());
        assert_eq!(session.start_sample(), 512);
        assert_eq!(session.into_buffer().as_ptr(), ptr);
    }

    #[test]
    fn window_is_bounded_by_capacity() {
        let session = StrikeSession::start(Vec::new(), 4, 0);
        assert_eq!(session.window(100).len(), 4);
        assert_eq!(session.window(2).len(), 2);
    }
}
