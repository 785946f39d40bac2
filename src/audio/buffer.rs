use super::capture::SampleSource;

/// Fixed-capacity, one-shot PCM recording window.
///
/// Bytes are appended at `data_length` until the buffer is full. The buffer
/// never wraps; capture has to be re-armed with [`CaptureBuffer::reset`].
pub struct CaptureBuffer {
    data: Vec<u8>,
    data_length: usize,
}

impl CaptureBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            data_length: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn data_length(&self) -> usize {
        self.data_length
    }

    pub fn space(&self) -> usize {
        self.capacity() - self.data_length
    }

    pub fn is_full(&self) -> bool {
        self.data_length == self.capacity()
    }

    /// Copies as much of `bytes` as fits and returns the count written.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        debug_assert!(!self.is_full(), "append to a full capture buffer");
        let n = bytes.len().min(self.space());
        self.data[self.data_length..self.data_length + n].copy_from_slice(&bytes[..n]);
        self.data_length += n;
        n
    }

    /// Appends `min(bytes_available, space)` bytes pulled from `source`.
    pub fn append_from(&mut self, source: &mut dyn SampleSource) -> usize {
        debug_assert!(!self.is_full(), "append to a full capture buffer");
        let mut scratch = [0u8; 4096];
        let mut written = 0;
        while !self.is_full() {
            let n = source.bytes_available().min(self.space()).min(scratch.len());
            if n == 0 {
                break;
            }
            let read = source.read(&mut scratch[..n]);
            if read == 0 {
                break;
            }
            written += self.append(&scratch[..read]);
        }
        written
    }

    /// Zero-fills the buffer and rewinds the write position.
    pub fn reset(&mut self) {
        self.data.fill(0);
        self.data_length = 0;
    }

    /// Drops all data and resizes to `capacity` bytes.
    pub fn resize(&mut self, capacity: usize) {
        self.data = vec![0; capacity];
        self.data_length = 0;
    }

    /// Recorded bytes `[position, position + len)`, if fully populated.
    pub fn window(&self, position: usize, len: usize) -> Option<&[u8]> {
        let end = position.checked_add(len)?;
        if end > self.data_length {
            return None;
        }
        Some(&self.data[position..end])
    }

    /// The most recent `len` recorded bytes, or fewer if less was recorded.
    pub fn tail(&self, len: usize) -> &[u8] {
        let start = self.data_length.saturating_sub(len);
        &self.data[start..self.data_length]
    }
}
