use std::collections::TryReserveError;

/// Owned, resizable scratch storage reused across repeated calls.
///
/// A session asks for `len` elements with [`ScratchBuffer::prepare`]; the
/// backing allocation only grows, so alternating between a full-size session
/// and a smaller reduced session does not reallocate. Contents are reset to
/// `T::default()` on every `prepare`.
#[derive(Debug, Clone, Default)]
pub struct ScratchBuffer<T> {
    storage: Vec<T>,
}

impl<T: Clone + Default> ScratchBuffer<T> {
    pub fn new() -> Self {
        Self {
            storage: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut buffer = Self::new();
        buffer.storage.try_reserve_exact(capacity)?;
        Ok(buffer)
    }

    /// Sizes the buffer for a new session of `len` elements.
    pub fn prepare(&mut self, len: usize) -> Result<&mut [T], TryReserveError> {
        if len > self.storage.capacity() {
            self.storage.try_reserve_exact(len - self.storage.len())?;
        }
        self.storage.clear();
        self.storage.resize(len, T::default());
        Ok(&mut self.storage)
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.storage
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_resets_contents_and_sets_length() {
        let mut buffer: ScratchBuffer<f64> = ScratchBuffer::new();
        buffer.prepare(4).unwrap()[2] = 7.0;
        let session = buffer.prepare(3).unwrap();
        assert_eq!(session, &[0.0, 0.0, 0.0]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn shrinking_session_keeps_allocation() {
        let mut buffer: ScratchBuffer<usize> = ScratchBuffer::with_capacity(16).unwrap();
        buffer.prepare(16).unwrap();
        let capacity = buffer.capacity();
        buffer.prepare(4).unwrap();
        buffer.prepare(12).unwrap();
        assert_eq!(buffer.capacity(), capacity);
        assert_eq!(buffer.len(), 12);
    }

    #[test]
    fn absurd_request_reports_allocation_failure() {
        let mut buffer: ScratchBuffer<u64> = ScratchBuffer::new();
        assert!(buffer.prepare(usize::MAX / 2).is_err());
    }
}
