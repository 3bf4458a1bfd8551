use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

/// Ordered queue of received byte chunks.
///
/// `len()` always equals the sum of the queued chunk lengths. Taking `n`
/// bytes splits the chunk that straddles the cut and requeues its suffix at
/// the head, so no byte is ever dropped or duplicated.
#[derive(Debug, Default)]
pub struct ChunkQueue {
    chunks: VecDeque<Bytes>,
    total: usize,
}

impl ChunkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of queued bytes.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of queued chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Append a received chunk at the tail. Empty chunks are ignored.
    pub fn push(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.total += chunk.len();
        self.chunks.push_back(chunk);
    }

    /// Remove exactly `n` bytes from the head.
    ///
    /// Returns `None` (and leaves the queue untouched) when fewer than `n`
    /// bytes are queued.
    pub fn take(&mut self, n: usize) -> Option<Bytes> {
        if n > self.total {
            return None;
        }
        if n == 0 {
            return Some(Bytes::new());
        }

        // Single-chunk case needs no copy.
        if let Some(front) = self.chunks.front_mut() {
            if front.len() >= n {
                let out = front.split_to(n);
                if front.is_empty() {
                    self.chunks.pop_front();
                }
                self.total -= n;
                return Some(out);
            }
        }

        let mut out = BytesMut::with_capacity(n);
        while out.len() < n {
            let mut chunk = self.chunks.pop_front()?;
            let needed = n - out.len();
            if chunk.len() > needed {
                let rest = chunk.split_off(needed);
                self.chunks.push_front(rest);
            }
            out.extend_from_slice(&chunk);
        }
        self.total -= n;
        Some(out.freeze())
    }

    /// Remove everything that is queued.
    pub fn take_all(&mut self) -> Bytes {
        let total = self.total;
        self.take(total).unwrap_or_default()
    }
}
