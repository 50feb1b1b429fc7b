//! Captured frames and buffer recycling
//!
//! A [`Frame`] owns its pixel buffer. Submitting it to the channel consumes
//! the value, so the capture context cannot touch the pixels afterwards:
//! the one-shot ownership transfer is enforced by the type system, not by
//! convention. Once perception has finished reading, the buffer returns to
//! the [`FramePool`] so steady-state capture allocates nothing.

use std::sync::Arc;

use palm_core::Timestamp;
use palm_geom::Dimensions;
use parking_lot::Mutex;

/// An opaque captured image buffer with its capture timestamp.
///
/// The pixel layout is the capture device's concern; perception treats it as
/// bytes at the device's native resolution and aspect.
#[derive(Debug)]
pub struct Frame {
    pixels: Vec<u8>,
    dims: Dimensions,
    captured_at: Timestamp,
}

impl Frame {
    pub fn new(pixels: Vec<u8>, dims: Dimensions, captured_at: Timestamp) -> Self {
        Frame {
            pixels,
            dims,
            captured_at,
        }
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    #[inline]
    pub fn captured_at(&self) -> Timestamp {
        self.captured_at
    }

    /// Release the backing buffer for recycling.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// Recycles pixel buffers between the capture context and the worker.
#[derive(Debug)]
pub struct FramePool {
    buffers: Mutex<Vec<Vec<u8>>>,
    frame_len: usize,
}

impl FramePool {
    /// Pool for RGBA frames at the given capture dimensions.
    pub fn for_dims(dims: Dimensions) -> Arc<Self> {
        Arc::new(FramePool {
            buffers: Mutex::new(Vec::new()),
            frame_len: dims.width as usize * dims.height as usize * 4,
        })
    }

    /// Take a buffer, allocating only when the pool is empty.
    pub fn acquire(&self) -> Vec<u8> {
        self.buffers
            .lock()
            .pop()
            .unwrap_or_else(|| vec![0u8; self.frame_len])
    }

    /// Return a buffer once its frame has been fully read.
    ///
    /// Buffers of the wrong size (a resize of the capture device) are
    /// discarded instead of poisoning the pool.
    pub fn recycle(&self, buffer: Vec<u8>) {
        if buffer.len() == self.frame_len {
            self.buffers.lock().push(buffer);
        }
    }

    /// Number of idle buffers currently pooled.
    pub fn idle(&self) -> usize {
        self.buffers.lock().len()
    }

    #[inline]
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_recycles_buffers() {
        let pool = FramePool::for_dims(Dimensions::new(4, 4));

        let buf = pool.acquire();
        assert_eq!(buf.len(), 64);
        assert_eq!(pool.idle(), 0);

        pool.recycle(buf);
        assert_eq!(pool.idle(), 1);

        // Reuse, not a fresh allocation path
        let _again = pool.acquire();
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_pool_rejects_wrong_size() {
        let pool = FramePool::for_dims(Dimensions::new(4, 4));
        pool.recycle(vec![0u8; 3]);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_frame_releases_its_buffer() {
        let pool = FramePool::for_dims(Dimensions::new(2, 2));
        let frame = Frame::new(pool.acquire(), Dimensions::new(2, 2), Timestamp::ZERO);

        // Submitting moves the frame; afterwards only the buffer remains.
        let pixels = frame.into_pixels();
        pool.recycle(pixels);
        assert_eq!(pool.idle(), 1);
    }
}
