//! Rotating-index state for highlight reels.
//!
//! The index always stays in `0..len` (or at 0 for an empty reel). Any manual
//! move switches auto-advance off until it is toggled back on.
//!
//! The server only builds the initial state; navigation runs client-side.
#![allow(dead_code)]

use serde::Serialize;

/// Milliseconds between automatic advances.
pub const AUTO_ADVANCE_INTERVAL_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Carousel {
    len: usize,
    index: usize,
    auto_advance: bool,
    interval_ms: u64,
}

impl Carousel {
    /// A reel that advances on its own.
    pub fn auto(len: usize) -> Self {
        Self {
            len,
            index: 0,
            auto_advance: true,
            interval_ms: AUTO_ADVANCE_INTERVAL_MS,
        }
    }

    /// A reel that only moves on user input.
    pub fn manual(len: usize) -> Self {
        Self {
            auto_advance: false,
            ..Self::auto(len)
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_auto_advancing(&self) -> bool {
        self.auto_advance
    }

    pub fn next(&mut self) {
        self.step_forward();
        self.auto_advance = false;
    }

    pub fn prev(&mut self) {
        if self.len > 0 {
            self.index = (self.index + self.len - 1) % self.len;
        }
        self.auto_advance = false;
    }

    /// Jumps to `index`; out-of-range targets are ignored but still pause.
    pub fn go_to(&mut self, index: usize) {
        if index < self.len {
            self.index = index;
        }
        self.auto_advance = false;
    }

    /// Timer callback. Advances only while auto-advance is on.
    pub fn tick(&mut self) {
        if self.auto_advance {
            self.step_forward();
        }
    }

    pub fn toggle_auto_advance(&mut self) {
        self.auto_advance = !self.auto_advance;
    }

    fn step_forward(&mut self) {
        if self.len > 0 {
            self.index = (self.index + 1) % self.len;
        }
    }
}
