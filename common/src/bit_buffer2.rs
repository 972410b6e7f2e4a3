//! Bit-packed 2D buffer for binary masks.
//!
//! Each row starts on a fresh `u64` word, so row-wise scans (run extraction,
//! row copies) never have to straddle rows. Padding bits past `width` are
//! always zero.

use std::ops::Index;

/// Number of bits per storage word.
const BITS_PER_WORD: usize = 64;

/// A 2D boolean buffer packed as bits, row-aligned to 64-bit words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBuffer2 {
    words: Vec<u64>,
    width: usize,
    height: usize,
    words_per_row: usize,
}

impl BitBuffer2 {
    /// Create a new bit buffer filled with the given value.
    pub fn new_filled(width: usize, height: usize, value: bool) -> Self {
        let words_per_row = width.div_ceil(BITS_PER_WORD);
        let mut buf = Self {
            words: vec![0u64; words_per_row * height],
            width,
            height,
            words_per_row,
        };
        if value {
            buf.fill(true);
        }
        buf
    }

    /// Create a new bit buffer with all bits cleared.
    #[inline]
    pub fn new_default(width: usize, height: usize) -> Self {
        Self::new_filled(width, height, false)
    }

    /// Build a mask by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut buf = Self::new_default(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    buf.set_xy(x, y, true);
                }
            }
        }
        buf
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of pixels (`width * height`).
    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of storage words per row.
    #[inline]
    pub fn words_per_row(&self) -> usize {
        self.words_per_row
    }

    /// Packed storage, `words_per_row` words per row, LSB = lowest x.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Packed words of a single row.
    #[inline]
    pub fn row_words(&self, y: usize) -> &[u64] {
        let start = y * self.words_per_row;
        &self.words[start..start + self.words_per_row]
    }

    #[inline]
    fn locate(&self, x: usize, y: usize) -> (usize, u64) {
        debug_assert!(x < self.width && y < self.height);
        (
            y * self.words_per_row + x / BITS_PER_WORD,
            1u64 << (x % BITS_PER_WORD),
        )
    }

    /// Get a bit by row-major linear index.
    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        self.get_xy(idx % self.width, idx / self.width)
    }

    /// Set a bit by row-major linear index.
    #[inline]
    pub fn set(&mut self, idx: usize, value: bool) {
        self.set_xy(idx % self.width, idx / self.width, value);
    }

    #[inline]
    pub fn get_xy(&self, x: usize, y: usize) -> bool {
        let (word, bit) = self.locate(x, y);
        self.words[word] & bit != 0
    }

    #[inline]
    pub fn set_xy(&mut self, x: usize, y: usize, value: bool) {
        let (word, bit) = self.locate(x, y);
        if value {
            self.words[word] |= bit;
        } else {
            self.words[word] &= !bit;
        }
    }

    /// Bounds-tolerant lookup; out-of-image coordinates read as `outside`.
    #[inline]
    pub fn get_signed(&self, x: isize, y: isize, outside: bool) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            outside
        } else {
            self.get_xy(x as usize, y as usize)
        }
    }

    /// Fill all pixels with the given value, keeping row padding cleared.
    pub fn fill(&mut self, value: bool) {
        if !value {
            self.words.fill(0);
            return;
        }
        let tail_bits = self.width % BITS_PER_WORD;
        let tail_mask = if tail_bits == 0 {
            !0u64
        } else {
            (1u64 << tail_bits) - 1
        };
        for row in self.words.chunks_exact_mut(self.words_per_row.max(1)) {
            row.fill(!0u64);
            if let Some(last) = row.last_mut() {
                *last = tail_mask;
            }
        }
    }

    /// Count the number of set pixels.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True when no pixel is set.
    #[inline]
    pub fn none(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Bitwise complement, padding stays cleared.
    pub fn inverted(&self) -> Self {
        let mut out = Self::new_filled(self.width, self.height, true);
        out.words
            .iter_mut()
            .zip(&self.words)
            .for_each(|(a, b)| *a &= !*b);
        out
    }

    /// Iterate over all pixel values in row-major order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = bool> + '_ {
        (0..self.len()).map(move |idx| self.get(idx))
    }

    /// Iterate over `(x, y)` of set pixels in row-major order.
    pub fn iter_set(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height).flat_map(move |y| {
            self.row_words(y)
                .iter()
                .enumerate()
                .flat_map(move |(word_idx, &word)| {
                    SetBits(word).map(move |bit| (word_idx * BITS_PER_WORD + bit, y))
                })
        })
    }
}

/// Iterator over the positions of set bits in one word, lowest first.
struct SetBits(u64);

impl Iterator for SetBits {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(bit)
    }
}

impl Index<(usize, usize)> for BitBuffer2 {
    type Output = bool;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        if self.get_xy(x, y) { &true } else { &false }
    }
}
