//! Sunday quick search for a single sequence.
//!
//! Like Horspool but the shift is taken from the byte one past the end of
//! the current alignment, which allows shifts up to `m+1`. The look-ahead
//! byte only exists while the alignment is strictly below the last one,
//! so the loop verifies first and stops once no look-ahead is available.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::compiler::compile_sequence_pattern;
use crate::matcher::SequenceMatcher;
use crate::reader::WindowReader;
use crate::Error;

use super::{last_alignment, last_alignment_u64, Searcher, ShiftTable};

/// `shift[b]` defaults to `m+1`; a byte accepted at position `i` caps it
/// at `m-i`.
pub(crate) fn forward_shifts(matcher: &dyn SequenceMatcher) -> ShiftTable {
    let m = matcher.len();
    let mut shifts = [m + 1; 256];
    for i in 0..m {
        let shift = m - i;
        for b in matcher.matcher_at(i).matching_bytes() {
            shifts[b as usize] = shifts[b as usize].min(shift);
        }
    }
    shifts
}

/// Mirror table for backward search: the look-ahead byte sits one before
/// the alignment, and a byte accepted at position `i` caps the shift at
/// `i+1`.
pub(crate) fn backward_shifts(matcher: &dyn SequenceMatcher) -> ShiftTable {
    let m = matcher.len();
    let mut shifts = [m + 1; 256];
    for i in 0..m {
        for b in matcher.matcher_at(i).matching_bytes() {
            shifts[b as usize] = shifts[b as usize].min(i + 1);
        }
    }
    shifts
}

/// Single-sequence Sunday searcher.
pub struct SundaySearcher {
    matcher: Arc<dyn SequenceMatcher>,
    forward: ArcSwapOption<ShiftTable>,
    backward: ArcSwapOption<ShiftTable>,
}

impl SundaySearcher {
    pub fn new(matcher: Arc<dyn SequenceMatcher>) -> Self {
        Self {
            matcher,
            forward: ArcSwapOption::empty(),
            backward: ArcSwapOption::empty(),
        }
    }

    /// Compiles pattern text into a sequence and wraps it.
    pub fn from_pattern(pattern: &str) -> Result<Self, Error> {
        Ok(Self::new(compile_sequence_pattern(pattern)?))
    }

    fn forward_table(&self) -> Arc<ShiftTable> {
        if let Some(table) = self.forward.load_full() {
            return table;
        }
        let table = Arc::new(forward_shifts(self.matcher.as_ref()));
        self.forward.store(Some(table.clone()));
        table
    }

    fn backward_table(&self) -> Arc<ShiftTable> {
        if let Some(table) = self.backward.load_full() {
            return table;
        }
        let table = Arc::new(backward_shifts(self.matcher.as_ref()));
        self.backward.store(Some(table.clone()));
        table
    }
}

impl Searcher for SundaySearcher {
    fn matcher(&self) -> &Arc<dyn SequenceMatcher> {
        &self.matcher
    }

    fn search_forward(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize> {
        let m = self.matcher.len();
        let last = last_alignment(bytes.len(), to, m)?;
        let shifts = self.forward_table();
        let mut p = from;
        while p <= last {
            if self.matcher.matches_no_check(bytes, p) {
                return Some(p);
            }
            if p == last {
                break;
            }
            // p < last, so the look-ahead byte is in bounds.
            p += shifts[bytes[p + m] as usize];
        }
        None
    }

    fn search_backward(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize> {
        let m = self.matcher.len();
        let top = last_alignment(bytes.len(), bytes.len(), m)?.min(from);
        if top < to {
            return None;
        }
        let shifts = self.backward_table();
        let mut p = top;
        loop {
            if self.matcher.matches_no_check(bytes, p) {
                return Some(p);
            }
            if p == to {
                return None;
            }
            let shift = shifts[bytes[p - 1] as usize];
            if p < to + shift {
                return None;
            }
            p -= shift;
        }
    }

    fn search_reader_forward(
        &self,
        reader: &dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<u64>, Error> {
        let m = self.matcher.len() as u64;
        let last = match last_alignment_u64(reader.length(), to, m) {
            Some(last) => last,
            None => return Ok(None),
        };
        let shifts = self.forward_table();
        let mut p = from;
        while p <= last {
            if self.matcher.matches_reader(reader, p)? {
                return Ok(Some(p));
            }
            if p == last {
                break;
            }
            let b = match reader.read_byte(p + m)? {
                Some(b) => b,
                None => return Ok(None),
            };
            p += shifts[b as usize] as u64;
        }
        Ok(None)
    }

    fn search_reader_backward(
        &self,
        reader: &dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<u64>, Error> {
        let m = self.matcher.len() as u64;
        let length = reader.length();
        let top = match last_alignment_u64(length, length, m) {
            Some(top) => top.min(from),
            None => return Ok(None),
        };
        if top < to {
            return Ok(None);
        }
        let shifts = self.backward_table();
        let mut p = top;
        loop {
            if self.matcher.matches_reader(reader, p)? {
                return Ok(Some(p));
            }
            if p == to {
                return Ok(None);
            }
            let b = match reader.read_byte(p - 1)? {
                Some(b) => b,
                None => return Ok(None),
            };
            let shift = shifts[b as usize] as u64;
            if p < to + shift {
                return Ok(None);
            }
            p -= shift;
        }
    }
}
