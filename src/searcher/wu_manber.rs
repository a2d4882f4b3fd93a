//! Wu-Manber multi-pattern searching.
//!
//! Instead of a single byte, the shift is derived from a block of the
//! last `B` bytes of the alignment window (`B = 2`, or 1 when the
//! shortest pattern is a single byte), hashed into a 256-entry table. A
//! zero shift marks a block that can end some pattern -- the final-flag
//! idea is inherent here: verification through the trie runs only on
//! those flagged blocks, every other lookup just slides the window.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::compiler::compile_trie;
use crate::matcher::{SequenceMatcher, TrieMatcher};
use crate::reader::WindowReader;
use crate::Error;

use super::{
    last_alignment, last_alignment_u64, MultiSearcher, SequenceMatch, ShiftTable,
};

/// Hash of a two-byte block, folded to the 256-entry table.
#[inline]
pub(crate) fn block_hash(b0: u8, b1: u8) -> usize {
    (((b0 as usize) << 5) ^ (b1 as usize)) & 0xFF
}

fn block_size(min_len: usize) -> usize {
    if min_len >= 2 {
        2
    } else {
        1
    }
}

/// Forward table: for every block of accepted bytes ending at position
/// `j` within the first `min_len` positions of some pattern, the shift is
/// capped at `min_len - 1 - j`; blocks ending at the window end get zero.
pub(crate) fn forward_shifts(trie: &TrieMatcher) -> ShiftTable {
    let m = trie.min_len();
    let b = block_size(m);
    let mut shifts = [m - b + 1; 256];
    for sequence in trie.sequences() {
        for j in (b - 1)..m {
            let shift = m - 1 - j;
            if b == 2 {
                for b0 in sequence.matcher_at(j - 1).matching_bytes() {
                    for b1 in sequence.matcher_at(j).matching_bytes() {
                        let h = block_hash(b0, b1);
                        shifts[h] = shifts[h].min(shift);
                    }
                }
            } else {
                for b0 in sequence.matcher_at(j).matching_bytes() {
                    shifts[b0 as usize] = shifts[b0 as usize].min(shift);
                }
            }
        }
    }
    shifts
}

/// Backward mirror: blocks starting at position `j` cap the shift at `j`;
/// blocks at the window start get zero.
pub(crate) fn backward_shifts(trie: &TrieMatcher) -> ShiftTable {
    let m = trie.min_len();
    let b = block_size(m);
    let mut shifts = [m - b + 1; 256];
    for sequence in trie.sequences() {
        for j in 0..=(m - b) {
            if b == 2 {
                for b0 in sequence.matcher_at(j).matching_bytes() {
                    for b1 in sequence.matcher_at(j + 1).matching_bytes() {
                        let h = block_hash(b0, b1);
                        shifts[h] = shifts[h].min(j);
                    }
                }
            } else {
                for b0 in sequence.matcher_at(j).matching_bytes() {
                    shifts[b0 as usize] = shifts[b0 as usize].min(j);
                }
            }
        }
    }
    shifts
}

/// Multi-sequence Wu-Manber searcher over a [`TrieMatcher`].
pub struct WuManberSearcher {
    matcher: Arc<TrieMatcher>,
    forward: ArcSwapOption<ShiftTable>,
    backward: ArcSwapOption<ShiftTable>,
}

impl WuManberSearcher {
    pub fn new(matcher: Arc<TrieMatcher>) -> Self {
        Self {
            matcher,
            forward: ArcSwapOption::empty(),
            backward: ArcSwapOption::empty(),
        }
    }

    /// Parses and compiles a list of fixed-length patterns.
    pub fn from_patterns(patterns: &[&str]) -> Result<Self, Error> {
        Ok(Self::new(Arc::new(compile_trie(patterns)?)))
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

    #[inline]
    fn forward_hash(&self, bytes: &[u8], p: usize, m: usize) -> usize {
        if block_size(m) == 2 {
            block_hash(bytes[p + m - 2], bytes[p + m - 1])
        } else {
            bytes[p + m - 1] as usize
        }
    }

    #[inline]
    fn backward_hash(&self, bytes: &[u8], p: usize, m: usize) -> usize {
        if block_size(m) == 2 {
            block_hash(bytes[p], bytes[p + 1])
        } else {
            bytes[p] as usize
        }
    }
}

impl MultiSearcher for WuManberSearcher {
    fn matcher(&self) -> &Arc<TrieMatcher> {
        &self.matcher
    }

    fn search_forward(&self, bytes: &[u8], from: usize, to: usize) -> Option<SequenceMatch> {
        let m = self.matcher.min_len();
        let last = last_alignment(bytes.len(), to, m)?;
        let shifts = self.forward_table();
        let mut p = from;
        while p <= last {
            let shift = shifts[self.forward_hash(bytes, p, m)];
            if shift > 0 {
                p += shift;
                continue;
            }
            if let Some(matcher) = self.matcher.first_match(bytes, p) {
                return Some(SequenceMatch {
                    position: p,
                    matcher,
                });
            }
            p += 1;
        }
        None
    }

    fn next_matches(
        &self,
        bytes: &[u8],
        from: usize,
        to: usize,
    ) -> Option<(usize, Vec<Arc<dyn SequenceMatcher>>)> {
        let m = self.matcher.min_len();
        let last = last_alignment(bytes.len(), to, m)?;
        let shifts = self.forward_table();
        let mut p = from;
        while p <= last {
            let shift = shifts[self.forward_hash(bytes, p, m)];
            if shift > 0 {
                p += shift;
                continue;
            }
            let matchers = self.matcher.all_matches(bytes, p);
            if !matchers.is_empty() {
                return Some((p, matchers));
            }
            p += 1;
        }
        None
    }

    fn search_backward(&self, bytes: &[u8], from: usize, to: usize) -> Option<SequenceMatch> {
        let m = self.matcher.min_len();
        let top = last_alignment(bytes.len(), bytes.len(), m)?.min(from);
        if top < to {
            return None;
        }
        let shifts = self.backward_table();
        let mut p = top;
        loop {
            let shift = shifts[self.backward_hash(bytes, p, m)];
            if shift == 0 {
                if let Some(matcher) = self.matcher.first_match(bytes, p) {
                    return Some(SequenceMatch {
                        position: p,
                        matcher,
                    });
                }
            }
            let step = shift.max(1);
            if p < to + step {
                return None;
            }
            p -= step;
        }
    }

    fn search_reader_forward(
        &self,
        reader: &dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<(u64, Arc<dyn SequenceMatcher>)>, Error> {
        let m = self.matcher.min_len();
        let last = match last_alignment_u64(reader.length(), to, m as u64) {
            Some(last) => last,
            None => return Ok(None),
        };
        let shifts = self.forward_table();
        let b = block_size(m);
        let mut p = from;
        while p <= last {
            let h = if b == 2 {
                let b0 = reader.read_byte(p + m as u64 - 2)?;
                let b1 = reader.read_byte(p + m as u64 - 1)?;
                match (b0, b1) {
                    (Some(b0), Some(b1)) => block_hash(b0, b1),
                    _ => return Ok(None),
                }
            } else {
                match reader.read_byte(p + m as u64 - 1)? {
                    Some(b0) => b0 as usize,
                    None => return Ok(None),
                }
            };
            let shift = shifts[h];
            if shift > 0 {
                p += shift as u64;
                continue;
            }
            if let Some(matcher) = self.matcher.first_match_reader(reader, p)? {
                return Ok(Some((p, matcher)));
            }
            p += 1;
        }
        Ok(None)
    }

    fn search_reader_backward(
        &self,
        reader: &dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<(u64, Arc<dyn SequenceMatcher>)>, Error> {
        let m = self.matcher.min_len();
        let length = reader.length();
        let top = match last_alignment_u64(length, length, m as u64) {
            Some(top) => top.min(from),
            None => return Ok(None),
        };
        if top < to {
            return Ok(None);
        }
        let shifts = self.backward_table();
        let b = block_size(m);
        let mut p = top;
        loop {
            let h = if b == 2 {
                let b0 = reader.read_byte(p)?;
                let b1 = reader.read_byte(p + 1)?;
                match (b0, b1) {
                    (Some(b0), Some(b1)) => block_hash(b0, b1),
                    _ => return Ok(None),
                }
            } else {
                match reader.read_byte(p)? {
                    Some(b0) => b0 as usize,
                    None => return Ok(None),
                }
            };
            let shift = shifts[h];
            if shift == 0 {
                if let Some(matcher) = self.matcher.first_match_reader(reader, p)? {
                    return Ok(Some((p, matcher)));
                }
            }
            let step = (shift as u64).max(1);
            if p < to + step {
                return Ok(None);
            }
            p -= step;
        }
    }
}
