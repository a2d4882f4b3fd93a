//! Set-Horspool: Horspool generalised to a set of sequences.
//!
//! The alignment window is the minimum sequence length `m`; the shift for
//! a byte is the smallest Horspool shift it gets from any contributing
//! sequence's first `m-1` positions, so the window can never slide past a
//! viable start. Candidates are verified through the trie.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::compiler::compile_trie;
use crate::matcher::{SequenceMatcher, TrieMatcher};
use crate::reader::WindowReader;
use crate::Error;

use super::{
    last_alignment, last_alignment_u64, MultiSearcher, SequenceMatch, ShiftTable,
};

pub(crate) fn forward_shifts(trie: &TrieMatcher) -> ShiftTable {
    let m = trie.min_len();
    let mut shifts = [m; 256];
    for sequence in trie.sequences() {
        for i in 0..m.saturating_sub(1) {
            let shift = m - 1 - i;
            for b in sequence.matcher_at(i).matching_bytes() {
                shifts[b as usize] = shifts[b as usize].min(shift);
            }
        }
    }
    shifts
}

pub(crate) fn backward_shifts(trie: &TrieMatcher) -> ShiftTable {
    let m = trie.min_len();
    let mut shifts = [m; 256];
    for sequence in trie.sequences() {
        for i in 1..m {
            for b in sequence.matcher_at(i).matching_bytes() {
                shifts[b as usize] = shifts[b as usize].min(i);
            }
        }
    }
    shifts
}

/// Multi-sequence Horspool searcher over a [`TrieMatcher`].
pub struct SetHorspoolSearcher {
    matcher: Arc<TrieMatcher>,
    forward: ArcSwapOption<ShiftTable>,
    backward: ArcSwapOption<ShiftTable>,
}

impl SetHorspoolSearcher {
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
}

impl MultiSearcher for SetHorspoolSearcher {
    fn matcher(&self) -> &Arc<TrieMatcher> {
        &self.matcher
    }

    fn search_forward(&self, bytes: &[u8], from: usize, to: usize) -> Option<SequenceMatch> {
        let m = self.matcher.min_len();
        let last = last_alignment(bytes.len(), to, m)?;
        let shifts = self.forward_table();
        let mut p = from;
        while p <= last {
            if let Some(matcher) = self.matcher.first_match(bytes, p) {
                return Some(SequenceMatch {
                    position: p,
                    matcher,
                });
            }
            p += shifts[bytes[p + m - 1] as usize];
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
            let matchers = self.matcher.all_matches(bytes, p);
            if !matchers.is_empty() {
                return Some((p, matchers));
            }
            p += shifts[bytes[p + m - 1] as usize];
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
            if let Some(matcher) = self.matcher.first_match(bytes, p) {
                return Some(SequenceMatch {
                    position: p,
                    matcher,
                });
            }
            let shift = shifts[bytes[p] as usize];
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
    ) -> Result<Option<(u64, Arc<dyn SequenceMatcher>)>, Error> {
        let m = self.matcher.min_len() as u64;
        let last = match last_alignment_u64(reader.length(), to, m) {
            Some(last) => last,
            None => return Ok(None),
        };
        let shifts = self.forward_table();
        let mut p = from;
        while p <= last {
            if let Some(matcher) = self.matcher.first_match_reader(reader, p)? {
                return Ok(Some((p, matcher)));
            }
            let b = match reader.read_byte(p + m - 1)? {
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
    ) -> Result<Option<(u64, Arc<dyn SequenceMatcher>)>, Error> {
        let m = self.matcher.min_len() as u64;
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
            if let Some(matcher) = self.matcher.first_match_reader(reader, p)? {
                return Ok(Some((p, matcher)));
            }
            let b = match reader.read_byte(p)? {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ByteReader;

    #[test]
    fn test_shift_tables_use_min_length_window() {
        let searcher = SetHorspoolSearcher::from_patterns(&["'Mid'", "'ample'"]).unwrap();
        let shifts = forward_shifts(searcher.matcher().as_ref());
        // m = 3; 'M' and 'a' at position 0 give shift 2; 'i'/'m' at 1 give 1.
        assert_eq!(shifts[b'M' as usize], 2);
        assert_eq!(shifts[b'a' as usize], 2);
        assert_eq!(shifts[b'i' as usize], 1);
        assert_eq!(shifts[b'm' as usize], 1);
        assert_eq!(shifts[b'x' as usize], 3);
        for shift in shifts {
            assert!(shift > 0);
        }
    }

    #[test]
    fn test_search_forward_finds_each_pattern() {
        let searcher = SetHorspoolSearcher::from_patterns(&["'Mid'", "'and'"]).unwrap();
        let text = b"Midsommer and";
        let first = searcher.search_forward(text, 0, text.len()).unwrap();
        assert_eq!(first.position, 0);
        assert_eq!(first.matcher.to_regex(true), "'Mid'");
        let second = searcher.search_forward(text, 1, text.len()).unwrap();
        assert_eq!(second.position, 10);
        assert_eq!(second.matcher.to_regex(true), "'and'");
        assert!(searcher.search_forward(text, 11, text.len()).is_none());
    }

    #[test]
    fn test_search_backward() {
        let searcher = SetHorspoolSearcher::from_patterns(&["'Mid'", "'and'"]).unwrap();
        let text = b"Midsommer and";
        let last = searcher.search_backward(text, text.len(), 0).unwrap();
        assert_eq!(last.position, 10);
        let previous = searcher.search_backward(text, 9, 0).unwrap();
        assert_eq!(previous.position, 0);
    }

    #[test]
    fn test_different_lengths_with_overlap() {
        let searcher = SetHorspoolSearcher::from_patterns(&["'an'", "'and'"]).unwrap();
        let (position, matchers) = searcher.next_matches(b"xand", 0, 4).unwrap();
        assert_eq!(position, 1);
        assert_eq!(matchers.len(), 2);
    }

    #[test]
    fn test_reader_search() {
        let searcher = SetHorspoolSearcher::from_patterns(&["'Mid'", "'and'"]).unwrap();
        let reader = ByteReader::with_window_size(b"Midsommer and".to_vec(), 4);
        let (p, m) = searcher
            .search_reader_forward(&reader, 1, 13)
            .unwrap()
            .unwrap();
        assert_eq!((p, m.to_regex(true)), (10, "'and'".to_string()));
        let (p, _) = searcher
            .search_reader_backward(&reader, 13, 0)
            .unwrap()
            .unwrap();
        assert_eq!(p, 10);
    }
}
