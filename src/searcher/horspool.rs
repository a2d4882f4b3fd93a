//! Boyer-Moore-Horspool searching for a single sequence.
//!
//! The forward shift table maps each byte to the safe advance when that
//! byte is seen at the end of the current alignment window: a byte
//! accepted at position `i` (for `i < m-1`) caps the shift at `m-1-i`,
//! and the final position never reduces it, so every shift is positive.
//! The final-flag variant additionally negates the entries of bytes the
//! final position accepts, so a full verification runs only when the last
//! byte alone says a match is possible.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::compiler::compile_sequence_pattern;
use crate::matcher::SequenceMatcher;
use crate::reader::WindowReader;
use crate::Error;

use super::{last_alignment, last_alignment_u64, Searcher, ShiftTable};

/// Builds the forward Horspool table: `shift[b]` is the distance to slide
/// the window when byte `b` appears under its final position.
pub(crate) fn forward_shifts(matcher: &dyn SequenceMatcher) -> ShiftTable {
    let m = matcher.len();
    let mut shifts = [m; 256];
    for i in 0..m.saturating_sub(1) {
        let shift = m - 1 - i;
        for b in matcher.matcher_at(i).matching_bytes() {
            shifts[b as usize] = shifts[b as usize].min(shift);
        }
    }
    shifts
}

/// Builds the backward table: `shift[b]` is the distance to slide down
/// when byte `b` appears under the first position of the window.
pub(crate) fn backward_shifts(matcher: &dyn SequenceMatcher) -> ShiftTable {
    let m = matcher.len();
    let mut shifts = [m; 256];
    for i in 1..m {
        for b in matcher.matcher_at(i).matching_bytes() {
            shifts[b as usize] = shifts[b as usize].min(i);
        }
    }
    shifts
}

/// Single-sequence Horspool searcher.
///
/// Shift tables are built lazily on first use and published through an
/// `ArcSwapOption`: a racing reader either sees the finished table or
/// recomputes the identical one, so no locking is needed.
pub struct HorspoolSearcher {
    matcher: Arc<dyn SequenceMatcher>,
    forward: ArcSwapOption<ShiftTable>,
    backward: ArcSwapOption<ShiftTable>,
}

impl HorspoolSearcher {
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

impl Searcher for HorspoolSearcher {
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
            p += shifts[bytes[p + m - 1] as usize];
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

/// Signed table for the final-flag variants: a negative entry flags a
/// byte the terminal position accepts, with the safe advance as its
/// magnitude.
pub(crate) type FlagShiftTable = [isize; 256];

pub(crate) fn forward_flag_shifts(matcher: &dyn SequenceMatcher) -> FlagShiftTable {
    let m = matcher.len();
    let plain = forward_shifts(matcher);
    let mut shifts = [0isize; 256];
    for (b, &shift) in plain.iter().enumerate() {
        shifts[b] = shift as isize;
    }
    for b in matcher.matcher_at(m - 1).matching_bytes() {
        shifts[b as usize] = -shifts[b as usize];
    }
    shifts
}

pub(crate) fn backward_flag_shifts(matcher: &dyn SequenceMatcher) -> FlagShiftTable {
    let plain = backward_shifts(matcher);
    let mut shifts = [0isize; 256];
    for (b, &shift) in plain.iter().enumerate() {
        shifts[b] = shift as isize;
    }
    for b in matcher.matcher_at(0).matching_bytes() {
        shifts[b as usize] = -shifts[b as usize];
    }
    shifts
}

/// Horspool with the final-flag reordering: the shift lookup alone
/// decides whether verification can be skipped. Same positions as
/// [`HorspoolSearcher`], different work order.
pub struct HorspoolFinalFlagSearcher {
    matcher: Arc<dyn SequenceMatcher>,
    forward: ArcSwapOption<FlagShiftTable>,
    backward: ArcSwapOption<FlagShiftTable>,
}

impl HorspoolFinalFlagSearcher {
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

    fn forward_table(&self) -> Arc<FlagShiftTable> {
        if let Some(table) = self.forward.load_full() {
            return table;
        }
        let table = Arc::new(forward_flag_shifts(self.matcher.as_ref()));
        self.forward.store(Some(table.clone()));
        table
    }

    fn backward_table(&self) -> Arc<FlagShiftTable> {
        if let Some(table) = self.backward.load_full() {
            return table;
        }
        let table = Arc::new(backward_flag_shifts(self.matcher.as_ref()));
        self.backward.store(Some(table.clone()));
        table
    }
}

impl Searcher for HorspoolFinalFlagSearcher {
    fn matcher(&self) -> &Arc<dyn SequenceMatcher> {
        &self.matcher
    }

    fn search_forward(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize> {
        let m = self.matcher.len();
        let last = last_alignment(bytes.len(), to, m)?;
        let shifts = self.forward_table();
        let mut p = from;
        while p <= last {
            let shift = shifts[bytes[p + m - 1] as usize];
            if shift > 0 {
                p += shift as usize;
                continue;
            }
            if self.matcher.matches_no_check(bytes, p) {
                return Some(p);
            }
            p += (-shift) as usize;
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
            let shift = shifts[bytes[p] as usize];
            if shift < 0 && self.matcher.matches_no_check(bytes, p) {
                return Some(p);
            }
            let magnitude = shift.unsigned_abs();
            if p < to + magnitude {
                return None;
            }
            p -= magnitude;
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
            let b = match reader.read_byte(p + m - 1)? {
                Some(b) => b,
                None => return Ok(None),
            };
            let shift = shifts[b as usize];
            if shift > 0 {
                p += shift as u64;
                continue;
            }
            if self.matcher.matches_reader(reader, p)? {
                return Ok(Some(p));
            }
            p += (-shift) as u64;
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
            let b = match reader.read_byte(p)? {
                Some(b) => b,
                None => return Ok(None),
            };
            let shift = shifts[b as usize];
            if shift < 0 && self.matcher.matches_reader(reader, p)? {
                return Ok(Some(p));
            }
            let magnitude = shift.unsigned_abs() as u64;
            if p < to + magnitude {
                return Ok(None);
            }
            p -= magnitude;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::ByteSequenceMatcher;
    use crate::reader::ByteReader;

    fn abc_matcher() -> Arc<dyn SequenceMatcher> {
        Arc::new(ByteSequenceMatcher::new(b"abc".to_vec()))
    }

    #[test]
    fn test_forward_shift_table_for_abc() {
        let shifts = forward_shifts(abc_matcher().as_ref());
        assert_eq!(shifts[b'a' as usize], 2);
        assert_eq!(shifts[b'b' as usize], 1);
        // The final position never reduces the shift.
        assert_eq!(shifts[b'c' as usize], 3);
        assert_eq!(shifts[b'x' as usize], 3);
        assert_eq!(shifts[0], 3);
    }

    #[test]
    fn test_backward_shift_table_for_abc() {
        let shifts = backward_shifts(abc_matcher().as_ref());
        assert_eq!(shifts[b'b' as usize], 1);
        assert_eq!(shifts[b'c' as usize], 2);
        assert_eq!(shifts[b'a' as usize], 3);
        assert_eq!(shifts[b'x' as usize], 3);
    }

    #[test]
    fn test_all_shifts_positive() {
        let matchers: Vec<Arc<dyn SequenceMatcher>> = vec![
            Arc::new(ByteSequenceMatcher::new(b"a".to_vec())),
            Arc::new(ByteSequenceMatcher::new(b"aaaa".to_vec())),
            abc_matcher(),
        ];
        for matcher in matchers {
            for shift in forward_shifts(matcher.as_ref()) {
                assert!(shift > 0);
            }
            for shift in backward_shifts(matcher.as_ref()) {
                assert!(shift > 0);
            }
            for shift in forward_flag_shifts(matcher.as_ref()) {
                assert!(shift != 0);
            }
        }
    }

    #[test]
    fn test_flag_table_marks_final_bytes() {
        let shifts = forward_flag_shifts(abc_matcher().as_ref());
        assert_eq!(shifts[b'c' as usize], -3);
        assert_eq!(shifts[b'a' as usize], 2);
        let shifts = backward_flag_shifts(abc_matcher().as_ref());
        assert_eq!(shifts[b'a' as usize], -3);
        assert_eq!(shifts[b'b' as usize], 1);
    }

    #[test]
    fn test_horspool_forward_and_backward() {
        let searcher = HorspoolSearcher::from_pattern("'Here'").unwrap();
        let buf = b"xHereHerey";
        assert_eq!(searcher.search_forward(buf, 0, buf.len()), Some(1));
        assert_eq!(searcher.search_forward(buf, 2, buf.len()), Some(5));
        assert_eq!(searcher.search_forward(buf, 6, buf.len()), None);
        assert_eq!(searcher.search_backward(buf, buf.len(), 0), Some(5));
        assert_eq!(searcher.search_backward(buf, 4, 0), Some(1));
    }

    #[test]
    fn test_horspool_single_byte_pattern() {
        let searcher = HorspoolSearcher::from_pattern("20").unwrap();
        let buf = b"a b c";
        let positions: Vec<usize> = searcher.search_forward_all(buf, 0, buf.len()).collect();
        assert_eq!(positions, vec![1, 3]);
        assert_eq!(searcher.search_backward(buf, buf.len(), 0), Some(3));
    }

    #[test]
    fn test_horspool_set_pattern_degrades_gracefully() {
        // A set position shrinks shifts for every accepted byte but keeps
        // the searcher sound.
        let searcher = HorspoolSearcher::from_pattern("[09 0a 0d 20]").unwrap();
        let buf = b"a b\tc\nd";
        let positions: Vec<usize> = searcher.search_forward_all(buf, 0, buf.len()).collect();
        assert_eq!(positions, vec![1, 3, 5]);
    }

    #[test]
    fn test_final_flag_reports_same_positions() {
        let plain = HorspoolSearcher::from_pattern("'aba'").unwrap();
        let flagged = HorspoolFinalFlagSearcher::from_pattern("'aba'").unwrap();
        let buf = b"abababa";
        let expected: Vec<usize> = plain.search_forward_all(buf, 0, buf.len()).collect();
        let actual: Vec<usize> = flagged.search_forward_all(buf, 0, buf.len()).collect();
        assert_eq!(expected, vec![0, 2, 4]);
        assert_eq!(actual, expected);
        assert_eq!(
            plain.search_backward(buf, buf.len(), 0),
            flagged.search_backward(buf, buf.len(), 0)
        );
    }

    #[test]
    fn test_horspool_reader_search_crosses_windows() {
        let searcher = HorspoolSearcher::from_pattern("'Gutenberg'").unwrap();
        let reader = ByteReader::with_window_size(b"AAAAAAAGutenberg".to_vec(), 8);
        assert_eq!(
            searcher.search_reader_forward(&reader, 0, 16).unwrap(),
            Some(7)
        );
        assert_eq!(
            searcher.search_reader_backward(&reader, 16, 0).unwrap(),
            Some(7)
        );
    }

    #[test]
    fn test_final_flag_reader_search() {
        let searcher = HorspoolFinalFlagSearcher::from_pattern("'Here'").unwrap();
        let reader = ByteReader::with_window_size(b"xHereHerey".to_vec(), 3);
        assert_eq!(
            searcher.search_reader_forward(&reader, 0, 10).unwrap(),
            Some(1)
        );
        assert_eq!(
            searcher.search_reader_backward(&reader, 10, 0).unwrap(),
            Some(5)
        );
    }
}
