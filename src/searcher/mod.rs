//! Online search algorithms over byte sources.
//!
//! A searcher is parameterised by a matcher at construction and never
//! mutates it afterwards; the only interior state is the one-shot lazy
//! shift table each algorithm derives from its matcher. All searchers
//! honour both directions and both source kinds (byte slices and
//! [`WindowReader`]s).
//!
//! Position contract, shared by every implementation:
//!
//! - a reported position always makes the matcher match there;
//! - `search_forward(bytes, from, to)` reports only positions in
//!   `[from, min(to, len) - matcher_len]`;
//! - `search_backward(bytes, from, to)` scans alignments from
//!   `min(from, len - matcher_len)` down to `from >= to`;
//! - between consecutive reported positions no intervening position
//!   matches (the multi-sequence `search_forward_all` additionally emits
//!   every match at one position before advancing).
//!
//! [`MatcherSearcher`] and [`NaiveMultiSearcher`] walk every alignment and
//! serve as the correctness oracle for the shift-table algorithms.

mod horspool;
mod set_horspool;
mod sunday;
mod wu_manber;

use std::collections::VecDeque;
use std::sync::Arc;

use crate::compiler::compile_sequence_pattern;
use crate::matcher::{SequenceMatcher, TrieMatcher};
use crate::reader::WindowReader;
use crate::Error;

pub use horspool::{HorspoolFinalFlagSearcher, HorspoolSearcher};
pub use set_horspool::SetHorspoolSearcher;
pub use sunday::SundaySearcher;
pub use wu_manber::WuManberSearcher;

/// A 256-entry table of safe advances, one per byte value.
pub(crate) type ShiftTable = [usize; 256];

/// The last alignment to try when searching `[.., to)` over `len` bytes
/// with a matcher of length `m`, or `None` when nothing fits.
#[inline]
pub(crate) fn last_alignment(len: usize, to: usize, m: usize) -> Option<usize> {
    let end = to.min(len);
    if end < m {
        None
    } else {
        Some(end - m)
    }
}

/// As [`last_alignment`] for reader positions.
#[inline]
pub(crate) fn last_alignment_u64(len: u64, to: u64, m: u64) -> Option<u64> {
    let end = to.min(len);
    if end < m {
        None
    } else {
        Some(end - m)
    }
}

/// A single-sequence searcher.
pub trait Searcher: Send + Sync {
    /// The sequence this searcher locates.
    fn matcher(&self) -> &Arc<dyn SequenceMatcher>;

    /// The lowest matching position in `[from, min(to, len) - m]`.
    fn search_forward(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize>;

    /// The highest matching position at or below `min(from, len - m)`,
    /// not below `to`.
    fn search_backward(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize>;

    /// As [`Searcher::search_forward`], over a windowed source.
    fn search_reader_forward(
        &self,
        reader: &dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<u64>, Error>;

    /// As [`Searcher::search_backward`], over a windowed source.
    fn search_reader_backward(
        &self,
        reader: &dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<u64>, Error>;

    /// A lazy iterator over every matching position in ascending order.
    /// Restart by constructing a new iterator.
    fn search_forward_all<'a>(&'a self, bytes: &'a [u8], from: usize, to: usize) -> Matches<'a>
    where
        Self: Sized,
    {
        Matches {
            searcher: self,
            bytes,
            next: from,
            to,
        }
    }
}

/// Iterator over ascending match positions of a single-sequence searcher.
pub struct Matches<'a> {
    searcher: &'a dyn Searcher,
    bytes: &'a [u8],
    next: usize,
    to: usize,
}

impl Iterator for Matches<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let position = self
            .searcher
            .search_forward(self.bytes, self.next, self.to)?;
        self.next = position + 1;
        Some(position)
    }
}

/// A position together with the sequence that matched there, as reported
/// by multi-sequence searchers.
#[derive(Clone)]
pub struct SequenceMatch {
    pub position: usize,
    pub matcher: Arc<dyn SequenceMatcher>,
}

impl std::fmt::Debug for SequenceMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceMatch")
            .field("position", &self.position)
            .field("matcher", &self.matcher.to_regex(true))
            .finish()
    }
}

/// A multi-sequence searcher over a [`TrieMatcher`].
pub trait MultiSearcher: Send + Sync {
    /// The trie this searcher locates.
    fn matcher(&self) -> &Arc<TrieMatcher>;

    /// The lowest matching position with one matching sequence (the
    /// trie's first hit there).
    fn search_forward(&self, bytes: &[u8], from: usize, to: usize) -> Option<SequenceMatch>;

    /// The lowest matching position together with every sequence matching
    /// there, shortest first.
    fn next_matches(
        &self,
        bytes: &[u8],
        from: usize,
        to: usize,
    ) -> Option<(usize, Vec<Arc<dyn SequenceMatcher>>)>;

    /// The highest matching position at or below `min(from, len - min_len)`,
    /// not below `to`.
    fn search_backward(&self, bytes: &[u8], from: usize, to: usize) -> Option<SequenceMatch>;

    /// As [`MultiSearcher::search_forward`], over a windowed source.
    fn search_reader_forward(
        &self,
        reader: &dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<(u64, Arc<dyn SequenceMatcher>)>, Error>;

    /// As [`MultiSearcher::search_backward`], over a windowed source.
    fn search_reader_backward(
        &self,
        reader: &dyn WindowReader,
        from: u64,
        to: u64,
    ) -> Result<Option<(u64, Arc<dyn SequenceMatcher>)>, Error>;

    /// A lazy iterator over every match in ascending position order;
    /// matches sharing a position are emitted together before advancing.
    fn search_forward_all<'a>(
        &'a self,
        bytes: &'a [u8],
        from: usize,
        to: usize,
    ) -> MultiMatches<'a>
    where
        Self: Sized,
    {
        MultiMatches {
            searcher: self,
            bytes,
            next: from,
            to,
            pending: VecDeque::new(),
        }
    }
}

/// Iterator over the matches of a multi-sequence searcher.
pub struct MultiMatches<'a> {
    searcher: &'a dyn MultiSearcher,
    bytes: &'a [u8],
    next: usize,
    to: usize,
    pending: VecDeque<SequenceMatch>,
}

impl Iterator for MultiMatches<'_> {
    type Item = SequenceMatch;

    fn next(&mut self) -> Option<SequenceMatch> {
        if let Some(pending) = self.pending.pop_front() {
            return Some(pending);
        }
        let (position, matchers) = self
            .searcher
            .next_matches(self.bytes, self.next, self.to)?;
        self.next = position + 1;
        for matcher in matchers {
            self.pending.push_back(SequenceMatch { position, matcher });
        }
        self.pending.pop_front()
    }
}

/// The naive single-sequence searcher: tries every alignment.
///
/// No setup cost and no shift tables; the correctness oracle for the
/// sub-linear searchers, and the right choice for one-off searches where
/// table construction would dominate.
pub struct MatcherSearcher {
    matcher: Arc<dyn SequenceMatcher>,
}

impl MatcherSearcher {
    pub fn new(matcher: Arc<dyn SequenceMatcher>) -> Self {
        Self { matcher }
    }

    /// Compiles pattern text into a sequence and wraps it.
    pub fn from_pattern(pattern: &str) -> Result<Self, Error> {
        Ok(Self::new(compile_sequence_pattern(pattern)?))
    }
}

impl Searcher for MatcherSearcher {
    fn matcher(&self) -> &Arc<dyn SequenceMatcher> {
        &self.matcher
    }

    fn search_forward(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize> {
        let last = last_alignment(bytes.len(), to, self.matcher.len())?;
        (from..=last).find(|&p| self.matcher.matches_no_check(bytes, p))
    }

    fn search_backward(&self, bytes: &[u8], from: usize, to: usize) -> Option<usize> {
        let top = last_alignment(bytes.len(), bytes.len(), self.matcher.len())?.min(from);
        (to..=top)
            .rev()
            .find(|&p| self.matcher.matches_no_check(bytes, p))
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
        let mut p = from;
        while p <= last {
            if self.matcher.matches_reader(reader, p)? {
                return Ok(Some(p));
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
        let mut p = top;
        loop {
            if self.matcher.matches_reader(reader, p)? {
                return Ok(Some(p));
            }
            if p == to {
                return Ok(None);
            }
            p -= 1;
        }
    }
}

/// The naive multi-sequence searcher: queries the trie at every alignment.
pub struct NaiveMultiSearcher {
    matcher: Arc<TrieMatcher>,
}

impl NaiveMultiSearcher {
    pub fn new(matcher: Arc<TrieMatcher>) -> Self {
        Self { matcher }
    }
}

impl MultiSearcher for NaiveMultiSearcher {
    fn matcher(&self) -> &Arc<TrieMatcher> {
        &self.matcher
    }

    fn search_forward(&self, bytes: &[u8], from: usize, to: usize) -> Option<SequenceMatch> {
        let last = last_alignment(bytes.len(), to, self.matcher.min_len())?;
        (from..=last).find_map(|p| {
            self.matcher
                .first_match(bytes, p)
                .map(|matcher| SequenceMatch {
                    position: p,
                    matcher,
                })
        })
    }

    fn next_matches(
        &self,
        bytes: &[u8],
        from: usize,
        to: usize,
    ) -> Option<(usize, Vec<Arc<dyn SequenceMatcher>>)> {
        let last = last_alignment(bytes.len(), to, self.matcher.min_len())?;
        for p in from..=last {
            let matchers = self.matcher.all_matches(bytes, p);
            if !matchers.is_empty() {
                return Some((p, matchers));
            }
        }
        None
    }

    fn search_backward(&self, bytes: &[u8], from: usize, to: usize) -> Option<SequenceMatch> {
        let top =
            last_alignment(bytes.len(), bytes.len(), self.matcher.min_len())?.min(from);
        (to..=top).rev().find_map(|p| {
            self.matcher
                .first_match(bytes, p)
                .map(|matcher| SequenceMatch {
                    position: p,
                    matcher,
                })
        })
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
        let mut p = from;
        while p <= last {
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
        let m = self.matcher.min_len() as u64;
        let length = reader.length();
        let top = match last_alignment_u64(length, length, m) {
            Some(top) => top.min(from),
            None => return Ok(None),
        };
        if top < to {
            return Ok(None);
        }
        let mut p = top;
        loop {
            if let Some(matcher) = self.matcher.first_match_reader(reader, p)? {
                return Ok(Some((p, matcher)));
            }
            if p == to {
                return Ok(None);
            }
            p -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_trie;
    use crate::reader::ByteReader;

    #[test]
    fn test_naive_forward_and_backward() {
        let searcher = MatcherSearcher::from_pattern("'Here'").unwrap();
        let buf = b"xHereHerey";
        assert_eq!(searcher.search_forward(buf, 0, buf.len()), Some(1));
        assert_eq!(searcher.search_forward(buf, 2, buf.len()), Some(5));
        assert_eq!(searcher.search_forward(buf, 6, buf.len()), None);
        assert_eq!(searcher.search_backward(buf, buf.len(), 0), Some(5));
        assert_eq!(searcher.search_backward(buf, 4, 0), Some(1));
        assert_eq!(searcher.search_backward(buf, 0, 0), None);
    }

    #[test]
    fn test_naive_respects_to_bound() {
        let searcher = MatcherSearcher::from_pattern("'Here'").unwrap();
        let buf = b"xHereHerey";
        // to=5 allows only alignments up to 1.
        assert_eq!(searcher.search_forward(buf, 0, 5), Some(1));
        assert_eq!(searcher.search_forward(buf, 2, 8), None);
        // Backward low bound cuts off position 1.
        assert_eq!(searcher.search_backward(buf, 4, 2), None);
    }

    #[test]
    fn test_forward_all_iterator() {
        let searcher = MatcherSearcher::from_pattern("'aa'").unwrap();
        let buf = b"aaaa";
        let positions: Vec<usize> = searcher.search_forward_all(buf, 0, buf.len()).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_naive_reader_search() {
        let searcher = MatcherSearcher::from_pattern("'Gutenberg'").unwrap();
        let reader = ByteReader::with_window_size(b"AAAAAAAGutenberg".to_vec(), 8);
        assert_eq!(
            searcher.search_reader_forward(&reader, 0, 16).unwrap(),
            Some(7)
        );
        assert_eq!(
            searcher.search_reader_backward(&reader, 16, 0).unwrap(),
            Some(7)
        );
        assert_eq!(searcher.search_reader_forward(&reader, 8, 16).unwrap(), None);
    }

    #[test]
    fn test_naive_multi_searcher() {
        let trie = Arc::new(compile_trie(&["'Mid'", "'and'"]).unwrap());
        let searcher = NaiveMultiSearcher::new(trie);
        let text = b"Midsommer and";
        let first = searcher.search_forward(text, 0, text.len()).unwrap();
        assert_eq!(first.position, 0);
        assert_eq!(first.matcher.to_regex(true), "'Mid'");
        let second = searcher.search_forward(text, 1, text.len()).unwrap();
        assert_eq!(second.position, 10);
        assert_eq!(second.matcher.to_regex(true), "'and'");
        let last = searcher.search_backward(text, text.len(), 0).unwrap();
        assert_eq!(last.position, 10);
    }

    #[test]
    fn test_multi_forward_all_emits_same_position_together() {
        let trie = Arc::new(compile_trie(&["'an'", "'and'"]).unwrap());
        let searcher = NaiveMultiSearcher::new(trie);
        let text = b"and an";
        let found: Vec<(usize, String)> = searcher
            .search_forward_all(text, 0, text.len())
            .map(|m| (m.position, m.matcher.to_regex(true)))
            .collect();
        assert_eq!(
            found,
            vec![
                (0, "'an'".to_string()),
                (0, "'and'".to_string()),
                (4, "'an'".to_string()),
            ]
        );
    }

    #[test]
    fn test_multi_reader_search() {
        let trie = Arc::new(compile_trie(&["'Mid'", "'and'"]).unwrap());
        let searcher = NaiveMultiSearcher::new(trie);
        let reader = ByteReader::with_window_size(b"Midsommer and".to_vec(), 4);
        let (p, m) = searcher
            .search_reader_forward(&reader, 0, 13)
            .unwrap()
            .unwrap();
        assert_eq!((p, m.to_regex(true)), (0, "'Mid'".to_string()));
        let (p, _) = searcher
            .search_reader_backward(&reader, 13, 0)
            .unwrap()
            .unwrap();
        assert_eq!(p, 10);
    }
}
