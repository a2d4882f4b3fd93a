//! Fixed-length sequence matchers.
//!
//! A sequence matcher is an ordered run of byte matchers of length `n >= 1`.
//! Two representations exist: [`ByteSequenceMatcher`] for the common case
//! where every position is a single byte value (stored as a contiguous byte
//! array, matched by slice comparison), and [`FixedSequenceMatcher`] for
//! sequences mixing sets, ranges and bitmasks.
//!
//! Subsequence and reverse produce views sharing the backing storage via
//! `Arc`; a view can never outlive its storage, and reversal is involutive.

use std::sync::Arc;

use crate::bytes::byte_to_pattern;
use crate::reader::WindowReader;
use crate::Error;

use super::ByteMatcher;

/// An ordered, fixed-length sequence of byte matchers.
///
/// Bounds-checked matching treats out-of-range positions as mismatches and
/// returns `false`; the `_no_check` variant assumes the caller has already
/// established `pos + len() <= bytes.len()`.
pub trait SequenceMatcher: Send + Sync {
    /// Number of positions in the sequence. Always at least one.
    fn len(&self) -> usize;

    /// The matcher at a position.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    fn matcher_at(&self, index: usize) -> ByteMatcher;

    /// Tests the sequence against a buffer at `pos`, returning `false`
    /// when the sequence would run past either end of the buffer.
    fn matches(&self, bytes: &[u8], pos: usize) -> bool {
        pos + self.len() <= bytes.len() && self.matches_no_check(bytes, pos)
    }

    /// Tests the sequence at `pos` without bounds checking.
    ///
    /// Callers must guarantee `pos + len() <= bytes.len()`.
    fn matches_no_check(&self, bytes: &[u8], pos: usize) -> bool;

    /// Tests the sequence at an absolute position in a windowed source,
    /// continuing across window boundaries as needed. Returns `false` when
    /// the source ends, or a window is unavailable, before the sequence is
    /// fully consumed.
    fn matches_reader(&self, reader: &dyn WindowReader, pos: u64) -> Result<bool, Error> {
        let len = self.len() as u64;
        if pos + len > reader.length() {
            return Ok(false);
        }
        let mut matched = 0usize;
        let mut abs = pos;
        while matched < self.len() {
            let window = match reader.window(abs)? {
                Some(w) => w,
                None => return Ok(false),
            };
            let offset = (abs - window.start()) as usize;
            let available = window.limit() - offset;
            let take = available.min(self.len() - matched);
            let slice = &window.bytes()[offset..offset + take];
            for (i, &b) in slice.iter().enumerate() {
                if !self.matcher_at(matched + i).matches(b) {
                    return Ok(false);
                }
            }
            matched += take;
            abs += take as u64;
        }
        Ok(true)
    }

    /// A view over positions `[begin, end)`, sharing backing storage.
    ///
    /// # Panics
    ///
    /// Panics if `begin >= end` or `end > len()`.
    fn subsequence(&self, begin: usize, end: usize) -> Arc<dyn SequenceMatcher>;

    /// A view matching the same bytes in reverse order.
    fn reverse(&self) -> Arc<dyn SequenceMatcher>;

    /// A sequence equivalent to `count` concatenated copies of this one.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    fn repeat(&self, count: usize) -> Arc<dyn SequenceMatcher>;

    /// Renders the sequence as pattern text that re-parses to an
    /// equivalent matcher. Elements are space-separated when `pretty`.
    fn to_regex(&self, pretty: bool) -> String;
}

/// Builds the tightest sequence representation for a run of byte matchers:
/// a [`ByteSequenceMatcher`] when every element matches exactly one byte,
/// otherwise a [`FixedSequenceMatcher`].
pub fn from_matchers(matchers: Vec<ByteMatcher>) -> Arc<dyn SequenceMatcher> {
    assert!(!matchers.is_empty(), "sequence must have at least one element");
    let all_single = matchers
        .iter()
        .all(|m| matches!(m, ByteMatcher::OneByte(_)));
    if all_single {
        let bytes: Vec<u8> = matchers
            .iter()
            .map(|m| match m {
                ByteMatcher::OneByte(v) => *v,
                _ => unreachable!(),
            })
            .collect();
        Arc::new(ByteSequenceMatcher::new(bytes))
    } else {
        Arc::new(FixedSequenceMatcher::new(matchers))
    }
}

/// Extension helpers available on any sequence matcher.
pub trait SequenceMatcherExt: SequenceMatcher {
    /// True when this sequence and `other` accept exactly the same byte
    /// strings, position by position.
    fn is_equivalent(&self, other: &dyn SequenceMatcher) -> bool {
        self.len() == other.len()
            && (0..self.len())
                .all(|i| self.matcher_at(i).is_equivalent(&other.matcher_at(i)))
    }

    /// A view from `begin` to the end of the sequence.
    fn subsequence_from(&self, begin: usize) -> Arc<dyn SequenceMatcher> {
        self.subsequence(begin, self.len())
    }
}

impl<S: SequenceMatcher + ?Sized> SequenceMatcherExt for S {}

/// A sequence where every position matches exactly one byte value.
///
/// Stored as a shared byte array with `[start, end)` indices and a
/// direction flag; subsequence and reverse adjust indices without copying.
#[derive(Clone)]
pub struct ByteSequenceMatcher {
    bytes: Arc<[u8]>,
    start: usize,
    end: usize,
    reversed: bool,
}

impl ByteSequenceMatcher {
    /// Wraps a byte string as a sequence matcher.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is empty.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        assert!(!bytes.is_empty(), "sequence must have at least one byte");
        let end = bytes.len();
        Self {
            bytes: bytes.into(),
            start: 0,
            end,
            reversed: false,
        }
    }

    /// The matched bytes in match order.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.reversed {
            self.bytes[self.start..self.end].iter().rev().copied().collect()
        } else {
            self.bytes[self.start..self.end].to_vec()
        }
    }

    #[inline]
    fn byte_at(&self, index: usize) -> u8 {
        if self.reversed {
            self.bytes[self.end - 1 - index]
        } else {
            self.bytes[self.start + index]
        }
    }

    fn view(&self, start: usize, end: usize, reversed: bool) -> Self {
        Self {
            bytes: self.bytes.clone(),
            start,
            end,
            reversed,
        }
    }
}

impl SequenceMatcher for ByteSequenceMatcher {
    fn len(&self) -> usize {
        self.end - self.start
    }

    fn matcher_at(&self, index: usize) -> ByteMatcher {
        assert!(index < self.len(), "index {} out of bounds", index);
        ByteMatcher::OneByte(self.byte_at(index))
    }

    fn matches_no_check(&self, bytes: &[u8], pos: usize) -> bool {
        if self.reversed {
            let candidate = &bytes[pos..pos + self.len()];
            self.bytes[self.start..self.end]
                .iter()
                .rev()
                .zip(candidate)
                .all(|(a, b)| a == b)
        } else {
            &bytes[pos..pos + self.len()] == &self.bytes[self.start..self.end]
        }
    }

    fn matches_reader(&self, reader: &dyn WindowReader, pos: u64) -> Result<bool, Error> {
        let len = self.len() as u64;
        if pos + len > reader.length() {
            return Ok(false);
        }
        let mut matched = 0usize;
        let mut abs = pos;
        while matched < self.len() {
            let window = match reader.window(abs)? {
                Some(w) => w,
                None => return Ok(false),
            };
            let offset = (abs - window.start()) as usize;
            let available = window.limit() - offset;
            let take = available.min(self.len() - matched);
            let slice = &window.bytes()[offset..offset + take];
            for (i, &b) in slice.iter().enumerate() {
                if self.byte_at(matched + i) != b {
                    return Ok(false);
                }
            }
            matched += take;
            abs += take as u64;
        }
        Ok(true)
    }

    fn subsequence(&self, begin: usize, end: usize) -> Arc<dyn SequenceMatcher> {
        assert!(begin < end && end <= self.len(), "invalid subsequence bounds");
        let view = if self.reversed {
            // Positions [begin, end) of a reversed view map to the
            // underlying range [self.end - end, self.end - begin).
            self.view(self.end - end, self.end - begin, true)
        } else {
            self.view(self.start + begin, self.start + end, false)
        };
        Arc::new(view)
    }

    fn reverse(&self) -> Arc<dyn SequenceMatcher> {
        Arc::new(self.view(self.start, self.end, !self.reversed))
    }

    fn repeat(&self, count: usize) -> Arc<dyn SequenceMatcher> {
        assert!(count > 0, "repeat count must be positive");
        if count == 1 {
            return Arc::new(self.clone());
        }
        let unit = self.to_bytes();
        let mut bytes = Vec::with_capacity(unit.len() * count);
        for _ in 0..count {
            bytes.extend_from_slice(&unit);
        }
        Arc::new(ByteSequenceMatcher::new(bytes))
    }

    fn to_regex(&self, pretty: bool) -> String {
        render_byte_run(&self.to_bytes(), pretty)
    }
}

/// Renders a run of byte values, merging printable stretches into quoted
/// strings when `pretty`.
fn render_byte_run(bytes: &[u8], pretty: bool) -> String {
    if !pretty {
        return bytes.iter().map(|b| format!("{:02x}", b)).collect();
    }
    let printable = |b: u8| (32..=126).contains(&b) && b != b'\'';
    let mut parts: Vec<String> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if printable(bytes[i]) {
            let mut j = i;
            while j < bytes.len() && printable(bytes[j]) {
                j += 1;
            }
            let text: String = bytes[i..j].iter().map(|&b| b as char).collect();
            parts.push(format!("'{}'", text));
            i = j;
        } else {
            parts.push(byte_to_pattern(bytes[i], false));
            i += 1;
        }
    }
    parts.join(" ")
}

/// A general sequence mixing arbitrary byte matchers.
#[derive(Clone)]
pub struct FixedSequenceMatcher {
    matchers: Arc<[ByteMatcher]>,
    start: usize,
    end: usize,
    reversed: bool,
}

impl FixedSequenceMatcher {
    /// Wraps a run of byte matchers as a sequence matcher.
    ///
    /// # Panics
    ///
    /// Panics if `matchers` is empty.
    pub fn new(matchers: Vec<ByteMatcher>) -> Self {
        assert!(!matchers.is_empty(), "sequence must have at least one element");
        let end = matchers.len();
        Self {
            matchers: matchers.into(),
            start: 0,
            end,
            reversed: false,
        }
    }

    #[inline]
    fn element(&self, index: usize) -> &ByteMatcher {
        if self.reversed {
            &self.matchers[self.end - 1 - index]
        } else {
            &self.matchers[self.start + index]
        }
    }

    fn view(&self, start: usize, end: usize, reversed: bool) -> Self {
        Self {
            matchers: self.matchers.clone(),
            start,
            end,
            reversed,
        }
    }
}

impl SequenceMatcher for FixedSequenceMatcher {
    fn len(&self) -> usize {
        self.end - self.start
    }

    fn matcher_at(&self, index: usize) -> ByteMatcher {
        assert!(index < self.len(), "index {} out of bounds", index);
        self.element(index).clone()
    }

    fn matches_no_check(&self, bytes: &[u8], pos: usize) -> bool {
        (0..self.len()).all(|i| self.element(i).matches(bytes[pos + i]))
    }

    fn subsequence(&self, begin: usize, end: usize) -> Arc<dyn SequenceMatcher> {
        assert!(begin < end && end <= self.len(), "invalid subsequence bounds");
        let view = if self.reversed {
            self.view(self.end - end, self.end - begin, true)
        } else {
            self.view(self.start + begin, self.start + end, false)
        };
        Arc::new(view)
    }

    fn reverse(&self) -> Arc<dyn SequenceMatcher> {
        Arc::new(self.view(self.start, self.end, !self.reversed))
    }

    fn repeat(&self, count: usize) -> Arc<dyn SequenceMatcher> {
        assert!(count > 0, "repeat count must be positive");
        if count == 1 {
            return Arc::new(self.clone());
        }
        let mut matchers = Vec::with_capacity(self.len() * count);
        for _ in 0..count {
            for i in 0..self.len() {
                matchers.push(self.element(i).clone());
            }
        }
        Arc::new(FixedSequenceMatcher::new(matchers))
    }

    fn to_regex(&self, pretty: bool) -> String {
        let parts: Vec<String> = (0..self.len())
            .map(|i| self.element(i).to_regex(pretty))
            .collect();
        if pretty {
            parts.join(" ")
        } else {
            parts.join("")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::ByteSet;
    use crate::reader::ByteReader;

    fn whitespace_digit_seq() -> FixedSequenceMatcher {
        FixedSequenceMatcher::new(vec![
            ByteMatcher::Set(ByteSet::from_bytes(&[b' ', b'\t'])),
            ByteMatcher::range(b'0', b'9'),
        ])
    }

    #[test]
    fn test_byte_sequence_basic_matching() {
        let seq = ByteSequenceMatcher::new(b"Here".to_vec());
        assert_eq!(seq.len(), 4);
        let buf = b"xHereHerey";
        assert!(seq.matches(buf, 1));
        assert!(seq.matches(buf, 5));
        assert!(!seq.matches(buf, 0));
        assert!(!seq.matches(buf, 2));
        // Out of range is a mismatch, not a panic.
        assert!(!seq.matches(buf, 7));
        assert!(!seq.matches(buf, 100));
    }

    #[test]
    fn test_matches_agrees_with_positionwise_matchers() {
        let seq = ByteSequenceMatcher::new(b"ab".to_vec());
        let buf = b"abab";
        for pos in 0..=2 {
            let expected = (0..seq.len())
                .all(|i| seq.matcher_at(i).matches(buf[pos + i]));
            assert_eq!(seq.matches(buf, pos), expected);
        }
    }

    #[test]
    fn test_matcher_at() {
        let seq = ByteSequenceMatcher::new(b"abc".to_vec());
        assert_eq!(seq.matcher_at(0), ByteMatcher::OneByte(b'a'));
        assert_eq!(seq.matcher_at(2), ByteMatcher::OneByte(b'c'));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_matcher_at_out_of_bounds() {
        ByteSequenceMatcher::new(b"abc".to_vec()).matcher_at(3);
    }

    #[test]
    fn test_reverse_matches_reversed_bytes() {
        let seq = ByteSequenceMatcher::new(b"abc".to_vec());
        let rev = seq.reverse();
        assert!(rev.matches(b"cba", 0));
        assert!(!rev.matches(b"abc", 0));
        assert_eq!(rev.matcher_at(0), ByteMatcher::OneByte(b'c'));
    }

    #[test]
    fn test_reverse_is_involutive() {
        let seq = ByteSequenceMatcher::new(b"abcd".to_vec());
        let twice = seq.reverse().reverse();
        assert!(seq.is_equivalent(twice.as_ref()));
        let buf = b"xxabcdxx";
        for pos in 0..buf.len() {
            assert_eq!(seq.matches(buf, pos), twice.matches(buf, pos));
        }
    }

    #[test]
    fn test_subsequence_shares_semantics() {
        let seq = ByteSequenceMatcher::new(b"abcdef".to_vec());
        let sub = seq.subsequence(1, 4);
        assert_eq!(sub.len(), 3);
        assert!(sub.matches(b"bcd", 0));
        assert!(!sub.matches(b"abc", 0));
        // Single-element subsequence.
        let one = seq.subsequence(2, 3);
        assert_eq!(one.len(), 1);
        assert!(one.matches(b"c", 0));
        // One-argument form runs to the end.
        let tail = seq.subsequence_from(3);
        assert_eq!(tail.len(), 3);
        assert!(tail.matches(b"def", 0));
    }

    #[test]
    fn test_subsequence_of_reversed_view() {
        let seq = ByteSequenceMatcher::new(b"abcdef".to_vec());
        let rev = seq.reverse(); // matches "fedcba"
        let sub = rev.subsequence(1, 4); // positions 1..4 of the reverse: "edc"
        assert_eq!(sub.len(), 3);
        assert!(sub.matches(b"edc", 0));
        assert_eq!(sub.matcher_at(0), ByteMatcher::OneByte(b'e'));
    }

    #[test]
    fn test_repeat() {
        let seq = ByteSequenceMatcher::new(b"ab".to_vec());
        let repeated = seq.repeat(3);
        assert_eq!(repeated.len(), 6);
        assert!(repeated.matches(b"ababab", 0));
        assert!(!repeated.matches(b"ababba", 0));
        // repeat(1) is behaviourally the original.
        let once = seq.repeat(1);
        assert!(once.matches(b"ab", 0));
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_repeat_of_reversed_view() {
        let seq = ByteSequenceMatcher::new(b"ab".to_vec());
        let repeated = seq.reverse().repeat(2);
        assert!(repeated.matches(b"baba", 0));
    }

    #[test]
    fn test_fixed_sequence_matching() {
        let seq = whitespace_digit_seq();
        assert!(seq.matches(b" 5", 0));
        assert!(seq.matches(b"\t0", 0));
        assert!(!seq.matches(b"x5", 0));
        assert!(!seq.matches(b" x", 0));
    }

    #[test]
    fn test_fixed_sequence_reverse_and_subsequence() {
        let seq = whitespace_digit_seq();
        let rev = seq.reverse();
        assert!(rev.matches(b"5 ", 0));
        assert!(!rev.matches(b" 5", 0));
        let sub = seq.subsequence(1, 2);
        assert!(sub.matches(b"7", 0));
        assert!(!sub.matches(b" ", 0));
    }

    #[test]
    fn test_from_matchers_degenerates_to_byte_sequence() {
        let seq = from_matchers(vec![
            ByteMatcher::OneByte(b'h'),
            ByteMatcher::OneByte(b'i'),
        ]);
        assert_eq!(seq.to_regex(true), "'hi'");
        assert!(seq.matches(b"hi", 0));

        let general = from_matchers(vec![
            ByteMatcher::OneByte(b'h'),
            ByteMatcher::range(b'a', b'z'),
        ]);
        assert!(general.matches(b"hi", 0));
        assert!(general.matches(b"hz", 0));
        assert!(!general.matches(b"hI", 0));
    }

    #[test]
    fn test_matches_reader_within_single_window() {
        let reader = ByteReader::new(b"xHerey".to_vec());
        let seq = ByteSequenceMatcher::new(b"Here".to_vec());
        assert!(seq.matches_reader(&reader, 1).unwrap());
        assert!(!seq.matches_reader(&reader, 0).unwrap());
        // Sequence would run past the end.
        assert!(!seq.matches_reader(&reader, 3).unwrap());
    }

    #[test]
    fn test_matches_reader_across_window_boundaries() {
        let data = b"AAAAAAAGutenberg".to_vec();
        let seq = ByteSequenceMatcher::new(b"Gutenberg".to_vec());
        // Place the boundary at every offset inside the match.
        for window_size in 1..=data.len() {
            let reader = ByteReader::with_window_size(data.clone(), window_size);
            assert!(
                seq.matches_reader(&reader, 7).unwrap(),
                "window size {}",
                window_size
            );
            assert!(!seq.matches_reader(&reader, 6).unwrap());
        }
    }

    #[test]
    fn test_matches_reader_general_sequence_across_windows() {
        let seq = whitespace_digit_seq();
        let reader = ByteReader::with_window_size(b"ab 7cd".to_vec(), 3);
        // " 7" spans the boundary between windows [0,3) and [3,6).
        assert!(seq.matches_reader(&reader, 2).unwrap());
        assert!(!seq.matches_reader(&reader, 1).unwrap());
    }

    #[test]
    fn test_to_regex_rendering() {
        let seq = ByteSequenceMatcher::new(b"Here".to_vec());
        assert_eq!(seq.to_regex(false), "48657265");
        assert_eq!(seq.to_regex(true), "'Here'");

        let mixed = ByteSequenceMatcher::new(vec![0x00, b'a', b'b', 0xFF]);
        assert_eq!(mixed.to_regex(true), "00 'ab' ff");

        let general = whitespace_digit_seq();
        assert_eq!(general.to_regex(false), "[09 20][30-39]");
    }
}
