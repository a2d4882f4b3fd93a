//! Multi-sequence matching over a byte trie.
//!
//! [`TrieMatcher`] holds a set of sequence matchers in a trie of byte
//! transitions: nodes live in an arena `Vec` and children are kept as
//! sorted `(byte, index)` pairs searched binarily. A position in a
//! contributing sequence that accepts several bytes fans out into one
//! child per byte, so the trie always transitions on concrete byte values.
//! Final nodes carry the indices of the sequences ending there.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::reader::WindowReader;
use crate::Error;

use super::SequenceMatcher;

/// Index into the trie arena.
type NodeIdx = u32;

const ROOT: NodeIdx = 0;

#[derive(Default)]
struct TrieNode {
    /// Children as (byte, index) pairs, sorted by byte.
    children: SmallVec<[(u8, NodeIdx); 4]>,
    /// Indices of sequences that end at this node.
    endings: SmallVec<[u32; 1]>,
}

/// An immutable set of sequence matchers queryable by position.
///
/// `first_match` stops at the first sequence ending during the walk (the
/// shortest match at that position); `all_matches` keeps consuming bytes
/// until no transition exists and reports every sequence that ended.
pub struct TrieMatcher {
    nodes: Vec<TrieNode>,
    sequences: Vec<Arc<dyn SequenceMatcher>>,
    min_len: usize,
    max_len: usize,
}

impl TrieMatcher {
    /// Builds a trie over the given sequences.
    ///
    /// Returns [`Error::InvalidArgument`] when `sequences` is empty.
    pub fn new(sequences: Vec<Arc<dyn SequenceMatcher>>) -> Result<Self, Error> {
        if sequences.is_empty() {
            return Err(Error::InvalidArgument(
                "trie matcher needs at least one sequence".to_string(),
            ));
        }
        let min_len = sequences.iter().map(|s| s.len()).min().unwrap();
        let max_len = sequences.iter().map(|s| s.len()).max().unwrap();
        let mut trie = Self {
            nodes: vec![TrieNode::default()],
            sequences,
            min_len,
            max_len,
        };
        for index in 0..trie.sequences.len() {
            let sequence = trie.sequences[index].clone();
            trie.insert(ROOT, sequence.as_ref(), index as u32, 0);
        }
        Ok(trie)
    }

    fn alloc(&mut self) -> NodeIdx {
        let idx = self.nodes.len() as NodeIdx;
        self.nodes.push(TrieNode::default());
        idx
    }

    fn get_or_create_child(&mut self, parent: NodeIdx, byte: u8) -> NodeIdx {
        let children = &self.nodes[parent as usize].children;
        match children.binary_search_by_key(&byte, |&(b, _)| b) {
            Ok(pos) => children[pos].1,
            Err(pos) => {
                let child = self.alloc();
                self.nodes[parent as usize]
                    .children
                    .insert(pos, (byte, child));
                child
            }
        }
    }

    fn insert(&mut self, node: NodeIdx, sequence: &dyn SequenceMatcher, index: u32, depth: usize) {
        if depth == sequence.len() {
            self.nodes[node as usize].endings.push(index);
            return;
        }
        for byte in sequence.matcher_at(depth).matching_bytes() {
            let child = self.get_or_create_child(node, byte);
            self.insert(child, sequence, index, depth + 1);
        }
    }

    #[inline]
    fn child(&self, node: NodeIdx, byte: u8) -> Option<NodeIdx> {
        let children = &self.nodes[node as usize].children;
        children
            .binary_search_by_key(&byte, |&(b, _)| b)
            .ok()
            .map(|pos| children[pos].1)
    }

    /// Length of the shortest contributing sequence.
    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Length of the longest contributing sequence.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// The contributing sequences, in insertion order.
    pub fn sequences(&self) -> &[Arc<dyn SequenceMatcher>] {
        &self.sequences
    }

    /// The first sequence matching at `pos` (shortest when several end
    /// during the walk), or `None`.
    pub fn first_match(&self, bytes: &[u8], pos: usize) -> Option<Arc<dyn SequenceMatcher>> {
        if pos + self.min_len > bytes.len() {
            return None;
        }
        let mut node = ROOT;
        for &byte in &bytes[pos..] {
            node = self.child(node, byte)?;
            if let Some(&index) = self.nodes[node as usize].endings.first() {
                return Some(self.sequences[index as usize].clone());
            }
        }
        None
    }

    /// Every sequence matching at `pos`, shortest first.
    pub fn all_matches(&self, bytes: &[u8], pos: usize) -> Vec<Arc<dyn SequenceMatcher>> {
        let mut matches = Vec::new();
        if pos + self.min_len > bytes.len() {
            return matches;
        }
        let mut node = ROOT;
        for &byte in &bytes[pos..] {
            match self.child(node, byte) {
                Some(next) => node = next,
                None => break,
            }
            for &index in &self.nodes[node as usize].endings {
                matches.push(self.sequences[index as usize].clone());
            }
        }
        matches
    }

    /// As [`TrieMatcher::first_match`], over a windowed source.
    pub fn first_match_reader(
        &self,
        reader: &dyn WindowReader,
        pos: u64,
    ) -> Result<Option<Arc<dyn SequenceMatcher>>, Error> {
        if pos + self.min_len as u64 > reader.length() {
            return Ok(None);
        }
        let mut node = ROOT;
        let mut at = pos;
        while let Some(byte) = reader.read_byte(at)? {
            match self.child(node, byte) {
                Some(next) => node = next,
                None => return Ok(None),
            }
            if let Some(&index) = self.nodes[node as usize].endings.first() {
                return Ok(Some(self.sequences[index as usize].clone()));
            }
            at += 1;
        }
        Ok(None)
    }

    /// As [`TrieMatcher::all_matches`], over a windowed source.
    pub fn all_matches_reader(
        &self,
        reader: &dyn WindowReader,
        pos: u64,
    ) -> Result<Vec<Arc<dyn SequenceMatcher>>, Error> {
        let mut matches = Vec::new();
        if pos + self.min_len as u64 > reader.length() {
            return Ok(matches);
        }
        let mut node = ROOT;
        let mut at = pos;
        while let Some(byte) = reader.read_byte(at)? {
            match self.child(node, byte) {
                Some(next) => node = next,
                None => break,
            }
            for &index in &self.nodes[node as usize].endings {
                matches.push(self.sequences[index as usize].clone());
            }
            at += 1;
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{from_matchers, ByteMatcher, ByteSequenceMatcher};
    use crate::reader::ByteReader;

    fn seq(bytes: &[u8]) -> Arc<dyn SequenceMatcher> {
        Arc::new(ByteSequenceMatcher::new(bytes.to_vec()))
    }

    fn regexes(matches: &[Arc<dyn SequenceMatcher>]) -> Vec<String> {
        matches.iter().map(|m| m.to_regex(true)).collect()
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            TrieMatcher::new(Vec::new()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_lengths() {
        let trie = TrieMatcher::new(vec![seq(b"Mid"), seq(b"and"), seq(b"ample")]).unwrap();
        assert_eq!(trie.min_len(), 3);
        assert_eq!(trie.max_len(), 5);
        assert_eq!(trie.sequences().len(), 3);
    }

    #[test]
    fn test_first_and_all_matches() {
        let trie = TrieMatcher::new(vec![seq(b"Mid"), seq(b"and")]).unwrap();
        let text = b"Midsommer and";
        assert_eq!(
            regexes(&trie.all_matches(text, 0)),
            vec!["'Mid'".to_string()]
        );
        assert!(trie.all_matches(text, 1).is_empty());
        assert_eq!(
            regexes(&trie.all_matches(text, 10)),
            vec!["'and'".to_string()]
        );
        assert!(trie.first_match(text, 0).is_some());
        assert!(trie.first_match(text, 3).is_none());
    }

    #[test]
    fn test_bounds_gate() {
        let trie = TrieMatcher::new(vec![seq(b"abc")]).unwrap();
        // Fewer than min_len bytes left: no walk at all.
        assert!(trie.first_match(b"ab", 0).is_none());
        assert!(trie.all_matches(b"xab", 1).is_empty());
    }

    #[test]
    fn test_prefix_sequences_all_reported() {
        let trie = TrieMatcher::new(vec![seq(b"an"), seq(b"and")]).unwrap();
        let found = trie.all_matches(b"and", 0);
        assert_eq!(
            regexes(&found),
            vec!["'an'".to_string(), "'and'".to_string()]
        );
        // first_match stops at the shortest.
        let first = trie.first_match(b"and", 0).unwrap();
        assert_eq!(first.to_regex(true), "'an'");
    }

    #[test]
    fn test_set_positions_fan_out() {
        // [0-9] 'x' matches any digit followed by x.
        let digits = from_matchers(vec![
            ByteMatcher::range(b'0', b'9'),
            ByteMatcher::OneByte(b'x'),
        ]);
        let trie = TrieMatcher::new(vec![digits]).unwrap();
        for d in b'0'..=b'9' {
            let text = [d, b'x'];
            assert!(trie.first_match(&text, 0).is_some(), "digit {}", d as char);
        }
        assert!(trie.first_match(b"ax", 0).is_none());
    }

    #[test]
    fn test_same_bytes_two_sequences() {
        let trie = TrieMatcher::new(vec![seq(b"dup"), seq(b"dup")]).unwrap();
        assert_eq!(trie.all_matches(b"dup", 0).len(), 2);
    }

    #[test]
    fn test_reader_variants_cross_windows() {
        let trie = TrieMatcher::new(vec![seq(b"Mid"), seq(b"and")]).unwrap();
        let reader = ByteReader::with_window_size(b"Midsommer and".to_vec(), 4);
        let first = trie.first_match_reader(&reader, 0).unwrap().unwrap();
        assert_eq!(first.to_regex(true), "'Mid'");
        // "and" spans the window boundary at offset 12.
        let found = trie.all_matches_reader(&reader, 10).unwrap();
        assert_eq!(regexes(&found), vec!["'and'".to_string()]);
        assert!(trie.first_match_reader(&reader, 11).unwrap().is_none());
    }
}
