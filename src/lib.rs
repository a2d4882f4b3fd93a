//! bytescan: byte-oriented pattern matching and searching.
//!
//! The crate locates occurrences of patterns -- defined over byte values,
//! not characters -- inside arbitrary binary data, using a family of
//! matchers and a family of sub-linear search algorithms:
//!
//! - [`ByteMatcher`]: predicates over a single byte (literal, range,
//!   bitmask, set, inversion)
//! - [`SequenceMatcher`]: fixed-length runs of byte matchers, with a byte
//!   string fast path
//! - [`TrieMatcher`]: many sequences matched simultaneously through a byte
//!   trie
//! - [`Automaton`]: finite-state automata compiled from pattern text for
//!   variable-length constructs
//! - searchers: Horspool, Sunday, Set-Horspool and Wu-Manber shift-table
//!   algorithms, plus a naive oracle, all forward and backward
//!
//! Patterns are written in a byte-oriented textual syntax:
//!
//! ```
//! use bytescan::{HorspoolSearcher, Searcher};
//!
//! let searcher = HorspoolSearcher::from_pattern("'Here'").unwrap();
//! let haystack = b"xHereHerey";
//! assert_eq!(searcher.search_forward(haystack, 0, haystack.len()), Some(1));
//! ```
//!
//! Matchers and searchers are immutable once built and safe to share
//! across threads; searches over large inputs stream through a
//! [`WindowReader`] so matches may span window boundaries.

pub mod automaton;
pub mod bytes;
pub mod compiler;
pub mod matcher;
pub mod parser;
pub mod reader;
pub mod searcher;

use std::fmt;

pub use automaton::{Automaton, State, StateId, Transition};
pub use bytes::ByteSet;
pub use compiler::{
    compile_byte_matcher, compile_dfa, compile_nfa, compile_sequence,
    compile_sequence_pattern, compile_trie,
};
pub use matcher::{
    ByteMatcher, ByteSequenceMatcher, FixedSequenceMatcher, SequenceMatcher, TrieMatcher,
};
pub use parser::{parse, ParseTree};
pub use reader::{ByteReader, FileReader, MruCache, NoCache, Window, WindowCache, WindowReader};
pub use searcher::{
    HorspoolFinalFlagSearcher, HorspoolSearcher, Matches, MatcherSearcher, MultiMatches,
    MultiSearcher, NaiveMultiSearcher, Searcher, SequenceMatch, SetHorspoolSearcher,
    SundaySearcher, WuManberSearcher,
};

/// Errors surfaced by parsing, compiling and windowed I/O.
///
/// Match and search misses are never errors: `matches` returns `false` and
/// searches return `None`.
#[derive(Debug)]
pub enum Error {
    /// A constructor was given an unusable input.
    InvalidArgument(String),
    /// An index operation fell outside matcher or sequence bounds.
    IndexOutOfBounds { index: usize, len: usize },
    /// Malformed pattern text.
    Parse { pos: usize, msg: String },
    /// A pattern tree cannot be compiled to the requested matcher kind.
    Compile(String),
    /// An underlying reader failed.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::IndexOutOfBounds { index, len } => {
                write!(f, "index {} out of bounds for length {}", index, len)
            }
            Error::Parse { pos, msg } => write!(f, "parse error at byte {}: {}", pos, msg),
            Error::Compile(msg) => write!(f, "compile error: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
