//! Matchers: predicates over bytes, fixed sequences and sequence sets.
//!
//! Three layers, leaves first:
//!
//! - [`ByteMatcher`]: a predicate over one byte value
//! - [`SequenceMatcher`]: an ordered, fixed-length run of byte matchers
//! - [`TrieMatcher`]: a set of sequences queried by position
//!
//! All matchers are immutable once built and safe to share across threads.

mod byte;
mod multi;
mod sequence;

pub use byte::ByteMatcher;
pub use multi::TrieMatcher;
pub use sequence::{
    from_matchers, ByteSequenceMatcher, FixedSequenceMatcher, SequenceMatcher,
    SequenceMatcherExt,
};
