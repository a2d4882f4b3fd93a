//! Compilers from parse trees to matchers and automata.
//!
//! Each compiler accepts the [`ParseTree`] kinds it can express and
//! rejects the rest with [`Error::Compile`]:
//!
//! - [`compile_byte_matcher`]: single-byte nodes (literals, bitmasks,
//!   ranges, sets)
//! - [`compile_sequence`]: fixed-length concatenations, including exact
//!   repeats and case-(in)sensitive strings
//! - [`compile_trie`]: a list of fixed-length patterns into a
//!   [`TrieMatcher`]
//! - [`compile_nfa`] / [`compile_dfa`]: the full algebra including
//!   alternation and variable-length quantifiers

mod glushkov;

use std::sync::Arc;

use crate::bytes::ByteSet;
use crate::matcher::{from_matchers, ByteMatcher, SequenceMatcher, TrieMatcher};
use crate::parser::{parse, ParseTree};
use crate::Error;

pub use glushkov::compile_nfa;

use crate::automaton::Automaton;

/// Compiles a tree describing a single byte into a [`ByteMatcher`].
pub fn compile_byte_matcher(tree: &ParseTree) -> Result<ByteMatcher, Error> {
    let matcher = match tree {
        ParseTree::Byte(v) => ByteMatcher::OneByte(*v),
        ParseTree::Any => ByteMatcher::Any,
        ParseTree::AllBitmask(mask) => ByteMatcher::AllBitmask(*mask),
        ParseTree::AnyBitmask(mask) => ByteMatcher::AnyBitmask(*mask),
        ParseTree::Range(a, b) => ByteMatcher::range(*a, *b),
        ParseTree::Set { children, inverted } => {
            let set = set_of_children(children)?;
            let matcher = ByteMatcher::from_set(set);
            if *inverted {
                matcher.invert()
            } else {
                matcher
            }
        }
        ParseTree::CaseSensitiveString(bytes) if bytes.len() == 1 => {
            ByteMatcher::OneByte(bytes[0])
        }
        ParseTree::CaseInsensitiveString(bytes) if bytes.len() == 1 => {
            case_insensitive_matcher(bytes[0])
        }
        other => {
            return Err(Error::Compile(format!(
                "not a single-byte expression: {:?}",
                other
            )))
        }
    };
    Ok(matcher)
}

/// The union of the byte sets of set children. Strings contribute every
/// byte they contain (both cases for case-insensitive strings).
fn set_of_children(children: &[ParseTree]) -> Result<ByteSet, Error> {
    let mut set = ByteSet::new();
    for child in children {
        match child {
            ParseTree::CaseSensitiveString(bytes) => {
                for &b in bytes {
                    set.insert(b);
                }
            }
            ParseTree::CaseInsensitiveString(bytes) => {
                for &b in bytes {
                    set.insert(b.to_ascii_lowercase());
                    set.insert(b.to_ascii_uppercase());
                }
            }
            other => {
                set = set.union(&compile_byte_matcher(other)?.byte_set());
            }
        }
    }
    Ok(set)
}

/// The matcher for one byte of a case-insensitive string: a two-byte set
/// for ASCII letters, the byte itself otherwise.
pub(crate) fn case_insensitive_matcher(b: u8) -> ByteMatcher {
    if b.is_ascii_alphabetic() {
        ByteMatcher::from_bytes(&[b.to_ascii_lowercase(), b.to_ascii_uppercase()])
    } else {
        ByteMatcher::OneByte(b)
    }
}

/// Compiles a fixed-length tree into a sequence matcher.
///
/// Accepts concatenations of single-byte nodes, strings and exact repeats
/// (`X{n}`); anything variable-length (alternation, `?`, `*`, `+`, ranged
/// repeats) is a compile error -- those constructs need an automaton.
pub fn compile_sequence(tree: &ParseTree) -> Result<Arc<dyn SequenceMatcher>, Error> {
    let mut matchers = Vec::new();
    gather_sequence(tree, &mut matchers)?;
    if matchers.is_empty() {
        return Err(Error::Compile("empty sequence".to_string()));
    }
    Ok(from_matchers(matchers))
}

/// Parses and compiles pattern text into a sequence matcher.
pub fn compile_sequence_pattern(pattern: &str) -> Result<Arc<dyn SequenceMatcher>, Error> {
    compile_sequence(&parse(pattern)?)
}

fn gather_sequence(tree: &ParseTree, out: &mut Vec<ByteMatcher>) -> Result<(), Error> {
    match tree {
        ParseTree::Sequence(children) => {
            for child in children {
                gather_sequence(child, out)?;
            }
        }
        ParseTree::CaseSensitiveString(bytes) => {
            out.extend(bytes.iter().map(|&b| ByteMatcher::OneByte(b)));
        }
        ParseTree::CaseInsensitiveString(bytes) => {
            out.extend(bytes.iter().map(|&b| case_insensitive_matcher(b)));
        }
        ParseTree::Repeat {
            min,
            max: Some(max),
            node,
        } if min == max => {
            if *min == 0 {
                return Err(Error::Compile("repeat count must be positive".to_string()));
            }
            let mut unit = Vec::new();
            gather_sequence(node, &mut unit)?;
            for _ in 0..*min {
                out.extend(unit.iter().cloned());
            }
        }
        ParseTree::Byte(_)
        | ParseTree::Any
        | ParseTree::AllBitmask(_)
        | ParseTree::AnyBitmask(_)
        | ParseTree::Range(_, _)
        | ParseTree::Set { .. } => {
            out.push(compile_byte_matcher(tree)?);
        }
        ParseTree::Alternatives(_)
        | ParseTree::Optional(_)
        | ParseTree::ZeroToMany(_)
        | ParseTree::OneToMany(_)
        | ParseTree::Repeat { .. } => {
            return Err(Error::Compile(
                "variable-length construct in a fixed-length sequence".to_string(),
            ));
        }
    }
    Ok(())
}

/// Parses and compiles a list of fixed-length patterns into a trie.
pub fn compile_trie(patterns: &[&str]) -> Result<TrieMatcher, Error> {
    if patterns.is_empty() {
        return Err(Error::InvalidArgument(
            "trie needs at least one pattern".to_string(),
        ));
    }
    let sequences = patterns
        .iter()
        .map(|p| compile_sequence_pattern(p))
        .collect::<Result<Vec<_>, _>>()?;
    TrieMatcher::new(sequences)
}

/// Compiles a pattern tree into a deterministic automaton: the Glushkov
/// NFA followed by subset construction.
pub fn compile_dfa(tree: &ParseTree) -> Result<Automaton, Error> {
    Ok(compile_nfa(tree)?.determinise())
}
