//! Glushkov position-automaton construction.
//!
//! The automaton has one state per byte position of the pattern plus a
//! start state, and is epsilon-free: quantifiers become extra follow
//! edges rather than epsilon transitions, so `*` and `+` produce genuine
//! cycles in the arena.

use crate::automaton::Automaton;
use crate::matcher::ByteMatcher;
use crate::parser::ParseTree;
use crate::Error;

use super::{case_insensitive_matcher, compile_byte_matcher};

/// Core combinators the construction works over. `Repeat` is rewritten
/// into copies and optionals before analysis.
#[derive(Clone)]
enum Node {
    Leaf(ByteMatcher),
    Seq(Vec<Node>),
    Alt(Vec<Node>),
    Opt(Box<Node>),
    Star(Box<Node>),
    Plus(Box<Node>),
}

/// Compiles a pattern tree into a nondeterministic position automaton.
pub fn compile_nfa(tree: &ParseTree) -> Result<Automaton, Error> {
    let node = rewrite(tree)?;
    let mut positions: Vec<ByteMatcher> = Vec::new();
    let mut follow: Vec<Vec<usize>> = Vec::new();
    let info = analyse(&node, &mut positions, &mut follow);

    let mut nfa = Automaton::new();
    let start = nfa.add_state();
    nfa.set_start(start);
    let states: Vec<_> = positions.iter().map(|_| nfa.add_state()).collect();

    for &p in &info.first {
        nfa.add_transition(start, positions[p].clone(), states[p]);
    }
    for (q, follows) in follow.iter().enumerate() {
        for &p in follows {
            nfa.add_transition(states[q], positions[p].clone(), states[p]);
        }
    }
    for &p in &info.last {
        nfa.set_final(states[p], true);
    }
    if info.nullable {
        nfa.set_final(start, true);
    }
    Ok(nfa)
}

/// Rewrites a parse tree into the core combinators, expanding strings
/// into per-byte leaves and `Repeat` into copies.
fn rewrite(tree: &ParseTree) -> Result<Node, Error> {
    let node = match tree {
        ParseTree::Byte(_)
        | ParseTree::Any
        | ParseTree::AllBitmask(_)
        | ParseTree::AnyBitmask(_)
        | ParseTree::Range(_, _)
        | ParseTree::Set { .. } => Node::Leaf(compile_byte_matcher(tree)?),
        ParseTree::CaseSensitiveString(bytes) => Node::Seq(
            bytes
                .iter()
                .map(|&b| Node::Leaf(ByteMatcher::OneByte(b)))
                .collect(),
        ),
        ParseTree::CaseInsensitiveString(bytes) => Node::Seq(
            bytes
                .iter()
                .map(|&b| Node::Leaf(case_insensitive_matcher(b)))
                .collect(),
        ),
        ParseTree::Sequence(children) => {
            let nodes = children.iter().map(rewrite).collect::<Result<_, _>>()?;
            Node::Seq(nodes)
        }
        ParseTree::Alternatives(children) => {
            if children.is_empty() {
                return Err(Error::Compile("empty alternation".to_string()));
            }
            let nodes = children.iter().map(rewrite).collect::<Result<_, _>>()?;
            Node::Alt(nodes)
        }
        ParseTree::Optional(child) => Node::Opt(Box::new(rewrite(child)?)),
        ParseTree::ZeroToMany(child) => Node::Star(Box::new(rewrite(child)?)),
        ParseTree::OneToMany(child) => Node::Plus(Box::new(rewrite(child)?)),
        ParseTree::Repeat { min, max, node } => {
            let unit = rewrite(node)?;
            rewrite_repeat(*min, *max, unit)?
        }
    };
    Ok(node)
}

/// `X{n,m}` becomes n copies then (m-n) optional copies; `X{n,*}` becomes
/// n copies then a starred copy.
fn rewrite_repeat(min: u32, max: Option<u32>, unit: Node) -> Result<Node, Error> {
    if let Some(max) = max {
        if max < min {
            return Err(Error::Compile("repeat maximum below minimum".to_string()));
        }
        if max == 0 {
            return Err(Error::Compile("repeat count must be positive".to_string()));
        }
    }
    let mut parts: Vec<Node> = Vec::new();
    for _ in 0..min {
        parts.push(unit.clone());
    }
    match max {
        Some(max) => {
            for _ in min..max {
                parts.push(Node::Opt(Box::new(unit.clone())));
            }
        }
        None => parts.push(Node::Star(Box::new(unit))),
    }
    Ok(if parts.len() == 1 {
        parts.pop().unwrap()
    } else {
        Node::Seq(parts)
    })
}

struct Info {
    nullable: bool,
    first: Vec<usize>,
    last: Vec<usize>,
}

/// Computes nullable/first/last bottom-up, filling `follow` edges and the
/// position table as leaves are numbered.
fn analyse(node: &Node, positions: &mut Vec<ByteMatcher>, follow: &mut Vec<Vec<usize>>) -> Info {
    match node {
        Node::Leaf(matcher) => {
            let p = positions.len();
            positions.push(matcher.clone());
            follow.push(Vec::new());
            Info {
                nullable: false,
                first: vec![p],
                last: vec![p],
            }
        }
        Node::Seq(children) => {
            let mut info = Info {
                nullable: true,
                first: Vec::new(),
                last: Vec::new(),
            };
            for child in children {
                let c = analyse(child, positions, follow);
                for &q in &info.last {
                    extend_unique(&mut follow[q], &c.first);
                }
                if info.nullable {
                    extend_unique(&mut info.first, &c.first);
                }
                if c.nullable {
                    extend_unique(&mut info.last, &c.last);
                } else {
                    info.last = c.last;
                }
                info.nullable &= c.nullable;
            }
            info
        }
        Node::Alt(children) => {
            let mut info = Info {
                nullable: false,
                first: Vec::new(),
                last: Vec::new(),
            };
            for child in children {
                let c = analyse(child, positions, follow);
                info.nullable |= c.nullable;
                extend_unique(&mut info.first, &c.first);
                extend_unique(&mut info.last, &c.last);
            }
            info
        }
        Node::Opt(child) => {
            let mut info = analyse(child, positions, follow);
            info.nullable = true;
            info
        }
        Node::Star(child) | Node::Plus(child) => {
            let mut info = analyse(child, positions, follow);
            // The loop edge: every last position can be followed by every
            // first position again.
            let firsts = info.first.clone();
            for &q in &info.last {
                extend_unique(&mut follow[q], &firsts);
            }
            if matches!(node, Node::Star(_)) {
                info.nullable = true;
            }
            info
        }
    }
}

fn extend_unique(target: &mut Vec<usize>, source: &[usize]) {
    for &p in source {
        if !target.contains(&p) {
            target.push(p);
        }
    }
}
