//! Determinisation by subset construction.

use rustc_hash::FxHashMap;

use crate::matcher::ByteMatcher;

use super::{Automaton, StateId};

impl Automaton {
    /// Builds a deterministic automaton accepting the same prefixes, by
    /// the standard subset construction.
    ///
    /// Each DFA state corresponds to a set of NFA states; two candidate
    /// states are the same exactly when their sorted NFA subsets are
    /// equal. Byte values leading to the same subset are regrouped into a
    /// single transition carrying the tightest byte matcher for the group.
    pub fn determinise(&self) -> Automaton {
        let mut dfa = Automaton::new();
        if self.start().is_none() {
            return dfa;
        }

        let mut subset_ids: FxHashMap<Vec<StateId>, StateId> = FxHashMap::default();
        let start_subset = vec![self.start()];
        let start = dfa.add_state();
        dfa.set_start(start);
        dfa.set_final(start, self.any_final(&start_subset));
        subset_ids.insert(start_subset.clone(), start);

        let mut work = vec![start_subset];
        while let Some(subset) = work.pop() {
            let from = subset_ids[&subset];

            // Per-byte target subsets, kept sorted for stable identity.
            let mut targets: Vec<Vec<StateId>> = vec![Vec::new(); 256];
            for &id in &subset {
                for transition in &self.state(id).transitions {
                    for byte in transition.matcher.matching_bytes() {
                        let slot = &mut targets[byte as usize];
                        if !slot.contains(&transition.target) {
                            slot.push(transition.target);
                        }
                    }
                }
            }
            for slot in targets.iter_mut() {
                slot.sort_unstable();
            }

            // Regroup bytes mapping to the same subset.
            let mut groups: FxHashMap<Vec<StateId>, Vec<u8>> = FxHashMap::default();
            for byte in 0..256usize {
                if targets[byte].is_empty() {
                    continue;
                }
                groups
                    .entry(std::mem::take(&mut targets[byte]))
                    .or_default()
                    .push(byte as u8);
            }
            let mut groups: Vec<(Vec<StateId>, Vec<u8>)> = groups.into_iter().collect();
            groups.sort_unstable_by_key(|(_, bytes)| bytes[0]);

            for (target_subset, bytes) in groups {
                let to = match subset_ids.get(&target_subset) {
                    Some(&id) => id,
                    None => {
                        let id = dfa.add_state();
                        dfa.set_final(id, self.any_final(&target_subset));
                        subset_ids.insert(target_subset.clone(), id);
                        work.push(target_subset);
                        id
                    }
                };
                dfa.add_transition(from, ByteMatcher::from_bytes(&bytes), to);
            }
        }

        dfa.set_deterministic(true);
        dfa
    }

    fn any_final(&self, subset: &[StateId]) -> bool {
        subset.iter().any(|&id| self.state(id).is_final)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// NFA for 'a' ('a'|'b'): start fans out on 'a' to two states.
    fn ambiguous_nfa() -> Automaton {
        let mut fa = Automaton::new();
        let start = fa.add_state();
        let via_a = fa.add_state();
        let via_b = fa.add_state();
        let accept = fa.add_state();
        fa.add_transition(start, ByteMatcher::OneByte(b'a'), via_a);
        fa.add_transition(start, ByteMatcher::OneByte(b'a'), via_b);
        fa.add_transition(via_a, ByteMatcher::OneByte(b'a'), accept);
        fa.add_transition(via_b, ByteMatcher::OneByte(b'b'), accept);
        fa.set_final(accept, true);
        fa.set_start(start);
        fa
    }

    #[test]
    fn test_determinise_preserves_language() {
        let nfa = ambiguous_nfa();
        let dfa = nfa.determinise();
        assert!(dfa.is_deterministic());
        for input in [&b"aa"[..], b"ab", b"ax", b"ba", b"a", b""] {
            assert_eq!(
                nfa.matches(input, 0),
                dfa.matches(input, 0),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_determinise_merges_fanout() {
        let dfa = ambiguous_nfa().determinise();
        // start --a--> {via_a, via_b} is a single DFA state.
        let merged = dfa.step(dfa.start(), b'a').unwrap();
        assert!(dfa.step(merged, b'a').is_some());
        assert!(dfa.step(merged, b'b').is_some());
        assert!(dfa.step(merged, b'c').is_none());
        assert_eq!(dfa.len(), 3);
    }

    #[test]
    fn test_determinise_groups_bytes_into_one_transition() {
        // NFA with 256 single-byte transitions to one target collapses to
        // a single Any transition.
        let mut nfa = Automaton::new();
        let start = nfa.add_state();
        let target = nfa.add_state();
        for byte in 0..=255u8 {
            nfa.add_transition(start, ByteMatcher::OneByte(byte), target);
        }
        nfa.set_final(target, true);
        nfa.set_start(start);
        let dfa = nfa.determinise();
        assert_eq!(dfa.state(dfa.start()).transitions.len(), 1);
        assert_eq!(
            dfa.state(dfa.start()).transitions[0].matcher,
            ByteMatcher::Any
        );
    }

    #[test]
    fn test_determinise_cyclic() {
        // a+ with a cycle survives determinisation.
        let mut nfa = Automaton::new();
        let start = nfa.add_state();
        let s1 = nfa.add_state();
        nfa.add_transition(start, ByteMatcher::OneByte(b'a'), s1);
        nfa.add_transition(s1, ByteMatcher::OneByte(b'a'), s1);
        nfa.set_final(s1, true);
        nfa.set_start(start);
        let dfa = nfa.determinise();
        assert!(dfa.matches(b"aaaa", 0));
        assert!(!dfa.matches(b"b", 0));
    }
}
