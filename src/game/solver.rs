//! Exhaustive exact search for expressions reaching the target.
//!
//! Every permutation of the hand is reduced pairwise: pick an ordered pair of
//! remaining operands, combine it with each operator, and recurse until a
//! single value is left. Ordered pairs matter because `-` and `/` do not
//! commute. All intermediate values are [`Fraction`]s, so `8/(3-8/3)` is found
//! and nothing "almost 24" is ever accepted.

use std::collections::HashSet;

use super::expr::Op;
use super::fraction::Fraction;
use super::{Hand, TARGET};

/// Upper bound on the number of expressions returned.
pub const MAX_SOLUTIONS: usize = 5;

#[derive(Debug, Clone)]
struct Term {
    value: Fraction,
    text: String,
}

#[derive(Default)]
struct Solutions {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl Solutions {
    fn insert(&mut self, text: String) {
        if self.seen.insert(text.clone()) {
            self.ordered.push(text);
        }
    }

    fn is_full(&self) -> bool {
        self.ordered.len() >= MAX_SOLUTIONS
    }
}

/// Returns up to [`MAX_SOLUTIONS`] distinct expressions that use every card
/// exactly once and evaluate to exactly 24, in discovery order.
pub fn solve(hand: &Hand) -> Vec<String> {
    let mut found = Solutions::default();
    for perm in permutations(hand) {
        let terms = perm
            .iter()
            .map(|&card| Term {
                value: Fraction::from(i64::from(card)),
                text: card.to_string(),
            })
            .collect();
        search(terms, &mut found);
        if found.is_full() {
            break;
        }
    }
    found.ordered
}

fn search(terms: Vec<Term>, found: &mut Solutions) {
    if found.is_full() {
        return;
    }
    if let [last] = terms.as_slice() {
        if last.value.equals_integer(TARGET) {
            found.insert(strip_outer(&last.text).to_string());
        }
        return;
    }
    for i in 0..terms.len() {
        for j in 0..terms.len() {
            if i == j {
                continue;
            }
            let (a, b) = (&terms[i], &terms[j]);
            let rest: Vec<Term> = terms
                .iter()
                .enumerate()
                .filter(|(k, _)| *k != i && *k != j)
                .map(|(_, t)| t.clone())
                .collect();
            for op in Op::ALL {
                // a zero divisor prunes this branch only
                let Some(value) = op.apply(a.value, b.value) else {
                    continue;
                };
                let mut next = rest.clone();
                next.push(Term {
                    value,
                    text: format!("({}{}{})", a.text, op.symbol(), b.text),
                });
                search(next, found);
            }
        }
    }
}

fn strip_outer(text: &str) -> &str {
    text.strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(text)
}

fn permutations(items: &[u8]) -> Vec<Vec<u8>> {
    if items.is_empty() {
        return vec![vec![]];
    }
    items
        .iter()
        .enumerate()
        .flat_map(|(i, &head)| {
            let rest: Vec<u8> = items
                .iter()
                .enumerate()
                .filter_map(|(j, &x)| (i != j).then_some(x))
                .collect();
            permutations(&rest)
                .into_iter()
                .map(move |tail| std::iter::once(head).chain(tail).collect())
        })
        .collect()
}
