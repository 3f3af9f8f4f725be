//! Topological sorting against an expensive, partially-defined comparison.
//!
//! The comparison function may answer "undetermined" for some pairs. The result
//! is a linear extension of whatever order the answers imply: if `a` must precede
//! `b`, either directly or through a chain of determined pairs, then `a` comes
//! first in the output.
//!
//! Comparisons are assumed to be expensive, so the sorter tries hard to avoid them.
//! Every answer is memoized (in both directions), and the known relations are
//! kept in a forest in which every node is known to come after its parent. A
//! candidate minimum that precedes some node never needs to be compared with that
//! node's descendants.
//!
//! The sorting itself is a merge sort: each half of the input is sorted
//! (which mostly serves to build up the forest), and then the halves are merged
//! by repeatedly extracting a minimal element.

use std::{cmp::Ordering, collections::HashMap, fmt::Write as _};

/// Counters describing how much work a sort did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortStats {
    /// The number of times the comparison function was actually called.
    pub comparisons: usize,
    /// The number of comparisons answered from the cache.
    pub cache_hits: usize,
}

#[derive(Clone, Debug)]
pub struct SortOutcome<T> {
    pub order: Vec<T>,
    pub stats: SortStats,
}

/// What to do after visiting a node of the forest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Walk {
    Continue,
    SkipSubtree,
    Abort,
}

/// Sorts `items` so that `a` comes before `b` whenever `cmp(a, b)` is `Less`
/// (and, transitively, whenever that's implied by other answers).
///
/// `cmp` returns `None` (or `Equal`) for pairs whose order doesn't matter.
pub fn partial_sort_by<T, F>(items: Vec<T>, cmp: F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Option<Ordering>,
{
    PartialOrderSorter::new(items, cmp).sort().order
}

pub struct PartialOrderSorter<T, F> {
    items: Vec<T>,
    cmp: F,
    /// Answers, keyed by `(i, j)` with `i < j`, oriented as `cmp(items[i], items[j])`.
    cache: HashMap<(usize, usize), Option<Ordering>>,
    /// The forest: `after[x]` are the children of `x`, and `parent[y]` is the
    /// node that `y` is a child of.
    parent: Vec<Option<usize>>,
    after: Vec<Vec<usize>>,
    stats: SortStats,
    check_invariants: bool,
}

impl<T, F> PartialOrderSorter<T, F>
where
    F: FnMut(&T, &T) -> Option<Ordering>,
{
    pub fn new(items: Vec<T>, cmp: F) -> Self {
        let n = items.len();
        PartialOrderSorter {
            items,
            cmp,
            cache: HashMap::new(),
            parent: vec![None; n],
            after: vec![Vec::new(); n],
            stats: SortStats::default(),
            check_invariants: cfg!(debug_assertions),
        }
    }

    /// Turns the extraction check on or off. It is on by default in debug builds.
    ///
    /// When on, every extracted minimum is checked against the cached answers:
    /// if some remaining element is known to precede it, we panic. This can only
    /// happen if the comparison function is cyclic.
    pub fn check_invariants(mut self, on: bool) -> Self {
        self.check_invariants = on;
        self
    }

    pub fn sort(mut self) -> SortOutcome<T> {
        let n = self.items.len();
        let order = self.sort_range(0, n);
        log::debug!(
            "sorted {n} items with {} comparisons ({} cached)",
            self.stats.comparisons,
            self.stats.cache_hits
        );

        let mut items: Vec<Option<T>> = self.items.into_iter().map(Some).collect();
        let order = order.into_iter().filter_map(|i| items[i].take()).collect();
        SortOutcome {
            order,
            stats: self.stats,
        }
    }

    /// The memoized comparison of the items at indices `a` and `b`.
    fn compare(&mut self, a: usize, b: usize) -> Option<Ordering> {
        if a == b {
            return None;
        }
        let key = (a.min(b), a.max(b));
        let ord = match self.cache.get(&key) {
            Some(&ord) => {
                self.stats.cache_hits += 1;
                ord
            }
            None => {
                self.stats.comparisons += 1;
                let ord = (self.cmp)(&self.items[key.0], &self.items[key.1])
                    .filter(|&o| o != Ordering::Equal);
                self.cache.insert(key, ord);
                ord
            }
        };
        if a < b {
            ord
        } else {
            ord.map(Ordering::reverse)
        }
    }

    fn cached(&self, a: usize, b: usize) -> Option<Ordering> {
        let ord = self.cache.get(&(a.min(b), a.max(b))).copied().flatten();
        if a < b {
            ord
        } else {
            ord.map(Ordering::reverse)
        }
    }

    /// Records that `x` comes before `y`, moving `y` (and its subtree) under `x`.
    fn make_before(&mut self, x: usize, y: usize) {
        if let Some(old) = self.parent[y] {
            self.after[old].retain(|&c| c != y);
        }
        self.after[x].push(y);
        self.parent[y] = Some(x);
    }

    /// Walks the subtree at `root` looking for a node that precedes `candidate`.
    ///
    /// Subtrees of nodes that `candidate` precedes are skipped.
    fn find_predecessor(&mut self, root: usize, candidate: usize) -> Option<usize> {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let walk = match self.compare(candidate, node) {
                Some(Ordering::Less) => Walk::SkipSubtree,
                Some(Ordering::Greater) => Walk::Abort,
                _ => Walk::Continue,
            };
            match walk {
                Walk::Continue => stack.extend(self.after[node].iter().rev()),
                Walk::SkipSubtree => {}
                Walk::Abort => return Some(node),
            }
        }
        None
    }

    /// Sorts the indices in `lo..hi`, returning them in order.
    ///
    /// As a side effect, the forest restricted to `lo..hi` ends up encoding
    /// (at least) the returned order.
    fn sort_range(&mut self, lo: usize, hi: usize) -> Vec<usize> {
        if hi - lo < 2 {
            return (lo..hi).collect();
        }
        let mid = lo + (hi - lo) / 2;
        self.sort_range(lo, mid);
        self.sort_range(mid, hi);

        // The number of unsorted elements left in each half.
        let mut remaining = [mid - lo, hi - mid];
        let half = |x: usize| usize::from(x >= mid);
        let mut extracted = vec![false; hi - lo];
        let mut roots: Vec<usize> = (lo..hi).filter(|&x| self.parent[x].is_none()).collect();
        let mut sorted = Vec::with_capacity(hi - lo);

        while !roots.is_empty() {
            if log::log_enabled!(log::Level::Trace) {
                log::trace!("merging {lo}..{hi}, roots {roots:?}\n{}", self.dump_forest(&roots));
            }

            // Start from the half with more unsorted elements.
            let larger = if remaining[0] > remaining[1] { 0 } else { 1 };
            let mut candidate = roots
                .iter()
                .copied()
                .find(|&r| half(r) == larger)
                .unwrap_or(roots[0]);

            let mut i = 0;
            while i < roots.len() {
                let root = roots[i];
                if root == candidate {
                    i += 1;
                    continue;
                }
                match self.compare(candidate, root) {
                    Some(Ordering::Less) => {
                        self.make_before(candidate, root);
                        roots.remove(i);
                    }
                    Some(Ordering::Greater) => {
                        self.make_before(root, candidate);
                        roots.retain(|&r| r != candidate);
                        candidate = root;
                        i = 0;
                    }
                    _ => match self.find_predecessor(root, candidate) {
                        Some(node) => {
                            log::trace!("{node} (under root {root}) precedes {candidate}");
                            self.make_before(node, candidate);
                            roots.retain(|&r| r != candidate);
                            candidate = root;
                            i = 0;
                        }
                        None => i += 1,
                    },
                }
            }

            log::trace!("extracting {candidate}");
            extracted[candidate - lo] = true;
            if self.check_invariants {
                if let Some(before) = (lo..hi)
                    .find(|&x| !extracted[x - lo] && self.cached(x, candidate) == Some(Ordering::Less))
                {
                    panic!("inconsistent comparisons: {before} precedes {candidate}, which was extracted first");
                }
            }
            remaining[half(candidate)] -= 1;
            sorted.push(candidate);
            roots.retain(|&r| r != candidate);
            roots.extend(
                self.after[candidate]
                    .iter()
                    .copied()
                    .filter(|&c| (lo..hi).contains(&c) && !extracted[c - lo]),
            );
        }
        debug_assert_eq!(sorted.len(), hi - lo);
        sorted
    }

    /// Renders the trees below `roots`, one node per line, indented by depth.
    fn dump_forest(&self, roots: &[usize]) -> String {
        let mut out = String::new();
        let mut stack: Vec<(usize, usize)> = roots.iter().rev().map(|&r| (r, 0)).collect();
        while let Some((node, depth)) = stack.pop() {
            let _ = writeln!(out, "{}{node}", "|   ".repeat(depth));
            stack.extend(self.after[node].iter().rev().map(|&c| (c, depth + 1)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn usual(x: &i32, y: &i32) -> Option<Ordering> {
        Some(x.cmp(y))
    }

    /// Checks that each of the chains appears in order in `result`.
    fn respects(result: &[i32], chains: &[&[i32]]) {
        for chain in chains {
            for pair in chain.windows(2) {
                let i = result.iter().position(|x| *x == pair[0]).unwrap();
                let j = result.iter().position(|x| *x == pair[1]).unwrap();
                assert!(i < j, "{} should come before {} in {result:?}", pair[0], pair[1]);
            }
        }
    }

    /// Ordinary order against zero; otherwise same-sign numbers compare by
    /// absolute value, and opposite signs are unordered.
    fn bottleneck(x: &i32, y: &i32) -> Option<Ordering> {
        if x.signum() == y.signum() {
            Some(x.abs().cmp(&y.abs()))
        } else if *x == 0 || *y == 0 {
            Some(x.cmp(y))
        } else {
            None
        }
    }

    #[test]
    fn total_orders() {
        assert_eq!(partial_sort_by(vec![0, 1], usual), vec![0, 1]);
        assert_eq!(partial_sort_by(vec![1, 0], usual), vec![0, 1]);
        assert_eq!(
            partial_sort_by((0..10).collect(), usual),
            (0..10).collect::<Vec<_>>()
        );
        assert_eq!(
            partial_sort_by(vec![5, 3, 9, 0, 7, 1, 8, 2, 6, 4], usual),
            (0..10).collect::<Vec<_>>()
        );
        assert!(partial_sort_by(Vec::<i32>::new(), usual).is_empty());
        assert_eq!(partial_sort_by(vec![7], usual), vec![7]);
    }

    #[test]
    fn single_bottleneck() {
        assert_eq!(partial_sort_by(vec![-1, 0, 1], bottleneck), vec![-1, 0, 1]);
        let out = partial_sort_by((-4..=4).collect(), bottleneck);
        insta::assert_debug_snapshot!(out, @r"
        [
            -1,
            -2,
            -3,
            -4,
            0,
            1,
            2,
            3,
            4,
        ]
        ");
    }

    #[test]
    fn two_bottlenecks() {
        // The determined order is (1 2 3) -1 (4 5 6) -2 (7 8 9).
        fn cmp(x: &i32, y: &i32) -> Option<Ordering> {
            let (x, y) = (*x as f64, *y as f64);
            match (x > 0.0, y > 0.0) {
                (true, false) => x.partial_cmp(&(0.5 - 3.0 * y)),
                (false, true) => (0.5 - 3.0 * x).partial_cmp(&y),
                (false, false) => (-x).partial_cmp(&-y),
                (true, true) => {
                    let same_group = ((x - 1.0) / 3.0).floor() == ((y - 1.0) / 3.0).floor();
                    same_group.then(|| x.partial_cmp(&y)).flatten()
                }
            }
        }
        let out = partial_sort_by(vec![-2, -1, 1, 2, 3, 4, 5, 6, 7, 8, 9], cmp);
        assert_eq!(out, vec![1, 2, 3, -1, 4, 5, 6, -2, 7, 8, 9]);
    }

    #[test]
    fn two_components() {
        let out = partial_sort_by(vec![-4, -3, -2, -1, 1, 2, 3, 4], |x: &i32, y: &i32| {
            (x.signum() == y.signum()).then(|| x.cmp(y))
        });
        respects(&out, &[&[-4, -3, -2, -1], &[1, 2, 3, 4]]);
    }

    #[test]
    fn connected_but_ambiguous() {
        // 1 2 3 precede everything else, but the chains (4 5 6) and (7 8 9) are
        // independent.
        let out = partial_sort_by((1..=9).collect(), |x, y| {
            let (bx, by) = ((x - 1) / 3, (y - 1) / 3);
            (bx == by || bx == 0 || by == 0).then(|| x.cmp(y))
        });
        respects(&out, &[&[1, 2, 3], &[3, 4, 5, 6], &[3, 7, 8, 9]]);
    }

    #[test]
    fn one_known_pair() {
        for (first, second) in [(3, 1), (1, 3), (0, 4), (4, 0), (2, 2)] {
            let out = partial_sort_by((0..5).collect(), |x: &i32, y: &i32| {
                if (*x, *y) == (first, second) {
                    Some(Ordering::Less)
                } else if (*x, *y) == (second, first) {
                    Some(Ordering::Greater)
                } else {
                    None
                }
            });
            let mut sorted = out.clone();
            sorted.sort();
            assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
            if first != second {
                respects(&out, &[&[first, second]]);
            }
        }
    }

    #[test]
    fn memoized() {
        let mut calls = HashMap::new();
        let outcome = PartialOrderSorter::new((0..20).rev().collect(), |x: &i32, y: &i32| {
            *calls.entry((*x.min(y), *x.max(y))).or_insert(0) += 1;
            Some(x.cmp(y))
        })
        .sort();
        assert_eq!(outcome.order, (0..20).collect::<Vec<_>>());
        assert!(calls.values().all(|&c| c == 1));
        assert_eq!(outcome.stats.comparisons, calls.len());
        // Far fewer than all pairs.
        assert!(outcome.stats.comparisons < 20 * 19 / 2);
    }

    #[test]
    fn cycles_terminate() {
        // Rock, paper, scissors (and a few unrelated items).
        let outcome = PartialOrderSorter::new((0..6).collect(), |x: &i32, y: &i32| {
            match (x, y) {
                (0, 1) | (1, 2) | (2, 0) => Some(Ordering::Less),
                (1, 0) | (2, 1) | (0, 2) => Some(Ordering::Greater),
                _ => None,
            }
        })
        .check_invariants(false)
        .sort();
        let mut sorted = outcome.order.clone();
        sorted.sort();
        assert_eq!(sorted, (0..6).collect::<Vec<_>>());
    }

    /// 3 -> 1 -> 4 -> 3 is a cycle, and 2 precedes 3. Merging {0, 1} with
    /// {2, 3, 4} extracts 3 while 4 is already cached as preceding it.
    fn cyclic_five(x: &i32, y: &i32) -> Option<Ordering> {
        let before = [(3, 1), (1, 4), (2, 3), (4, 3)];
        if before.contains(&(*x, *y)) {
            Some(Ordering::Less)
        } else if before.contains(&(*y, *x)) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }

    #[test]
    #[should_panic(expected = "inconsistent comparisons")]
    fn cycle_is_detected() {
        PartialOrderSorter::new((0..5).collect(), cyclic_five)
            .check_invariants(true)
            .sort();
    }

    #[test]
    fn undetected_cycle_still_sorts() {
        let outcome = PartialOrderSorter::new((0..5).collect(), cyclic_five)
            .check_invariants(false)
            .sort();
        let mut sorted = outcome.order;
        sorted.sort();
        assert_eq!(sorted, (0..5).collect::<Vec<_>>());
    }

    #[test]
    fn forest_dump() {
        let mut sorter = PartialOrderSorter::new(vec![0; 4], |_: &i32, _: &i32| None);
        sorter.make_before(0, 1);
        sorter.make_before(1, 2);
        sorter.make_before(0, 3);
        assert_eq!(sorter.dump_forest(&[0]), "0\n|   1\n|   |   2\n|   3\n");
        // Moving a node detaches it from its old parent.
        sorter.make_before(3, 1);
        assert_eq!(sorter.dump_forest(&[0]), "0\n|   3\n|   |   1\n|   |   |   2\n");
    }

    /// A random DAG on `n` nodes: edges go from earlier to later positions of a
    /// random permutation.
    fn dag() -> impl Strategy<Value = (Vec<usize>, Vec<(usize, usize)>)> {
        (1usize..14).prop_flat_map(|n| {
            let perm = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
            let edges = prop::collection::vec((0..n, 0..n), 0..2 * n);
            (perm, edges).prop_map(|(perm, edges)| {
                let edges = edges
                    .into_iter()
                    .filter(|(i, j)| i < j)
                    .map(|(i, j)| (perm[i], perm[j]))
                    .collect();
                (perm, edges)
            })
        })
    }

    proptest! {
        #[test]
        fn linear_extension((perm, edges) in dag(), reversed in any::<bool>()) {
            let n = perm.len();
            let mut items: Vec<usize> = (0..n).collect();
            if reversed {
                items.reverse();
            }
            let outcome = PartialOrderSorter::new(items, |a: &usize, b: &usize| {
                if edges.contains(&(*a, *b)) {
                    Some(Ordering::Less)
                } else if edges.contains(&(*b, *a)) {
                    Some(Ordering::Greater)
                } else {
                    None
                }
            })
            .check_invariants(true)
            .sort();

            let mut pos = vec![usize::MAX; n];
            for (i, &x) in outcome.order.iter().enumerate() {
                prop_assert_eq!(pos[x], usize::MAX);
                pos[x] = i;
            }
            prop_assert_eq!(outcome.order.len(), n);
            for &(a, b) in &edges {
                prop_assert!(pos[a] < pos[b]);
            }
        }
    }
}
