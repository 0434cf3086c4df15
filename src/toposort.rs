//! Depth-ranked topological ordering.
//!
//! Every node is walked through its dependency closure and remembers the
//! deepest position at which any walk reached it. Sorting by that depth,
//! deepest first, places every dependency before its dependents: if `a`
//! depends on `b`, any walk through `a` reaches `b` one hop further.
//!
//! Walks are capped at [`MAX_DEPTH`] hops. A dependency cycle keeps pushing
//! the depth up until the cap is hit, which is the only way cycles are
//! detected. A genuine acyclic chain longer than the cap fails the same way.

use std::hash::Hash;

use indexmap::IndexMap;

use crate::error::RecursionError;

/// Hop cap for dependency walks.
pub const MAX_DEPTH: usize = 128;

/// Order `nodes` so that every dependency precedes its dependents.
///
/// `dependencies` maps a node to its direct dependencies. Dependencies that
/// are not among `nodes` are still ordered and included in the output.
/// Nodes at the same depth keep the order in which they were first reached.
pub fn topological_sort<T, F, I>(
    nodes: impl IntoIterator<Item = T>,
    dependencies: F,
) -> Result<Vec<T>, RecursionError>
where
    T: Clone + Eq + Hash,
    F: Fn(&T) -> I,
    I: IntoIterator<Item = T>,
{
    let mut depths: IndexMap<T, usize> = IndexMap::new();
    for node in nodes {
        walk(node, 0, &dependencies, &mut depths)?;
    }

    let mut ranked: Vec<(T, usize)> = depths.into_iter().collect();
    // Stable sort keeps discovery order within a depth level.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(ranked.into_iter().map(|(node, _)| node).collect())
}

fn walk<T, F, I>(
    node: T,
    depth: usize,
    dependencies: &F,
    depths: &mut IndexMap<T, usize>,
) -> Result<(), RecursionError>
where
    T: Clone + Eq + Hash,
    F: Fn(&T) -> I,
    I: IntoIterator<Item = T>,
{
    if depth > MAX_DEPTH {
        return Err(RecursionError { limit: MAX_DEPTH });
    }

    match depths.get_mut(&node) {
        // Already walked at least this deep, so its dependencies are too.
        Some(known) if *known >= depth => return Ok(()),
        Some(known) => *known = depth,
        None => {
            depths.insert(node.clone(), depth);
        }
    }

    for dependency in dependencies(&node) {
        walk(dependency, depth + 1, dependencies, depths)?;
    }
    Ok(())
}
