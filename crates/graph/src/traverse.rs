use petgraph::visit::IntoNeighbors;
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Breadth-first walk from `start`, adding every newly reached node to `reached`.
///
/// Nodes already in `reached` are not expanded again, so cycles and
/// previously connected subtrees terminate the walk.
pub(crate) fn mark_reachable<G>(graph: G, start: G::NodeId, reached: &mut HashSet<G::NodeId>)
where
    G: IntoNeighbors,
    G::NodeId: Hash + Eq,
{
    reached.insert(start);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for next in graph.neighbors(current) {
            if reached.insert(next) {
                queue.push_back(next);
            }
        }
    }
}
