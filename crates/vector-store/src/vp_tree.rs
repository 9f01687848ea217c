use crate::types::{Neighbor, Point};
use crate::vector::cosine_distance;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Slack applied to pruning bounds so float rounding never drops a true neighbor.
const PRUNE_EPSILON: f32 = 1e-6;

/// Static vantage-point tree over pre-normalized vectors.
///
/// Distances are cosine distances (`1 - dot`). Construction consumes the point
/// list; pass a clone when the original order is still needed.
pub struct VpTree {
    root: Option<Box<VpNode>>,
    len: usize,
}

struct VpNode {
    point: Point,
    /// Median distance from `point` to the rest of its partition.
    threshold: f32,
    /// Points closer than `threshold`.
    left: Option<Box<VpNode>>,
    /// Points at or beyond `threshold`.
    right: Option<Box<VpNode>>,
}

impl VpTree {
    /// Build the tree, taking ownership of `points`.
    ///
    /// The vantage point of each partition is the last element of the list
    /// rather than a random pick, so results are reproducible for a given
    /// input order.
    pub fn new(points: Vec<Point>) -> Self {
        let len = points.len();
        let root = Self::build(points);
        log::debug!("Built VP-tree over {} points", len);
        Self { root, len }
    }

    fn build(mut points: Vec<Point>) -> Option<Box<VpNode>> {
        let vantage = points.pop()?;
        if points.is_empty() {
            return Some(Box::new(VpNode {
                point: vantage,
                threshold: 0.0,
                left: None,
                right: None,
            }));
        }

        let mut by_distance: Vec<(f32, Point)> = points
            .into_iter()
            .map(|p| (cosine_distance(&vantage.embedding, &p.embedding), p))
            .collect();
        by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));

        let median = by_distance.len() / 2;
        let threshold = by_distance[median].0;
        let far = by_distance.split_off(median);

        let near: Vec<Point> = by_distance.into_iter().map(|(_, p)| p).collect();
        let far: Vec<Point> = far.into_iter().map(|(_, p)| p).collect();

        Some(Box::new(VpNode {
            point: vantage,
            threshold,
            left: Self::build(near),
            right: Self::build(far),
        }))
    }

    /// Up to `k` nearest points to `query`, most similar first.
    ///
    /// With `allowed` set, ids outside the set are never returned, though the
    /// search still descends beneath them.
    pub fn k_nearest(
        &self,
        query: &[f32],
        k: usize,
        allowed: Option<&HashSet<String>>,
    ) -> Vec<Neighbor> {
        let Some(root) = self.root.as_deref() else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        let mut best = BestK::new(k);
        search(root, query, allowed, &mut best);

        best.into_sorted()
            .into_iter()
            .map(|hit| Neighbor {
                id: hit.id.to_string(),
                similarity: 1.0 - hit.distance,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn search<'a>(
    node: &'a VpNode,
    query: &[f32],
    allowed: Option<&HashSet<String>>,
    best: &mut BestK<'a>,
) {
    let distance = cosine_distance(query, &node.point.embedding);
    if allowed.map_or(true, |ids| ids.contains(&node.point.id)) {
        best.offer(&node.point.id, distance);
    }

    // Bounds are compared as chord lengths (sqrt(2 * cosine distance)), which
    // obey the triangle inequality on the unit sphere.
    let here = chord(distance);
    let split = chord(node.threshold);

    if distance < node.threshold {
        if let Some(left) = node.left.as_deref() {
            search(left, query, allowed, best);
        }
        let tau = chord(best.worst());
        if here + tau + PRUNE_EPSILON >= split {
            if let Some(right) = node.right.as_deref() {
                search(right, query, allowed, best);
            }
        }
    } else {
        if let Some(right) = node.right.as_deref() {
            search(right, query, allowed, best);
        }
        let tau = chord(best.worst());
        if here - tau - PRUNE_EPSILON < split {
            if let Some(left) = node.left.as_deref() {
                search(left, query, allowed, best);
            }
        }
    }
}

fn chord(distance: f32) -> f32 {
    if distance.is_infinite() {
        return f32::INFINITY;
    }
    (2.0 * distance).max(0.0).sqrt()
}

struct Hit<'a> {
    distance: f32,
    id: &'a str,
}

impl PartialEq for Hit<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Hit<'_> {}

impl PartialOrd for Hit<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hit<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(other.id))
    }
}

/// Bounded max-heap keyed by distance: the root is the worst of the k best.
struct BestK<'a> {
    k: usize,
    heap: BinaryHeap<Hit<'a>>,
}

impl<'a> BestK<'a> {
    fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    /// Worst accepted distance, or infinity while the set is still filling.
    fn worst(&self) -> f32 {
        if self.heap.len() < self.k {
            return f32::INFINITY;
        }
        self.heap.peek().map_or(f32::INFINITY, |hit| hit.distance)
    }

    fn offer(&mut self, id: &'a str, distance: f32) {
        if self.heap.len() < self.k {
            self.heap.push(Hit { distance, id });
        } else if distance < self.worst() {
            self.heap.pop();
            self.heap.push(Hit { distance, id });
        }
    }

    fn into_sorted(self) -> Vec<Hit<'a>> {
        self.heap.into_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::normalize_in_place;

    fn unit(id: &str, raw: &[f32]) -> Point {
        let mut v = raw.to_vec();
        normalize_in_place(&mut v);
        Point::new(id, v)
    }

    fn sample_points() -> Vec<Point> {
        vec![
            unit("x", &[1.0, 0.0, 0.0]),
            unit("xy", &[0.9, 0.1, 0.0]),
            unit("y", &[0.0, 1.0, 0.0]),
            unit("z", &[0.0, 0.0, 1.0]),
            unit("yz", &[0.0, 0.7, 0.7]),
        ]
    }

    #[test]
    fn test_empty_tree() {
        let tree = VpTree::new(Vec::new());
        assert!(tree.is_empty());
        assert!(tree.k_nearest(&[1.0, 0.0], 3, None).is_empty());
    }

    #[test]
    fn test_single_point_tree() {
        let tree = VpTree::new(vec![unit("only", &[0.0, 1.0])]);
        let hits = tree.k_nearest(&[0.0, 1.0], 5, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "only");
        assert!((hits[0].similarity - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_self_query_is_top_hit() {
        let points = sample_points();
        let tree = VpTree::new(points.clone());
        assert_eq!(tree.len(), 5);

        for point in &points {
            let hits = tree.k_nearest(&point.embedding, 2, None);
            assert_eq!(hits[0].id, point.id);
            assert!((hits[0].similarity - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_results_sorted_and_bounded() {
        let tree = VpTree::new(sample_points());
        let hits = tree.k_nearest(&[1.0, 0.0, 0.0], 3, None);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "x");
        assert_eq!(hits[1].id, "xy");
        assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn test_allow_list_excludes_closer_points() {
        let tree = VpTree::new(sample_points());
        let allowed: HashSet<String> = ["y", "z"].iter().map(|s| s.to_string()).collect();
        let hits = tree.k_nearest(&[1.0, 0.0, 0.0], 5, Some(&allowed));

        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| allowed.contains(&h.id)));
    }

    #[test]
    fn test_zero_k() {
        let tree = VpTree::new(sample_points());
        assert!(tree.k_nearest(&[1.0, 0.0, 0.0], 0, None).is_empty());
    }
}
