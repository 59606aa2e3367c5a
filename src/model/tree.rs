//! Best-first CART growth with squared-error impurity
//!
//! The tree lives in a flat node arena. Growth keeps a frontier of leaves
//! that have a valid split and repeatedly expands the one whose split
//! removes the most squared error, until the leaf budget or the frontier is
//! exhausted. `max_depth` only limits which leaves enter the frontier.

use serde::{Deserialize, Serialize};

/// A node of the fitted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Terminal node predicting the mean label of its training rows.
    Leaf {
        /// Predicted value
        value: f64,
        /// Training rows that reached this node
        samples: usize,
    },
    /// Internal node routing `x[feature] <= threshold` to `left`.
    Split {
        /// Feature column index
        feature: usize,
        /// Decision threshold
        threshold: f64,
        /// Arena index of the `<=` child
        left: usize,
        /// Arena index of the `>` child
        right: usize,
        /// Mean label of the training rows at this node
        value: f64,
        /// Training rows that reached this node
        samples: usize,
    },
}

impl Node {
    /// Mean training label at this node.
    #[must_use]
    pub const fn value(&self) -> f64 {
        match self {
            Self::Leaf { value, .. } | Self::Split { value, .. } => *value,
        }
    }

    /// Whether this node is terminal.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }
}

/// Best split found for one node.
#[derive(Debug)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    improvement: f64,
}

/// Leaf awaiting expansion.
#[derive(Debug)]
struct Candidate {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    split: BestSplit,
}

/// Grow a tree over column-major features `x` and labels `y`.
///
/// Callers guarantee `y` is non-empty, every column of `x` has `y.len()`
/// finite values, and `max_leaf_nodes >= 1`.
pub(crate) fn grow(
    x: &[&[f64]],
    y: &[f64],
    max_depth: Option<usize>,
    max_leaf_nodes: usize,
) -> Vec<Node> {
    let rows: Vec<usize> = (0..y.len()).collect();
    let mut nodes = vec![leaf(y, &rows)];
    let mut frontier = Vec::new();
    push_candidate(&mut frontier, x, y, 0, rows, 0, max_depth);

    let mut leaves = 1;
    while leaves < max_leaf_nodes {
        let Some(pos) = best_candidate(&frontier) else {
            break;
        };
        let Candidate {
            node,
            rows,
            depth,
            split,
        } = frontier.remove(pos);

        let column = x[split.feature];
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.iter().copied().partition(|&r| column[r] <= split.threshold);

        let left = nodes.len();
        nodes.push(leaf(y, &left_rows));
        let right = nodes.len();
        nodes.push(leaf(y, &right_rows));

        let value = nodes[node].value();
        nodes[node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            value,
            samples: rows.len(),
        };
        leaves += 1;

        push_candidate(&mut frontier, x, y, left, left_rows, depth + 1, max_depth);
        push_candidate(&mut frontier, x, y, right, right_rows, depth + 1, max_depth);
    }

    nodes
}

/// Route one row through the tree.
pub(crate) fn predict_row(nodes: &[Node], row: impl Fn(usize) -> f64) -> f64 {
    let mut idx = 0;
    loop {
        match &nodes[idx] {
            Node::Leaf { value, .. } => return *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => idx = if row(*feature) <= *threshold { *left } else { *right },
        }
    }
}

/// Depth of the tree (a lone root leaf has depth 0).
pub(crate) fn depth(nodes: &[Node]) -> usize {
    fn walk(nodes: &[Node], idx: usize) -> usize {
        match &nodes[idx] {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
        }
    }
    if nodes.is_empty() {
        0
    } else {
        walk(nodes, 0)
    }
}

fn leaf(y: &[f64], rows: &[usize]) -> Node {
    #[allow(clippy::cast_precision_loss)]
    let value = rows.iter().map(|&r| y[r]).sum::<f64>() / rows.len() as f64;
    Node::Leaf {
        value,
        samples: rows.len(),
    }
}

fn push_candidate(
    frontier: &mut Vec<Candidate>,
    x: &[&[f64]],
    y: &[f64],
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    max_depth: Option<usize>,
) {
    if max_depth.is_some_and(|limit| depth >= limit) {
        return;
    }
    if let Some(split) = find_split(x, y, &rows) {
        frontier.push(Candidate {
            node,
            rows,
            depth,
            split,
        });
    }
}

/// Largest improvement wins; ties go to the earliest candidate.
fn best_candidate(frontier: &[Candidate]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, c) in frontier.iter().enumerate() {
        if best.map_or(true, |b| c.split.improvement > frontier[b].split.improvement) {
            best = Some(i);
        }
    }
    best
}

/// Exhaustive threshold search over every feature.
fn find_split(x: &[&[f64]], y: &[f64], rows: &[usize]) -> Option<BestSplit> {
    const MIN_IMPURITY: f64 = 1e-12;

    if rows.len() < 2 {
        return None;
    }
    let (sum, sq) = rows
        .iter()
        .fold((0.0, 0.0), |(s, q), &r| (s + y[r], q + y[r] * y[r]));
    let parent_sse = sse(sum, sq, rows.len());
    if parent_sse <= MIN_IMPURITY {
        return None;
    }

    let mut best: Option<BestSplit> = None;
    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(rows.len());
    for (feature, column) in x.iter().enumerate() {
        pairs.clear();
        pairs.extend(rows.iter().map(|&r| (column[r], y[r])));
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (mut left_sum, mut left_sq) = (0.0, 0.0);
        for i in 0..pairs.len() - 1 {
            let (xv, yv) = pairs[i];
            left_sum += yv;
            left_sq += yv * yv;
            let next = pairs[i + 1].0;
            if next <= xv {
                continue;
            }
            let n_left = i + 1;
            let n_right = pairs.len() - n_left;
            let child = sse(left_sum, left_sq, n_left)
                + sse(sum - left_sum, sq - left_sq, n_right);
            let improvement = parent_sse - child;

            if best.as_ref().map_or(true, |b| improvement > b.improvement) {
                let mut threshold = xv + (next - xv) / 2.0;
                if threshold >= next {
                    threshold = xv;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    improvement,
                });
            }
        }
    }
    best
}

/// Sum of squared deviations from the mean.
fn sse(sum: f64, sq: f64, n: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = n as f64;
    (sq - sum * sum / n).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_labels_single_leaf() {
        let x = vec![1.0, 2.0, 3.0];
        let nodes = grow(&[&x], &[4.0, 4.0, 4.0], None, 32);
        assert_eq!(nodes.len(), 1);
        assert!((nodes[0].value() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_step_function_split() {
        let x = vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0];
        let y = vec![0.0, 0.0, 0.0, 5.0, 5.0, 5.0];
        let nodes = grow(&[&x], &y, None, 32);
        assert_eq!(nodes.len(), 3);
        match &nodes[0] {
            Node::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, 0);
                assert!((threshold - 6.5).abs() < f64::EPSILON);
            }
            Node::Leaf { .. } => panic!("root should split"),
        }
        assert!((predict_row(&nodes, |_| 2.5) - 0.0).abs() < f64::EPSILON);
        assert!((predict_row(&nodes, |_| 10.5) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_leaf_budget_respected() {
        let x: Vec<f64> = (0..64).map(f64::from).collect();
        let y: Vec<f64> = (0..64).map(|i| f64::from(i * i)).collect();
        let nodes = grow(&[&x], &y, None, 5);
        assert_eq!(nodes.iter().filter(|n| n.is_leaf()).count(), 5);
    }

    #[test]
    fn test_depth_limit_respected() {
        let x: Vec<f64> = (0..64).map(f64::from).collect();
        let y: Vec<f64> = (0..64).map(f64::from).collect();
        let nodes = grow(&[&x], &y, Some(2), 32);
        assert_eq!(depth(&nodes), 2);
        assert_eq!(nodes.iter().filter(|n| n.is_leaf()).count(), 4);
    }

    #[test]
    fn test_duplicate_feature_values_not_split() {
        let x = vec![1.0, 1.0, 1.0];
        let nodes = grow(&[&x], &[1.0, 2.0, 3.0], None, 32);
        assert_eq!(nodes.len(), 1);
    }
}
