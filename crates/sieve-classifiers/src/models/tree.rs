//! Decision tree classifier grown with the entropy criterion.

use ndarray::{Array1, Array2};

use crate::data_handling::class_label;
use crate::error::{EvalError, Result};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::utils::{check_columns, check_rows, majority_label, sorted_classes};

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        label: i64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

pub struct DecisionTreeClassifier {
    max_depth: usize,
    root: Option<TreeNode>,
    n_features: usize,
}

fn entropy_of_counts(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

impl DecisionTreeClassifier {
    pub fn new(max_depth: usize) -> Self {
        DecisionTreeClassifier {
            max_depth,
            root: None,
            n_features: 0,
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map(walk).unwrap_or(0)
    }

    /// Best (feature, threshold, gain) over all midpoints between distinct
    /// values; the first best wins ties. Zero-gain splits are allowed.
    fn best_split(
        &self,
        x: &Array2<f64>,
        labels: &[usize],
        n_classes: usize,
        indices: &[usize],
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len();
        let mut parent_counts = vec![0usize; n_classes];
        for &i in indices {
            parent_counts[labels[i]] += 1;
        }
        let parent_entropy = entropy_of_counts(&parent_counts, n);

        let mut best: Option<(usize, f64, f64)> = None;
        for feature in 0..x.ncols() {
            let mut order = indices.to_vec();
            order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

            let mut left_counts = vec![0usize; n_classes];
            for pos in 0..n - 1 {
                left_counts[labels[order[pos]]] += 1;
                let current = x[[order[pos], feature]];
                let next = x[[order[pos + 1], feature]];
                if current == next {
                    continue;
                }
                let n_left = pos + 1;
                let n_right = n - n_left;
                let right_counts: Vec<usize> = parent_counts
                    .iter()
                    .zip(left_counts.iter())
                    .map(|(p, l)| p - l)
                    .collect();
                let child_entropy = (n_left as f64 * entropy_of_counts(&left_counts, n_left)
                    + n_right as f64 * entropy_of_counts(&right_counts, n_right))
                    / n as f64;
                let gain = parent_entropy - child_entropy;
                if best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature, (current + next) / 2.0, gain));
                }
            }
        }
        best
    }

    fn grow(
        &self,
        x: &Array2<f64>,
        labels: &[usize],
        classes: &[i64],
        indices: Vec<usize>,
        depth: usize,
    ) -> TreeNode {
        let leaf = || TreeNode::Leaf {
            label: majority_label(indices.iter().map(|&i| classes[labels[i]])),
        };

        let first = labels[indices[0]];
        let pure = indices.iter().all(|&i| labels[i] == first);
        if pure || depth >= self.max_depth || indices.len() < 2 {
            return leaf();
        }

        match self.best_split(x, labels, classes.len(), &indices) {
            Some((feature, threshold, gain)) => {
                log::trace!(
                    "depth {}: split feature {} at {:.4} (gain {:.4})",
                    depth,
                    feature,
                    threshold,
                    gain
                );
                let (left, right): (Vec<usize>, Vec<usize>) =
                    indices.iter().copied().partition(|&i| x[[i, feature]] <= threshold);
                TreeNode::Split {
                    feature,
                    threshold,
                    left: Box::new(self.grow(x, labels, classes, left, depth + 1)),
                    right: Box::new(self.grow(x, labels, classes, right, depth + 1)),
                }
            }
            None => leaf(),
        }
    }
}

impl ClassifierModel for DecisionTreeClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_rows(x, y)?;
        let classes = sorted_classes(y);
        let labels: Vec<usize> = y
            .iter()
            .map(|&v| {
                let label = class_label(v);
                classes.iter().position(|&c| c == label).unwrap_or(0)
            })
            .collect();

        self.n_features = x.ncols();
        self.root = Some(self.grow(x, &labels, &classes, (0..x.nrows()).collect(), 0));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| EvalError::InvalidConfig("decision tree used before fit".to_string()))?;
        check_columns(self.n_features, x)?;

        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                let mut node = root;
                loop {
                    match node {
                        TreeNode::Leaf { label } => break *label as f64,
                        TreeNode::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        } => {
                            node = if row[*feature] <= *threshold {
                                left.as_ref()
                            } else {
                                right.as_ref()
                            };
                        }
                    }
                }
            })
            .collect())
    }

    fn name(&self) -> &str {
        "tree"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_tree_learns_threshold() {
        let x = array![[1.0, 5.0], [2.0, 3.0], [3.0, 4.0], [7.0, 5.0], [8.0, 3.0], [9.0, 4.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut tree = DecisionTreeClassifier::new(3);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.predict(&array![[4.0, 0.0], [6.0, 9.0]]).unwrap().to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_tree_respects_max_depth() {
        // XOR needs two levels
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 1.0, 1.0, 0.0];
        let mut stump = DecisionTreeClassifier::new(1);
        stump.fit(&x, &y).unwrap();
        assert!(stump.depth() <= 1);

        let mut deep = DecisionTreeClassifier::new(4);
        deep.fit(&x, &y).unwrap();
        assert_eq!(deep.predict(&x).unwrap(), y);
    }
}
