//! Exact path-dependent Shapley values for tree ensembles
//!
//! Polynomial-time TreeSHAP: each tree is walked once per explained row while
//! a path of (feature, zero-fraction, one-fraction, weight) elements tracks the
//! proportion of feature subsets flowing down each branch. Contributions are
//! in margin space and satisfy local accuracy:
//!
//! `base_value + Σ contributions == predict_margin(x)`

use super::tree::{CompiledTree, Node, TreeEnsemble};
use super::ModelError;

/// Per-feature contributions for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapValues {
    /// Expected margin over the training distribution
    pub base_value: f64,
    /// One value per model feature, in model order
    pub contributions: Vec<f64>,
}

impl ShapValues {
    /// `base_value + Σ contributions`; equals the explained margin.
    pub fn reconstructed(&self) -> f64 {
        self.base_value + self.contributions.iter().sum::<f64>()
    }
}

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

impl TreeEnsemble {
    /// Exact Shapley attribution of `predict_margin(x)`.
    pub fn shap_values(&self, x: &[f64]) -> Result<ShapValues, ModelError> {
        let n = self.feature_names().len();
        if x.len() != n {
            return Err(ModelError::FeatureCountMismatch {
                expected: n,
                actual: x.len(),
            });
        }

        let mut phi = vec![0.0; n];
        for tree in &self.trees {
            recurse(tree, x, &mut phi, 0, Vec::new(), 1.0, 1.0, None);
        }

        if let Some(bad) = phi.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::Inference(format!(
                "non-finite attribution for feature '{}'",
                self.feature_names()[bad]
            )));
        }

        Ok(ShapValues {
            base_value: self.expected_margin(),
            contributions: phi,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &CompiledTree,
    x: &[f64],
    phi: &mut [f64],
    node: usize,
    mut path: Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    match &tree.nodes[node] {
        Node::Leaf { value, .. } => {
            for i in 1..path.len() {
                let weight = unwound_path_sum(&path, i);
                let el = path[i];
                if let Some(f) = el.feature {
                    phi[f] += weight * (el.one_fraction - el.zero_fraction) * value;
                }
            }
        }
        Node::Split {
            feature: split,
            threshold,
            left,
            right,
            default_left,
        } => {
            let (hot, cold) = if CompiledTree::goes_left(x, *split, *threshold, *default_left) {
                (*left, *right)
            } else {
                (*right, *left)
            };
            let cover = tree.covers[node];
            let hot_zero = tree.covers[hot] / cover;
            let cold_zero = tree.covers[cold] / cover;

            // A feature split on twice along one path keeps a single element.
            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;
            if let Some(k) = (1..path.len()).find(|&k| path[k].feature == Some(*split)) {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                unwind_path(&mut path, k);
            }

            recurse(
                tree,
                x,
                phi,
                hot,
                path.clone(),
                hot_zero * incoming_zero,
                incoming_one,
                Some(*split),
            );
            recurse(
                tree,
                x,
                phi,
                cold,
                path,
                cold_zero * incoming_zero,
                0.0,
                Some(*split),
            );
        }
    }
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / denom;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, k: usize) {
    let depth = path.len() - 1;
    let one = path[k].one_fraction;
    let zero = path[k].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next = path[depth].pweight;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next * denom / ((i + 1) as f64 * one);
            next = tmp - path[i].pweight * zero * (depth - i) as f64 / denom;
        } else {
            path[i].pweight = path[i].pweight * denom / (zero * (depth - i) as f64);
        }
    }

    for i in k..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with element `k` removed.
fn unwound_path_sum(path: &[PathElement], k: usize) -> f64 {
    let depth = path.len() - 1;
    let one = path[k].one_fraction;
    let zero = path[k].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = next * denom / ((i + 1) as f64 * one);
            total += tmp;
            next = path[i].pweight - tmp * zero * (depth - i) as f64 / denom;
        } else if zero != 0.0 {
            total += (path[i].pweight / zero) / ((depth - i) as f64 / denom);
        }
    }
    total
}
