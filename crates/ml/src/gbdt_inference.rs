// Native gradient-boosted tree inference.
//
// Parses the LightGBM text model format (`booster.save_model()`) and
// evaluates the trees directly. Used as the built-in forecasting backend:
// the model's features are the values of the input window, oldest first.

use std::path::Path;

use stockcast_core::error::{Result, StockcastError};
use stockcast_core::traits::PriceModel;

#[derive(Debug, Clone)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(f64),
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf(val) => return *val,
                TreeNode::Split { feature, threshold, left, right } => {
                    // Missing features fall to the left, like a NaN with default_left.
                    let fval = features.get(*feature).copied().unwrap_or(f64::NAN);
                    idx = if fval.is_nan() || fval <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Tree ensemble loaded from LightGBM text format.
#[derive(Debug, Clone)]
pub struct GbdtModel {
    trees: Vec<Tree>,
    sigmoid: bool,
    max_feature_idx: usize,
    feature_names: Vec<String>,
}

impl GbdtModel {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                StockcastError::ArtifactNotFound(format!("model {}", path.display()))
            }
            _ => StockcastError::Io(format!("{}: {}", path.display(), e)),
        })?;
        let model = Self::parse(&content)?;
        tracing::info!(
            "GBDT model loaded from {}: trees={}, features={}",
            path.display(),
            model.num_trees(),
            model.num_features()
        );
        Ok(model)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut sigmoid = false;
        let mut max_feature_idx = 0usize;
        let mut feature_names = Vec::new();
        let mut trees = Vec::new();

        let lines: Vec<&str> = content.lines().collect();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i].trim();

            if let Some(v) = line.strip_prefix("objective=") {
                sigmoid = v.starts_with("binary");
            } else if let Some(v) = line.strip_prefix("max_feature_idx=") {
                max_feature_idx = v.parse().unwrap_or(0);
            } else if let Some(v) = line.strip_prefix("feature_names=") {
                feature_names = v.split_whitespace().map(|s| s.to_string()).collect();
            } else if line.starts_with("Tree=") {
                i += 1;
                trees.push(Self::parse_tree(&lines, &mut i)?);
                continue;
            }

            i += 1;
        }

        if trees.is_empty() {
            return Err(StockcastError::ModelError("no trees found in model file".into()));
        }

        Ok(Self { trees, sigmoid, max_feature_idx, feature_names })
    }

    fn parse_tree(lines: &[&str], i: &mut usize) -> Result<Tree> {
        let mut num_leaves = 0usize;
        let mut split_feature: Vec<usize> = Vec::new();
        let mut threshold: Vec<f64> = Vec::new();
        let mut left_child: Vec<i64> = Vec::new();
        let mut right_child: Vec<i64> = Vec::new();
        let mut leaf_value: Vec<f64> = Vec::new();

        fn numbers<T: std::str::FromStr>(v: &str) -> Vec<T> {
            v.split_whitespace().filter_map(|s| s.parse().ok()).collect()
        }

        while *i < lines.len() {
            let line = lines[*i].trim();

            if line.is_empty() || line.starts_with("Tree=") || line == "end of trees" {
                break;
            }

            if let Some(v) = line.strip_prefix("num_leaves=") {
                num_leaves = v.parse().unwrap_or(0);
            } else if let Some(v) = line.strip_prefix("split_feature=") {
                split_feature = numbers(v);
            } else if let Some(v) = line.strip_prefix("threshold=") {
                threshold = numbers(v);
            } else if let Some(v) = line.strip_prefix("left_child=") {
                left_child = numbers(v);
            } else if let Some(v) = line.strip_prefix("right_child=") {
                right_child = numbers(v);
            } else if let Some(v) = line.strip_prefix("leaf_value=") {
                leaf_value = numbers(v);
            }

            *i += 1;
        }

        if num_leaves == 0 || leaf_value.len() != num_leaves {
            return Err(StockcastError::ModelError(format!(
                "malformed tree: num_leaves={} but {} leaf values",
                num_leaves,
                leaf_value.len()
            )));
        }

        // Internal nodes first, then leaves. A negative child -(k+1) is leaf k.
        let num_internal = num_leaves - 1;
        if split_feature.len() < num_internal
            || threshold.len() < num_internal
            || left_child.len() < num_internal
            || right_child.len() < num_internal
        {
            return Err(StockcastError::ModelError(
                "malformed tree: missing split arrays".into(),
            ));
        }

        // Internal children must point forward, so evaluation always reaches a leaf.
        let child = |parent: usize, c: i64| -> Result<usize> {
            let idx = if c < 0 {
                num_internal + (-c - 1) as usize
            } else if (c as usize) <= parent {
                return Err(StockcastError::ModelError(format!(
                    "node {} points back to node {}",
                    parent, c
                )));
            } else {
                c as usize
            };
            if idx >= num_internal + num_leaves {
                return Err(StockcastError::ModelError(format!("child index {} out of range", c)));
            }
            Ok(idx)
        };

        let mut nodes = Vec::with_capacity(num_internal + num_leaves);
        for j in 0..num_internal {
            nodes.push(TreeNode::Split {
                feature: split_feature[j],
                threshold: threshold[j],
                left: child(j, left_child[j])?,
                right: child(j, right_child[j])?,
            });
        }
        nodes.extend(leaf_value.into_iter().map(TreeNode::Leaf));

        Ok(Tree { nodes })
    }

    /// Sum of tree outputs (leaf values already include shrinkage).
    pub fn raw_score(&self, features: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict(features)).sum()
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn num_features(&self) -> usize {
        if self.feature_names.is_empty() {
            self.max_feature_idx + 1
        } else {
            self.feature_names.len()
        }
    }
}

impl PriceModel for GbdtModel {
    fn name(&self) -> &str {
        "gbdt"
    }

    fn predict(&self, window: &[f64]) -> Result<f64> {
        if window.len() != self.num_features() {
            return Err(StockcastError::ModelError(format!(
                "model expects {} inputs, got a window of {}",
                self.num_features(),
                window.len()
            )));
        }
        let raw = self.raw_score(window);
        Ok(if self.sigmoid { 1.0 / (1.0 + (-raw).exp()) } else { raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const REGRESSION_MODEL: &str = r#"tree
version=v4
num_class=1
num_tree_per_iteration=1
label_index=0
max_feature_idx=1
objective=regression
feature_names=t0 t1

Tree=0
num_leaves=3
num_cat=0
split_feature=1 0
split_gain=10 5
threshold=0.5 0.25
decision_type=2 2
left_child=1 -1
right_child=-3 -2
leaf_value=0.1 0.3 0.8
leaf_weight=10 10 10
leaf_count=10 10 10
shrinkage=0.1

Tree=1
num_leaves=1
num_cat=0
leaf_value=0.05
shrinkage=0.1

end of trees
"#;

    #[test]
    fn test_parse_regression_model() {
        let model = GbdtModel::parse(REGRESSION_MODEL).unwrap();
        assert_eq!(model.num_trees(), 2);
        assert_eq!(model.num_features(), 2);
        assert!(!model.sigmoid);

        // t1 > 0.5 → leaf 2
        assert_abs_diff_eq!(model.predict(&[0.0, 0.9]).unwrap(), 0.85, epsilon = 1e-12);
        // t1 <= 0.5, t0 <= 0.25 → leaf 0
        assert_abs_diff_eq!(model.predict(&[0.1, 0.2]).unwrap(), 0.15, epsilon = 1e-12);
        // t1 <= 0.5, t0 > 0.25 → leaf 1
        assert_abs_diff_eq!(model.predict(&[0.4, 0.2]).unwrap(), 0.35, epsilon = 1e-12);
    }

    #[test]
    fn test_window_length_mismatch() {
        let model = GbdtModel::parse(REGRESSION_MODEL).unwrap();
        assert!(model.predict(&[0.1, 0.2, 0.3]).is_err());
    }

    #[test]
    fn test_binary_objective_applies_sigmoid() {
        let text = REGRESSION_MODEL.replace("objective=regression", "objective=binary sigmoid:1");
        let model = GbdtModel::parse(&text).unwrap();
        let p = model.predict(&[0.0, 0.9]).unwrap();
        assert_abs_diff_eq!(p, 1.0 / (1.0 + (-0.85f64).exp()), epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_cyclic_tree() {
        let looping = REGRESSION_MODEL.replace("left_child=1 -1", "left_child=1 0");
        let err = GbdtModel::parse(&looping).unwrap_err();
        assert!(err.to_string().contains("points back"), "{}", err);

        let self_loop = REGRESSION_MODEL.replace("left_child=1 -1", "left_child=0 -1");
        assert!(matches!(GbdtModel::parse(&self_loop), Err(StockcastError::ModelError(_))));
    }

    #[test]
    fn test_no_trees() {
        assert!(GbdtModel::parse("tree\nversion=v4\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = GbdtModel::load("/nonexistent/model.txt").unwrap_err();
        assert!(matches!(err, StockcastError::ArtifactNotFound(_)));
    }
}
