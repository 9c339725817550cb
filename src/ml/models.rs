//! ML Model Definitions
//!
//! Concrete predictors rebuilt from exported artifacts. Each model maps a
//! feature vector to a single scalar (a year-over-year delta).

use super::FeatureVector;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scalar predictor capability shared by both forecast targets
pub trait Predictor: Send + Sync {
    /// Predict a value from features
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    /// Number of input features the model was fitted on
    fn n_features(&self) -> usize;

    fn model_type(&self) -> ModelType;
}

/// ML Model Type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    LinearRegression,
    RandomForest,
    GradientBoosting,
}

/// Serialized model as written by the training pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    RandomForest {
        trees: Vec<DecisionTree>,
    },
    GradientBoosting {
        base_score: f64,
        learning_rate: f64,
        trees: Vec<DecisionTree>,
    },
}

impl ModelArtifact {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model artifact {}", path.display()))?;
        serde_json::from_str(&txt)
            .with_context(|| format!("failed to parse model artifact {}", path.display()))
    }

    /// Validate against the expected feature count and build the predictor
    pub fn into_predictor(self, n_features: usize) -> Result<Box<dyn Predictor>> {
        match self {
            ModelArtifact::Linear {
                coefficients,
                intercept,
            } => {
                if coefficients.len() != n_features {
                    anyhow::bail!(
                        "linear model has {} coefficients, feature list has {}",
                        coefficients.len(),
                        n_features
                    );
                }
                Ok(Box::new(LinearRegressionModel::new(coefficients, intercept)))
            }
            ModelArtifact::RandomForest { trees } => Ok(Box::new(TreeEnsembleModel::new(
                ModelType::RandomForest,
                trees,
                0.0,
                1.0,
                n_features,
            )?)),
            ModelArtifact::GradientBoosting {
                base_score,
                learning_rate,
                trees,
            } => Ok(Box::new(TreeEnsembleModel::new(
                ModelType::GradientBoosting,
                trees,
                base_score,
                learning_rate,
                n_features,
            )?)),
        }
    }
}

fn check_len(features: &FeatureVector, expected: usize) -> Result<()> {
    if features.len() != expected {
        anyhow::bail!(
            "Feature count mismatch: expected {}, got {}",
            expected,
            features.len()
        );
    }
    Ok(())
}

/// Linear model (ordinary least squares, ridge, lasso share this form)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressionModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegressionModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    /// Model that ignores its inputs and always returns `value`
    pub fn constant(n_features: usize, value: f64) -> Self {
        Self::new(vec![0.0; n_features], value)
    }
}

impl Predictor for LinearRegressionModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        check_len(features, self.coefficients.len())?;

        Ok(features
            .features
            .iter()
            .zip(self.coefficients.iter())
            .map(|(f, c)| f * c)
            .sum::<f64>()
            + self.intercept)
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn model_type(&self) -> ModelType {
        ModelType::LinearRegression
    }
}

/// Node of a flattened regression tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// `x[feature] <= threshold` goes to `left`, otherwise `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Children must come after their parent, which rules out cycles.
    fn validate(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            anyhow::bail!("tree has no nodes");
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = *node
            {
                if feature >= n_features {
                    anyhow::bail!(
                        "node {} splits on feature {} but only {} features exist",
                        idx,
                        feature,
                        n_features
                    );
                }
                for child in [left, right] {
                    if child <= idx || child >= self.nodes.len() {
                        anyhow::bail!("node {} has invalid child index {}", idx, child);
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

/// Random forest (mean of trees) or gradient boosting (base + lr * sum of trees)
#[derive(Debug, Clone)]
pub struct TreeEnsembleModel {
    model_type: ModelType,
    trees: Vec<DecisionTree>,
    base_score: f64,
    learning_rate: f64,
    n_features: usize,
}

impl TreeEnsembleModel {
    pub fn new(
        model_type: ModelType,
        trees: Vec<DecisionTree>,
        base_score: f64,
        learning_rate: f64,
        n_features: usize,
    ) -> Result<Self> {
        if trees.is_empty() {
            anyhow::bail!("{:?} model has no trees", model_type);
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(n_features)
                .with_context(|| format!("invalid tree {}", i))?;
        }
        Ok(Self {
            model_type,
            trees,
            base_score,
            learning_rate,
            n_features,
        })
    }
}

impl Predictor for TreeEnsembleModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        check_len(features, self.n_features)?;

        let sum: f64 = self
            .trees
            .iter()
            .map(|t| t.evaluate(&features.features))
            .sum();

        Ok(match self.model_type {
            ModelType::GradientBoosting => self.base_score + self.learning_rate * sum,
            _ => sum / self.trees.len() as f64,
        })
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn model_type(&self) -> ModelType {
        self.model_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(values: Vec<f64>) -> FeatureVector {
        let names = (0..values.len()).map(|i| format!("f{}", i)).collect();
        FeatureVector::new(values, names).unwrap()
    }

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: low },
                TreeNode::Leaf { value: high },
            ],
        }
    }

    #[test]
    fn test_linear_regression_predict() {
        let model = LinearRegressionModel::new(vec![2.0, 3.0, 1.0], 5.0);
        // 2*1 + 3*2 + 1*3 + 5 = 16
        assert_eq!(model.predict(&fv(vec![1.0, 2.0, 3.0])).unwrap(), 16.0);
    }

    #[test]
    fn test_linear_regression_rejects_wrong_length() {
        let model = LinearRegressionModel::constant(2, 1.0);
        assert!(model.predict(&fv(vec![1.0])).is_err());
    }

    #[test]
    fn test_random_forest_is_mean_of_trees() {
        let model = TreeEnsembleModel::new(
            ModelType::RandomForest,
            vec![stump(0, 0.5, 1.0, 3.0), stump(1, 10.0, 2.0, 4.0)],
            0.0,
            1.0,
            2,
        )
        .unwrap();

        // tree 1: 0.2 <= 0.5 -> 1.0; tree 2: 20 > 10 -> 4.0
        assert_eq!(model.predict(&fv(vec![0.2, 20.0])).unwrap(), 2.5);
    }

    #[test]
    fn test_gradient_boosting_adds_scaled_sum() {
        let model = TreeEnsembleModel::new(
            ModelType::GradientBoosting,
            vec![stump(0, 0.5, -1.0, 1.0), stump(0, 0.5, -1.0, 1.0)],
            0.5,
            0.1,
            1,
        )
        .unwrap();

        let pred = model.predict(&fv(vec![0.9])).unwrap();
        assert!((pred - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_tree_validation_rejects_backward_child() {
        let tree = DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 1,
                },
                TreeNode::Leaf { value: 1.0 },
            ],
        };
        assert!(TreeEnsembleModel::new(ModelType::RandomForest, vec![tree], 0.0, 1.0, 1).is_err());
    }

    #[test]
    fn test_tree_validation_rejects_unknown_feature() {
        let err = TreeEnsembleModel::new(
            ModelType::RandomForest,
            vec![stump(3, 0.0, 0.0, 1.0)],
            0.0,
            1.0,
            2,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_artifact_from_json() {
        let json = r#"{
            "kind": "gradient_boosting",
            "base_score": 0.0,
            "learning_rate": 1.0,
            "trees": [{"nodes": [
                {"type": "split", "feature": 0, "threshold": 1.0, "left": 1, "right": 2},
                {"type": "leaf", "value": -0.5},
                {"type": "leaf", "value": 0.5}
            ]}]
        }"#;
        let artifact: ModelArtifact = serde_json::from_str(json).unwrap();
        let model = artifact.into_predictor(1).unwrap();
        assert_eq!(model.model_type(), ModelType::GradientBoosting);
        assert_eq!(model.predict(&fv(vec![2.0])).unwrap(), 0.5);
    }

    #[test]
    fn test_linear_artifact_coefficient_mismatch() {
        let artifact = ModelArtifact::Linear {
            coefficients: vec![1.0, 2.0],
            intercept: 0.0,
        };
        assert!(artifact.into_predictor(3).is_err());
    }
}
