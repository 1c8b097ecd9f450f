//! Gradient-boosted regression trees over lag features
//!
//! Each training row holds the series value at a set of lags plus the
//! position in the weekly cycle; the target is the value itself. Trees are
//! fitted to the residuals of the running ensemble with squared-error splits.
//! Forecasting is recursive: every prediction is fed back as a lag for the
//! next step.

use crate::config::{BoostingParams, ForecastConfig};
use crate::series::rmse;
use crate::strategy::{ForecastStrategy, Projection, Unavailable, with_confidence_band};
use crate::types::ForecastMethod;
use tracing::debug;

const WEEK: usize = 7;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { &**left } else { &**right };
                }
            }
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn sum_sq(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((0.0, 0.0), |(s, sq), v| (s + v, sq + v * v))
}

fn find_split(
    rows: &[Vec<f64>],
    residuals: &[f64],
    indices: &[usize],
    min_leaf: usize,
) -> Option<BestSplit> {
    let n = indices.len();
    if n < 2 * min_leaf {
        return None;
    }
    let (total, total_sq) = sum_sq(indices.iter().map(|&i| residuals[i]));
    let parent_sse = total_sq - total * total / n as f64;
    let feature_count = rows.first().map_or(0, Vec::len);

    let mut best: Option<BestSplit> = None;
    let mut order = indices.to_vec();
    for feature in 0..feature_count {
        order.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));

        let (mut left_sum, mut left_sq) = (0.0, 0.0);
        for split_at in 1..n {
            let r = residuals[order[split_at - 1]];
            left_sum += r;
            left_sq += r * r;

            let here = rows[order[split_at - 1]][feature];
            let next = rows[order[split_at]][feature];
            if split_at < min_leaf || n - split_at < min_leaf || here == next {
                continue;
            }

            let left_n = split_at as f64;
            let right_n = (n - split_at) as f64;
            let right_sum = total - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);
            let gain = parent_sse - sse;

            if gain > 1e-12 && best.as_ref().is_none_or(|b| gain > b.gain) {
                best = Some(BestSplit {
                    feature,
                    threshold: (here + next) / 2.0,
                    gain,
                });
            }
        }
    }
    best
}

fn build_tree(
    rows: &[Vec<f64>],
    residuals: &[f64],
    indices: &[usize],
    depth: usize,
    params: &BoostingParams,
) -> Node {
    let mean = indices.iter().map(|&i| residuals[i]).sum::<f64>() / indices.len().max(1) as f64;
    if depth >= params.max_depth {
        return Node::Leaf(mean);
    }
    let Some(split) = find_split(rows, residuals, indices, params.min_samples_leaf) else {
        return Node::Leaf(mean);
    };

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| rows[i][split.feature] <= split.threshold);

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(build_tree(rows, residuals, &left, depth + 1, params)),
        right: Box::new(build_tree(rows, residuals, &right, depth + 1, params)),
    }
}

/// Additive ensemble of shallow regression trees
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoostedTrees {
    base: f64,
    learning_rate: f64,
    trees: Vec<Node>,
}

impl GradientBoostedTrees {
    /// Fit the ensemble to `(rows, targets)`
    ///
    /// Training stops early once the training RMSE has not improved for
    /// `early_stopping_rounds` rounds; the ensemble is cut back to the best
    /// round.
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], params: &BoostingParams) -> Self {
        let n = targets.len();
        let base = if n == 0 {
            0.0
        } else {
            targets.iter().sum::<f64>() / n as f64
        };
        let mut model = Self {
            base,
            learning_rate: params.learning_rate,
            trees: Vec::with_capacity(params.rounds),
        };

        let indices: Vec<usize> = (0..n).collect();
        let mut predictions = vec![base; n];
        let mut best_rmse = rmse(targets, &predictions);
        let mut best_round = 0;

        for round in 1..=params.rounds {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(y, p)| y - p)
                .collect();
            let tree = build_tree(rows, &residuals, &indices, 0, params);
            for (prediction, row) in predictions.iter_mut().zip(rows) {
                *prediction += params.learning_rate * tree.predict(row);
            }
            model.trees.push(tree);

            let current = rmse(targets, &predictions);
            if current < best_rmse {
                best_rmse = current;
                best_round = round;
            } else if round - best_round >= params.early_stopping_rounds {
                debug!("Early stopping at round {} (best {})", round, best_round);
                break;
            }
        }

        model.trees.truncate(best_round);
        model
    }

    /// Predict one row
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.base
            + self.learning_rate * self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    /// Number of trees kept after early stopping
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Regression forecast over lag and weekly-cycle features
#[derive(Debug, Clone)]
pub struct RegressionStrategy {
    model: GradientBoostedTrees,
    lags: Vec<usize>,
    tail: Vec<f64>,
    history_len: usize,
    training_rmse: f64,
}

impl RegressionStrategy {
    fn features(window: &[f64], lags: &[usize], position: usize) -> Vec<f64> {
        let mut row: Vec<f64> = lags
            .iter()
            .map(|&lag| {
                window
                    .len()
                    .checked_sub(lag)
                    .map_or_else(|| window.first().copied().unwrap_or(0.0), |i| window[i])
            })
            .collect();
        row.push((position % WEEK) as f64);
        row
    }

    /// Train on a gap-filled series
    pub fn train(values: &[f64], config: &ForecastConfig) -> Result<Self, Unavailable> {
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(Unavailable::Training(format!(
                "non-finite value {bad} in history"
            )));
        }

        let n = values.len();
        let lags = config.lags_for(n).to_vec();
        let max_lag = lags.iter().copied().max().unwrap_or(1);

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in max_lag..n {
            rows.push(Self::features(&values[..i], &lags, i));
            targets.push(values[i]);
        }
        if rows.len() < config.min_training_rows {
            return Err(Unavailable::InsufficientSamples {
                rows: rows.len(),
                required: config.min_training_rows,
            });
        }

        let model = GradientBoostedTrees::fit(&rows, &targets, &config.boosting);
        let fitted: Vec<f64> = rows.iter().map(|r| model.predict(r)).collect();
        let training_rmse = rmse(&targets, &fitted);
        if !training_rmse.is_finite() {
            return Err(Unavailable::Training(
                "training error is not finite".to_string(),
            ));
        }

        debug!(
            "Trained {} trees on {} rows, training RMSE {:.4}",
            model.num_trees(),
            rows.len(),
            training_rmse
        );

        Ok(Self {
            model,
            lags,
            tail: values[n - max_lag.min(n)..].to_vec(),
            history_len: n,
            training_rmse,
        })
    }

    /// RMSE of the fitted model on its own training rows
    pub fn training_rmse(&self) -> f64 {
        self.training_rmse
    }
}

impl ForecastStrategy for RegressionStrategy {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::MlModel
    }

    fn project(&self, horizon: usize) -> Vec<Projection> {
        let mut window = self.tail.clone();
        let mut points = Vec::with_capacity(horizon);
        for step in 0..horizon {
            let row = Self::features(&window, &self.lags, self.history_len + step);
            let prediction = self.model.predict(&row).max(0.0);
            points.push(prediction);
            window.push(prediction);
        }
        with_confidence_band(&points, self.training_rmse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekly_series(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + i as f64 + if i % 7 >= 5 { -20.0 } else { 0.0 })
            .collect()
    }

    #[test]
    fn test_tree_learns_step_function() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i)]).collect();
        let targets: Vec<f64> = (0..20).map(|i| if i < 10 { 0.0 } else { 10.0 }).collect();
        let params = BoostingParams {
            rounds: 200,
            learning_rate: 0.3,
            ..BoostingParams::default()
        };
        let model = GradientBoostedTrees::fit(&rows, &targets, &params);

        assert!(model.predict(&[2.0]) < 1.0);
        assert!(model.predict(&[15.0]) > 9.0);
    }

    #[test]
    fn test_constant_target_stops_early() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i)]).collect();
        let model = GradientBoostedTrees::fit(&rows, &[5.0; 20], &BoostingParams::default());

        assert_eq!(model.num_trees(), 0);
        assert_eq!(model.predict(&[3.0]), 5.0);
    }

    #[test]
    fn test_training_reduces_error() {
        let values = weekly_series(40);
        let strategy = RegressionStrategy::train(&values, &ForecastConfig::default()).unwrap();
        let baseline = crate::series::std_dev(&values[14..]);

        assert!(strategy.training_rmse() < baseline);
    }

    #[test]
    fn test_projection_is_non_negative_and_ordered() {
        let values = weekly_series(45);
        let strategy = RegressionStrategy::train(&values, &ForecastConfig::default()).unwrap();
        let projected = strategy.project(14);

        assert_eq!(projected.len(), 14);
        assert_eq!(strategy.method(), ForecastMethod::MlModel);
        for point in &projected {
            assert!(point.lower_bound >= 0.0);
            assert!(point.lower_bound <= point.value);
            assert!(point.value <= point.upper_bound);
        }
    }

    #[test]
    fn test_too_few_rows_is_unavailable() {
        // 20 points with lags up to 14 leave 6 rows
        let values = weekly_series(20);
        let err = RegressionStrategy::train(&values, &ForecastConfig::default()).unwrap_err();
        assert_eq!(err, Unavailable::InsufficientSamples { rows: 6, required: 10 });
    }

    #[test]
    fn test_non_finite_history_is_unavailable() {
        let mut values = weekly_series(40);
        values[10] = f64::NAN;
        assert!(matches!(
            RegressionStrategy::train(&values, &ForecastConfig::default()),
            Err(Unavailable::Training(_))
        ));
    }
}
