use std::{
    cmp::Ordering,
    fmt::{self, Debug, Display},
};

use burn::tensor::backend::Backend;
use serde::Serialize;

use crate::datasets::TextDataset;

use super::{
    inference::{PredictionError, TrainedModel},
    labels::Label,
};

/// Probabilities are clamped to this distance from 0 and 1 before taking logarithms
const LOG_LOSS_EPSILON: f64 = 1e-15;

/// A label type with an associated set of evaluation metrics
pub trait Evaluate: Label {
    /// The metrics computed for this label type
    type Metrics: Debug + Display + Serialize;

    /// Score a test partition with a trained model and compare against the actual labels
    fn evaluate<B: Backend>(
        model: &TrainedModel<Self, B>,
        test: &TextDataset<Self>,
    ) -> Result<Self::Metrics, EvaluationError>;
}

/// Evaluate a trained model on a held-out partition
pub fn evaluate<L: Evaluate, B: Backend>(
    model: &TrainedModel<L, B>,
    test: &TextDataset<L>,
) -> Result<L::Metrics, EvaluationError> {
    L::evaluate(model, test)
}

impl Evaluate for bool {
    type Metrics = BinaryClassificationMetrics;

    fn evaluate<B: Backend>(
        model: &TrainedModel<Self, B>,
        test: &TextDataset<Self>,
    ) -> Result<Self::Metrics, EvaluationError> {
        let predictions = model.transform(test)?;

        let scored: Vec<(bool, f32)> = test
            .examples()
            .zip(&predictions)
            .map(|(row, prediction)| (row.label, prediction.positive_probability()))
            .collect();

        BinaryClassificationMetrics::compute(&scored)
    }
}

impl Evaluate for String {
    type Metrics = MulticlassClassificationMetrics;

    fn evaluate<B: Backend>(
        model: &TrainedModel<Self, B>,
        test: &TextDataset<Self>,
    ) -> Result<Self::Metrics, EvaluationError> {
        let keys = model.key_map();
        let predictions = model.transform(test)?;

        let mut unseen = 0;
        let outcomes: Vec<Outcome> = test
            .examples()
            .zip(&predictions)
            .map(|(row, prediction)| {
                let actual = keys.key(&row.label);
                if actual.is_none() {
                    unseen += 1;
                }

                Outcome {
                    actual,
                    predicted: keys.key(&prediction.predicted_label),
                    actual_probability: actual
                        .and_then(|key| prediction.class_probabilities.get(key).copied())
                        .unwrap_or_default(),
                }
            })
            .collect();

        if unseen > 0 {
            log::warn!("{unseen} test row(s) carry labels absent from the training partition");
        }

        let labels = keys.labels().map(Label::display).collect();

        MulticlassClassificationMetrics::compute(&outcomes, labels)
    }
}

/// Quality metrics for a binary classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryClassificationMetrics {
    /// Fraction of rows classified correctly
    pub accuracy: f64,

    /// Area under the ROC curve
    pub area_under_roc_curve: f64,

    /// Harmonic mean of positive precision and positive recall
    pub f1_score: f64,

    /// Fraction of positive predictions that are correct
    pub positive_precision: f64,

    /// Fraction of positive rows predicted positive
    pub positive_recall: f64,

    /// Fraction of negative predictions that are correct
    pub negative_precision: f64,

    /// Fraction of negative rows predicted negative
    pub negative_recall: f64,

    /// Mean negative log-likelihood of the actual labels
    pub log_loss: f64,

    /// Positive rows predicted positive
    pub true_positives: usize,

    /// Negative rows predicted positive
    pub false_positives: usize,

    /// Negative rows predicted negative
    pub true_negatives: usize,

    /// Positive rows predicted negative
    pub false_negatives: usize,
}

impl BinaryClassificationMetrics {
    /// Compute metrics from `(actual label, positive-class probability)` pairs. A row is predicted
    /// positive when its probability is above one half.
    pub fn compute(scored: &[(bool, f32)]) -> Result<Self, EvaluationError> {
        if scored.is_empty() {
            return Err(EvaluationError::EmptyPartition);
        }

        if let Some(&(_, probability)) = scored.iter().find(|(_, p)| !p.is_finite()) {
            return Err(EvaluationError::NonFinite(probability));
        }

        let (mut tp, mut fp, mut tn, mut fn_) = (0, 0, 0, 0);
        let mut log_loss = 0.0;

        for &(actual, probability) in scored {
            let predicted = probability > 0.5;

            match (actual, predicted) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
                (true, false) => fn_ += 1,
            }

            let p = f64::from(probability).clamp(LOG_LOSS_EPSILON, 1.0 - LOG_LOSS_EPSILON);
            log_loss -= if actual { p.ln() } else { (1.0 - p).ln() };
        }

        let positives = tp + fn_;
        let negatives = tn + fp;
        if positives == 0 || negatives == 0 {
            return Err(EvaluationError::SingleClass);
        }

        let positive_precision = ratio(tp, tp + fp);
        let positive_recall = ratio(tp, positives);

        Ok(Self {
            accuracy: ratio(tp + tn, scored.len()),
            area_under_roc_curve: area_under_roc_curve(scored),
            f1_score: f1(positive_precision, positive_recall),
            positive_precision,
            positive_recall,
            negative_precision: ratio(tn, tn + fn_),
            negative_recall: ratio(tn, negatives),
            log_loss: log_loss / scored.len() as f64,
            true_positives: tp,
            false_positives: fp,
            true_negatives: tn,
            false_negatives: fn_,
        })
    }
}

impl Display for BinaryClassificationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accuracy: {}", percent(self.accuracy))?;
        writeln!(f, "Area Under Roc Curve: {}", percent(self.area_under_roc_curve))?;
        writeln!(f, "F1Score: {}", percent(self.f1_score))?;
        writeln!(
            f,
            "Positive precision/recall: {} / {}",
            percent(self.positive_precision),
            percent(self.positive_recall)
        )?;
        writeln!(
            f,
            "Negative precision/recall: {} / {}",
            percent(self.negative_precision),
            percent(self.negative_recall)
        )?;
        write!(f, "LogLoss: {:.4}", self.log_loss)
    }
}

/// Per-class counts for a multiclass classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    /// The class label
    pub label: String,

    /// Test rows of this class
    pub support: usize,

    /// Rows predicted as this class
    pub predicted: usize,

    /// Rows of this class predicted correctly
    pub correct: usize,

    /// `correct / predicted`
    pub precision: f64,

    /// `correct / support`
    pub recall: f64,

    /// Harmonic mean of precision and recall
    pub f1_score: f64,
}

/// Quality metrics for a multiclass classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MulticlassClassificationMetrics {
    /// Fraction of rows classified correctly
    pub micro_accuracy: f64,

    /// Mean recall over the classes present in the test partition
    pub macro_accuracy: f64,

    /// Mean F1 over the classes present in the test partition
    pub macro_f1_score: f64,

    /// Mean negative log-likelihood of the actual labels
    pub log_loss: f64,

    /// Metrics for each training class, ordered by key
    pub per_class: Vec<ClassMetrics>,
}

/// One scored test row, expressed in label keys
#[derive(Debug, Clone, Copy, PartialEq)]
struct Outcome {
    actual: Option<usize>,
    predicted: Option<usize>,
    actual_probability: f32,
}

impl MulticlassClassificationMetrics {
    fn compute(outcomes: &[Outcome], labels: Vec<String>) -> Result<Self, EvaluationError> {
        if outcomes.is_empty() {
            return Err(EvaluationError::EmptyPartition);
        }

        let mut per_class: Vec<ClassMetrics> = labels
            .into_iter()
            .map(|label| ClassMetrics {
                label,
                support: 0,
                predicted: 0,
                correct: 0,
                precision: 0.0,
                recall: 0.0,
                f1_score: 0.0,
            })
            .collect();

        let mut correct = 0;
        let mut log_loss = 0.0;

        for outcome in outcomes {
            if let Some(class) = outcome.actual.and_then(|key| per_class.get_mut(key)) {
                class.support += 1;
            }

            if let Some(class) = outcome.predicted.and_then(|key| per_class.get_mut(key)) {
                class.predicted += 1;
            }

            if outcome.actual.is_some() && outcome.actual == outcome.predicted {
                correct += 1;

                if let Some(class) = outcome.actual.and_then(|key| per_class.get_mut(key)) {
                    class.correct += 1;
                }
            }

            let p = f64::from(outcome.actual_probability).max(LOG_LOSS_EPSILON);
            log_loss -= p.ln();
        }

        for class in &mut per_class {
            class.precision = ratio(class.correct, class.predicted);
            class.recall = ratio(class.correct, class.support);
            class.f1_score = f1(class.precision, class.recall);
        }

        let (mut recall_sum, mut f1_sum, mut present) = (0.0, 0.0, 0);
        for class in per_class.iter().filter(|c| c.support > 0) {
            recall_sum += class.recall;
            f1_sum += class.f1_score;
            present += 1;
        }

        Ok(Self {
            micro_accuracy: ratio(correct, outcomes.len()),
            macro_accuracy: if present > 0 { recall_sum / present as f64 } else { 0.0 },
            macro_f1_score: if present > 0 { f1_sum / present as f64 } else { 0.0 },
            log_loss: log_loss / outcomes.len() as f64,
            per_class,
        })
    }
}

impl Display for MulticlassClassificationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MicroAccuracy: {}", percent(self.micro_accuracy))?;
        writeln!(f, "MacroAccuracy: {}", percent(self.macro_accuracy))?;
        writeln!(f, "MacroF1Score: {}", percent(self.macro_f1_score))?;
        write!(f, "LogLoss: {:.4}", self.log_loss)?;

        for class in self.per_class.iter().filter(|c| c.support > 0) {
            write!(
                f,
                "\n  {}: precision {}, recall {} ({} rows)",
                class.label,
                percent(class.precision),
                percent(class.recall),
                class.support
            )?;
        }

        Ok(())
    }
}

/// Area under the ROC curve as the Mann-Whitney rank statistic, averaging ranks over ties
fn area_under_roc_curve(scored: &[(bool, f32)]) -> f64 {
    let mut order: Vec<usize> = (0..scored.len()).collect();
    order.sort_by(|&a, &b| scored[a].1.total_cmp(&scored[b].1));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;

    while start < order.len() {
        let score = scored[order[start]].1;
        let mut end = start;
        while end < order.len() && scored[order[end]].1.total_cmp(&score) == Ordering::Equal {
            end += 1;
        }

        // One-based ranks start + 1 ..= end share their mean
        let rank = (start + 1 + end) as f64 / 2.0;
        let positives = order[start..end].iter().filter(|&&i| scored[i].0).count();
        positive_rank_sum += rank * positives as f64;

        start = end;
    }

    let positives = scored.iter().filter(|(actual, _)| *actual).count() as f64;
    let negatives = scored.len() as f64 - positives;

    (positive_rank_sum - positives * (positives + 1.0) / 2.0) / (positives * negatives)
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Evaluation Error
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum EvaluationError {
    /// There are no test rows
    #[error("the test partition is empty")]
    EmptyPartition,

    /// Binary metrics need both classes in the test partition
    #[error("the test partition contains a single class")]
    SingleClass,

    /// A probability is NaN or infinite
    #[error("the model produced a non-finite probability ({0})")]
    NonFinite(f32),

    /// Scoring the test partition failed
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}
