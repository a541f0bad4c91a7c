use crate::classifier::fgsm_perturb;
use crate::loss::cross_entropy;
use crate::{Classifier, Dataset, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Index of the first sample to evaluate.
    pub start: usize,
    /// Number of samples from `start`; `None` runs to the end of the dataset.
    pub num_samples: Option<usize>,
    /// Also craft an FGSM example per sample and score the model on it.
    pub attack: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            start: 0,
            num_samples: None,
            attack: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalReport {
    pub samples: usize,
    pub clean_correct: usize,
    /// `None` when the attack was disabled.
    pub adversarial_correct: Option<usize>,
    /// Samples whose predicted label changed under attack.
    pub flipped: usize,
    /// Mean cross-entropy on the clean inputs, over the samples whose loss is
    /// finite. `None` if there are none.
    pub mean_loss: Option<f32>,
    /// Samples left out of `mean_loss` because `p[y]` underflowed to zero.
    pub non_finite_loss: usize,
}

impl EvalReport {
    /// `0.0` for an empty report.
    pub fn clean_accuracy(&self) -> f32 {
        ratio(self.clean_correct, self.samples)
    }

    pub fn adversarial_accuracy(&self) -> Option<f32> {
        self.adversarial_correct.map(|c| ratio(c, self.samples))
    }
}

#[inline]
fn ratio(count: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        count as f32 / total as f32
    }
}

impl Classifier {
    /// Accuracy over a range of `data`, before and (optionally) after FGSM.
    ///
    /// Each sample is independent: one forward pass gives the clean prediction and
    /// the loss, its cached state gives the input gradient, and the perturbed input
    /// is scored with a second forward pass.
    pub fn evaluate(&self, data: &Dataset, cfg: EvalConfig) -> Result<EvalReport> {
        let params = self.parameters().ok_or(Error::NotReady)?;
        if data.input_dim() != params.input_dim() {
            return Err(Error::Shape(format!(
                "dataset input_dim {} does not match model input_dim {}",
                data.input_dim(),
                params.input_dim()
            )));
        }
        data.validate_labels(params.output_dim())?;

        let end = match cfg.num_samples {
            Some(n) => cfg.start.checked_add(n),
            None => Some(data.len()),
        };
        let end = match end {
            Some(end) if end <= data.len() && end > cfg.start => end,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "sample range start={} num_samples={:?} is empty or exceeds dataset len {}",
                    cfg.start,
                    cfg.num_samples,
                    data.len()
                )));
            }
        };

        let eps = self.attack_budget();
        let mut clean_correct = 0;
        let mut adversarial_correct = 0;
        let mut flipped = 0;
        let mut total_loss = 0.0_f64;
        let mut non_finite_loss = 0;

        for idx in cfg.start..end {
            let x = data.input(idx);
            let y = data.label(idx);

            let state = self.forward(x)?;
            let pred = state.predicted_label();
            match cross_entropy(y, state.probs()) {
                Ok(loss) => total_loss += f64::from(loss),
                Err(Error::Numeric(msg)) => {
                    tracing::debug!(idx, label = y, %msg, "loss not finite, left out of mean");
                    non_finite_loss += 1;
                }
                Err(e) => return Err(e),
            }
            if pred == y {
                clean_correct += 1;
            }

            if cfg.attack {
                let grad = self.gradient_with_state(&state, y)?;
                let x_adv = fgsm_perturb(x, &grad, eps)?;
                let adv_state = self.forward(&x_adv)?;
                let adv_pred = adv_state.predicted_label();
                if adv_pred == y {
                    adversarial_correct += 1;
                }
                if adv_pred != pred {
                    flipped += 1;
                }
                tracing::trace!(
                    idx,
                    label = y,
                    pred,
                    adv_pred,
                    adv_conf = adv_state.probs()[adv_pred],
                    "evaluated sample"
                );
            } else {
                tracing::trace!(
                    idx,
                    label = y,
                    pred,
                    conf = state.probs()[pred],
                    "evaluated sample"
                );
            }
        }

        let samples = end - cfg.start;
        let finite = samples - non_finite_loss;
        let report = EvalReport {
            samples,
            clean_correct,
            adversarial_correct: cfg.attack.then_some(adversarial_correct),
            flipped,
            mean_loss: (finite > 0).then(|| (total_loss / finite as f64) as f32),
            non_finite_loss,
        };

        tracing::info!(
            samples,
            clean_accuracy = report.clean_accuracy(),
            adversarial_accuracy = ?report.adversarial_accuracy(),
            flipped,
            non_finite_loss,
            eps,
            "evaluation finished"
        );
        Ok(report)
    }
}
