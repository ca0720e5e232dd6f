//! Best-checkpoint training loop for [`FeedForwardNet`].

use candle_core::{Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::LearningRatePolicy;
use crate::data_handling::{class_label, Dataset};
use crate::error::{EvalError, Result};
use crate::network::model::{FeedForwardNet, NetworkSnapshot, NUM_CLASSES};

/// Adam step size used regardless of the requested learning rate under
/// [`LearningRatePolicy::Fixed`].
pub const FIXED_STEP_SIZE: f64 = 0.005;

#[derive(Debug, Clone, Copy)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub learning_rate: f64,
    pub learning_rate_policy: LearningRatePolicy,
    /// Seeds parameter initialisation and dropout masks.
    pub seed: u64,
}

impl TrainingOptions {
    /// Step size handed to the optimizer.
    pub fn step_size(&self) -> f64 {
        match self.learning_rate_policy {
            LearningRatePolicy::Fixed => FIXED_STEP_SIZE,
            LearningRatePolicy::Configured => self.learning_rate,
        }
    }
}

/// Losses and validation accuracy observed at one epoch, before its
/// optimizer step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochRecord {
    pub epoch: usize,
    pub train_loss: f32,
    pub validation_loss: f32,
    pub validation_accuracy: f64,
}

/// Best checkpoint of a training run.
#[derive(Debug, Clone)]
pub struct TrainedNetwork {
    pub snapshot: NetworkSnapshot,
    pub accuracy: f64,
    pub best_epoch: usize,
    pub history: Vec<EpochRecord>,
}

/// Features as an `(n, m)` f32 tensor and labels as class indices.
pub fn to_tensors(data: &Dataset, device: &Device) -> Result<(Tensor, Tensor)> {
    let xs: Vec<f32> = data.x.iter().map(|&v| v as f32).collect();
    let xs = Tensor::from_vec(xs, (data.n_samples(), data.n_features()), device)?;
    let ys = data
        .y
        .iter()
        .map(|&v| {
            let label = class_label(v);
            if label < 0 || label >= NUM_CLASSES as i64 {
                return Err(EvalError::InvalidConfig(format!(
                    "network labels must be 0 or 1, found {}",
                    v
                )));
            }
            Ok(label as u32)
        })
        .collect::<Result<Vec<u32>>>()?;
    let ys = Tensor::from_vec(ys, data.n_samples(), device)?;
    Ok((xs, ys))
}

/// Fraction of rows whose predicted class equals the label.
pub fn prediction_accuracy(predicted: &[u32], labels: &Tensor) -> Result<f64> {
    let labels = labels.to_vec1::<u32>()?;
    if labels.is_empty() || labels.len() != predicted.len() {
        return Err(EvalError::ShapeMismatch {
            expected: labels.len().max(1),
            found: predicted.len(),
        });
    }
    let correct = predicted.iter().zip(labels.iter()).filter(|(p, l)| p == l).count();
    Ok(correct as f64 / labels.len() as f64)
}

/// Train for exactly `options.epochs` epochs and return the checkpoint with
/// the highest validation accuracy (earliest on ties).
///
/// Every epoch runs a training-mode forward pass on `train`, an evaluation
/// pass on `validation`, snapshots the parameters, and only then applies one
/// full-batch optimizer step.
pub fn train(
    train: &Dataset,
    validation: &Dataset,
    options: &TrainingOptions,
) -> Result<TrainedNetwork> {
    if options.epochs == 0 {
        return Err(EvalError::InvalidConfig("epochs must be at least 1".to_string()));
    }
    if train.n_features() != validation.n_features() {
        return Err(EvalError::ShapeMismatch {
            expected: train.n_features(),
            found: validation.n_features(),
        });
    }
    if options.learning_rate_policy == LearningRatePolicy::Fixed
        && options.learning_rate != FIXED_STEP_SIZE
    {
        log::trace!(
            "learning rate {} recorded, optimizer runs with fixed step {}",
            options.learning_rate,
            FIXED_STEP_SIZE
        );
    }

    let device = Device::Cpu;
    let (x_train, y_train) = to_tensors(train, &device)?;
    let (x_val, y_val) = to_tensors(validation, &device)?;

    let net = FeedForwardNet::new_untrained(train.n_features(), options.seed, &device)?;
    let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(1));
    let params = ParamsAdamW {
        lr: options.step_size(),
        weight_decay: 0.0,
        ..Default::default()
    };
    let mut opt = AdamW::new(net.varmap().all_vars(), params)?;

    let mut history = Vec::with_capacity(options.epochs);
    let mut snapshots = Vec::with_capacity(options.epochs);
    for epoch in 0..options.epochs {
        let logits = net.forward_train(&x_train, &mut rng)?;
        let train_loss = candle_nn::loss::cross_entropy(&logits, &y_train)?;

        let val_logits = net.forward_eval(&x_val)?;
        let validation_loss = candle_nn::loss::cross_entropy(&val_logits, &y_val)?;
        let predicted = val_logits.argmax(candle_core::D::Minus1)?.to_vec1::<u32>()?;
        let validation_accuracy = prediction_accuracy(&predicted, &y_val)?;

        let record = EpochRecord {
            epoch,
            train_loss: train_loss.to_scalar::<f32>()?,
            validation_loss: validation_loss.to_scalar::<f32>()?,
            validation_accuracy,
        };
        log::trace!(
            "epoch {}: train loss {:.4}, val loss {:.4}, val acc {:.4}",
            epoch,
            record.train_loss,
            record.validation_loss,
            record.validation_accuracy
        );
        history.push(record);
        snapshots.push(net.snapshot()?);

        opt.backward_step(&train_loss)?;
    }

    let best_epoch = history
        .iter()
        .fold(0, |best, record| {
            if record.validation_accuracy > history[best].validation_accuracy {
                record.epoch
            } else {
                best
            }
        });

    Ok(TrainedNetwork {
        accuracy: history[best_epoch].validation_accuracy,
        snapshot: snapshots.swap_remove(best_epoch),
        best_epoch,
        history,
    })
}
