//! Three-layer feed-forward classifier with batch normalization and dropout.

use std::collections::HashMap;

use candle_core::{DType, Device, Tensor, Var, D};
use candle_nn::{BatchNorm, Linear, Module, ModuleT, VarBuilder, VarMap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;

pub const HIDDEN_DIM: usize = 30;
pub const NUM_CLASSES: usize = 2;
pub const DROPOUT_PROB: f64 = 0.1;
const BN_MOMENTUM: f64 = 0.1;
const BN_EPS: f64 = 1e-5;

/// Linear layers as (name, fan_in, fan_out).
fn linear_layout(n_features: usize) -> [(&'static str, usize, usize); 3] {
    [
        ("fc1", n_features, HIDDEN_DIM),
        ("fc2", HIDDEN_DIM, HIDDEN_DIM),
        ("fc3", HIDDEN_DIM, NUM_CLASSES),
    ]
}

/// Seeded initial parameters: linear weights and biases drawn from
/// `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`, batch-norm scale 1 and shift 0.
fn initial_tensors(n_features: usize, seed: u64, device: &Device) -> Result<Vec<(String, Tensor)>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tensors = Vec::new();

    for (name, fan_in, fan_out) in linear_layout(n_features) {
        let bound = 1.0 / (fan_in as f32).sqrt();
        let weight: Vec<f32> = (0..fan_in * fan_out)
            .map(|_| rng.gen_range(-bound..=bound))
            .collect();
        let bias: Vec<f32> = (0..fan_out).map(|_| rng.gen_range(-bound..=bound)).collect();
        let weight = Tensor::from_vec(weight, (fan_out, fan_in), device)?;
        tensors.push((format!("{name}.weight"), weight));
        tensors.push((format!("{name}.bias"), Tensor::from_vec(bias, fan_out, device)?));
    }
    for name in ["bn1", "bn2"] {
        tensors.push((format!("{name}.weight"), Tensor::ones(HIDDEN_DIM, DType::F32, device)?));
        tensors.push((format!("{name}.bias"), Tensor::zeros(HIDDEN_DIM, DType::F32, device)?));
    }
    Ok(tensors)
}

fn create_var_map(var_map: &VarMap, tensor_data: Vec<(String, Tensor)>) -> Result<()> {
    let mut ws = var_map
        .data()
        .lock()
        .map_err(|_| candle_core::Error::Msg("variable map lock poisoned".to_string()))?;
    for (name, tensor) in tensor_data {
        ws.insert(name, Var::from_tensor(&tensor)?);
    }
    Ok(())
}

/// Batch normalization over the `HIDDEN_DIM` features of an `(n, c)` input.
/// Scale and shift are trainable; running statistics live outside the `VarMap`.
fn batch_norm(vb: VarBuilder, running_mean: Tensor, running_var: Tensor) -> Result<BatchNorm> {
    Ok(BatchNorm::new_with_momentum(
        HIDDEN_DIM,
        running_mean,
        running_var,
        vb.get(HIDDEN_DIM, "weight")?,
        vb.get(HIDDEN_DIM, "bias")?,
        BN_EPS,
        BN_MOMENTUM,
    )?)
}

/// Inverted dropout with a caller-supplied generator. `candle_nn::ops::dropout`
/// samples its mask from an unseeded generator.
fn dropout(xs: &Tensor, rng: &mut StdRng) -> Result<Tensor> {
    let (n, c) = xs.dims2()?;
    let scale = (1.0 / (1.0 - DROPOUT_PROB)) as f32;
    let mask: Vec<f32> = (0..n * c)
        .map(|_| if rng.gen::<f64>() < DROPOUT_PROB { 0.0 } else { scale })
        .collect();
    let mask = Tensor::from_vec(mask, (n, c), xs.device())?;
    Ok(xs.mul(&mask)?)
}

/// Frozen copy of every network parameter and batch-norm running statistic.
#[derive(Debug, Clone)]
pub struct NetworkSnapshot {
    tensors: HashMap<String, Tensor>,
    n_features: usize,
}

impl NetworkSnapshot {
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }
}

/// fc1 -> bn1 -> relu -> dropout -> fc2 -> bn2 -> relu -> dropout -> fc3
pub struct FeedForwardNet {
    varmap: VarMap,
    fc1: Linear,
    bn1: BatchNorm,
    fc2: Linear,
    bn2: BatchNorm,
    fc3: Linear,
    n_features: usize,
}

impl FeedForwardNet {
    /// A freshly initialised, trainable network. Initialisation depends on
    /// `seed` only.
    pub fn new_untrained(n_features: usize, seed: u64, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        create_var_map(&varmap, initial_tensors(n_features, seed, device)?)?;
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);

        let running = || -> Result<(Tensor, Tensor)> {
            Ok((
                Tensor::zeros(HIDDEN_DIM, DType::F32, device)?,
                Tensor::ones(HIDDEN_DIM, DType::F32, device)?,
            ))
        };
        let (mean1, var1) = running()?;
        let (mean2, var2) = running()?;
        Self::assemble(varmap, &vb, n_features, (mean1, var1), (mean2, var2))
    }

    /// Rebuild a network from a snapshot for inference.
    pub fn from_snapshot(snapshot: &NetworkSnapshot, device: &Device) -> Result<Self> {
        let vb = VarBuilder::from_tensors(snapshot.tensors.clone(), DType::F32, device);
        let stat = |name: &str| vb.get(HIDDEN_DIM, name);
        let bn1 = (stat("bn1.running_mean")?, stat("bn1.running_var")?);
        let bn2 = (stat("bn2.running_mean")?, stat("bn2.running_var")?);
        Self::assemble(VarMap::new(), &vb, snapshot.n_features, bn1, bn2)
    }

    fn assemble(
        varmap: VarMap,
        vb: &VarBuilder,
        n_features: usize,
        bn1: (Tensor, Tensor),
        bn2: (Tensor, Tensor),
    ) -> Result<Self> {
        let linear = |name: &str, fan_in: usize, fan_out: usize| -> Result<Linear> {
            let vb = vb.pp(name);
            Ok(Linear::new(vb.get((fan_out, fan_in), "weight")?, Some(vb.get(fan_out, "bias")?)))
        };
        let [(n1, i1, o1), (n2, i2, o2), (n3, i3, o3)] = linear_layout(n_features);

        Ok(Self {
            fc1: linear(n1, i1, o1)?,
            bn1: batch_norm(vb.pp("bn1"), bn1.0, bn1.1)?,
            fc2: linear(n2, i2, o2)?,
            bn2: batch_norm(vb.pp("bn2"), bn2.0, bn2.1)?,
            fc3: linear(n3, i3, o3)?,
            varmap,
            n_features,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Training-mode forward pass: batch statistics and active dropout.
    pub fn forward_train(&self, xs: &Tensor, rng: &mut StdRng) -> Result<Tensor> {
        let xs = self.fc1.forward(xs)?;
        let xs = dropout(&self.bn1.forward_train(&xs)?.relu()?, rng)?;
        let xs = self.fc2.forward(&xs)?;
        let xs = dropout(&self.bn2.forward_train(&xs)?.relu()?, rng)?;
        Ok(self.fc3.forward(&xs)?)
    }

    /// Evaluation-mode forward pass: running statistics, no dropout.
    pub fn forward_eval(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = self.fc1.forward(xs)?;
        let xs = self.bn1.forward_t(&xs, false)?.relu()?;
        let xs = self.fc2.forward(&xs)?;
        let xs = self.bn2.forward_t(&xs, false)?.relu()?;
        Ok(self.fc3.forward(&xs)?)
    }

    /// Class index with the highest logit for every row of `xs`.
    pub fn predict(&self, xs: &Tensor) -> Result<Vec<u32>> {
        Ok(self.forward_eval(xs)?.argmax(D::Minus1)?.to_vec1::<u32>()?)
    }

    /// Copy the current parameters and running statistics.
    pub fn snapshot(&self) -> Result<NetworkSnapshot> {
        let mut tensors = HashMap::new();
        {
            let vars = self
                .varmap
                .data()
                .lock()
                .map_err(|_| candle_core::Error::Msg("variable map lock poisoned".to_string()))?;
            for (name, var) in vars.iter() {
                tensors.insert(name.clone(), var.as_tensor().copy()?);
            }
        }
        for (prefix, bn) in [("bn1", &self.bn1), ("bn2", &self.bn2)] {
            tensors.insert(format!("{prefix}.running_mean"), bn.running_mean().copy()?);
            tensors.insert(format!("{prefix}.running_var"), bn.running_var().copy()?);
        }
        Ok(NetworkSnapshot {
            tensors,
            n_features: self.n_features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(n: usize, m: usize) -> Tensor {
        let data: Vec<f32> = (0..n * m).map(|i| (i % 7) as f32 - 3.0).collect();
        Tensor::from_vec(data, (n, m), &Device::Cpu).unwrap()
    }

    fn flat(t: &Tensor) -> Vec<f32> {
        t.flatten_all().unwrap().to_vec1::<f32>().unwrap()
    }

    #[test]
    fn test_forward_shapes() {
        let device = Device::Cpu;
        let net = FeedForwardNet::new_untrained(4, 0, &device).unwrap();
        let xs = input(6, 4);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(net.forward_train(&xs, &mut rng).unwrap().dims(), &[6, NUM_CLASSES]);
        assert_eq!(net.forward_eval(&xs).unwrap().dims(), &[6, NUM_CLASSES]);
        assert_eq!(net.predict(&xs).unwrap().len(), 6);
    }

    #[test]
    fn test_initialisation_is_seeded() {
        let device = Device::Cpu;
        let xs = input(5, 3);
        let a = FeedForwardNet::new_untrained(3, 7, &device).unwrap();
        let b = FeedForwardNet::new_untrained(3, 7, &device).unwrap();
        let c = FeedForwardNet::new_untrained(3, 8, &device).unwrap();
        let out = |net: &FeedForwardNet| flat(&net.forward_eval(&xs).unwrap());
        assert_eq!(out(&a), out(&b));
        assert_ne!(out(&a), out(&c));
    }

    #[test]
    fn test_snapshot_round_trip_preserves_outputs() {
        let device = Device::Cpu;
        let net = FeedForwardNet::new_untrained(3, 1, &device).unwrap();
        let xs = input(8, 3);
        let mut rng = StdRng::seed_from_u64(1);
        // Move the running statistics away from their initial values.
        net.forward_train(&xs, &mut rng).unwrap();

        let snapshot = net.snapshot().unwrap();
        assert_eq!(snapshot.len(), 14);
        let restored = FeedForwardNet::from_snapshot(&snapshot, &device).unwrap();
        let before = flat(&net.forward_eval(&xs).unwrap());
        let after = flat(&restored.forward_eval(&xs).unwrap());
        assert_eq!(before, after);
    }

    #[test]
    fn test_running_statistics_follow_momentum() {
        let device = Device::Cpu;
        let net = FeedForwardNet::new_untrained(3, 2, &device).unwrap();
        let xs = input(8, 3);
        let hidden = flat(&net.fc1.forward(&xs).unwrap().t().unwrap().contiguous().unwrap());
        let mut rng = StdRng::seed_from_u64(0);
        net.forward_train(&xs, &mut rng).unwrap();

        let snapshot = net.snapshot().unwrap();
        let mean = flat(snapshot.get("bn1.running_mean").unwrap());
        let var = flat(snapshot.get("bn1.running_var").unwrap());
        for (c, column) in hidden.chunks(8).enumerate() {
            let m = column.iter().sum::<f32>() / 8.0;
            let unbiased = column.iter().map(|v| (v - m).powi(2)).sum::<f32>() / 7.0;
            assert!((mean[c] - 0.1 * m).abs() < 1e-4);
            assert!((var[c] - (0.9 + 0.1 * unbiased)).abs() < 1e-4 * (1.0 + unbiased));
        }
    }
}
