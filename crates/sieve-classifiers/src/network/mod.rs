//! Feed-forward network classifier and its best-checkpoint training.
//!
//! Parameter initialisation and dropout draw from seeded generators, so a
//! training run is a pure function of its data and [`TrainingOptions`].
pub mod evaluation;
pub mod model;
pub mod trainer;

pub use evaluation::{
    cross_validate_network, evaluate_network, evaluate_network_single_feature, NetworkReport,
    NetworkSettings,
};
pub use model::{FeedForwardNet, NetworkSnapshot};
pub use trainer::{train, EpochRecord, TrainedNetwork, TrainingOptions};
