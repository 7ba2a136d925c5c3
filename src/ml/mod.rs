pub mod augment;
pub mod dataset;
pub mod inference;
pub mod ml_model;
pub mod training;

pub use augment::{AugmentConfig, AugmentParams};
pub use dataset::{FaceDataset, FaceItem, SkippedFile};
pub use inference::{GenderPrediction, InferenceEngine, ModelState};
pub use ml_model::{Backbone, GenderNet, ModelConfig};
pub use training::{train_model, FaceBatch, FaceBatcher, TrainReport};
