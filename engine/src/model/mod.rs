//! Model Module - fitted artifacts and classifiers
//!
//! Scaler, classifier and label encoder are fitted offline and loaded
//! together; see `artifacts` for the on-disk contract.

pub mod artifacts;
pub mod classifier;
pub mod labels;
pub mod logistic;
pub mod scaler;
pub mod svc;

pub use artifacts::ModelArtifacts;
pub use classifier::{Classifier, ClassifierArtifact, RawPrediction};
pub use labels::LabelEncoder;
pub use logistic::LogisticRegression;
pub use scaler::StandardScaler;
pub use svc::{Kernel, SupportVectorClassifier};
