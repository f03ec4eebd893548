//! NIDS AI Engine
//!
//! Turns a submitted network-flow feature set into a traffic category:
//!
//! ```text
//! raw form ──► FeatureVector ──► StandardScaler ──► Classifier ──► LabelEncoder
//!  (validate)                      (scale)           (predict)       (decode)
//! ```
//!
//! Recording the result is the caller's job; the engine has no storage.

pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;


pub use error::{ConfigurationError, ValidationError};
pub use features::{FeatureVector, LayoutInfo, FEATURE_COUNT, FEATURE_LAYOUT};
pub use model::{Classifier, LabelEncoder, RawPrediction, StandardScaler};
pub use pipeline::{Classification, Detector, ModelStatus, Stage, DEFAULT_CONFIDENCE};
