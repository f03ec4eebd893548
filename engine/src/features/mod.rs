//! Features Module - flow feature layout and validated vectors

pub mod layout;
pub mod vector;


pub use layout::{
    layout_hash, LayoutInfo, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION,
};
pub use vector::FeatureVector;
