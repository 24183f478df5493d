//! Shadow volume generation: face classification/silhouette extraction
//! and side/cap assembly with index encoding.

pub mod builder;
pub mod silhouette;

pub use builder::{
    build_shadow_volume, EncodingCapabilities, EncodingFlags, RenderType, ShadowVolumeGeometry, ShadowVolumePrimitive, RESTART_16, RESTART_32,
};
pub use silhouette::{classify_faces, extract_silhouette, simd_classify_batch, FaceType, SilhouetteEdge};
