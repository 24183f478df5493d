//! Boundary errors. The render path itself is total (see module docs on
//! [`crate::renderer`]): nothing inside a frame returns `Result`. Only setup
//! and resource-creation operations — shader compilation, GPU buffer
//! allocation, mesh ingestion — can fail, and they report through this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("shader compile error ({stage}): {message}")]
    ShaderCompile { stage: &'static str, message: String },

    #[error("shader link error: {0}")]
    ShaderLink(String),

    #[error("failed to create GPU index buffer")]
    IndexBufferCreation,

    #[error("mesh has no edge data for LOD 0, required for shadow volume generation")]
    MissingEdgeData,

    #[error("light id {0} does not exist in this scene")]
    UnknownLight(u32),

    #[error("object id {0} does not exist in this scene")]
    UnknownObject(u32),
}

pub type CoreResult<T> = Result<T, CoreError>;
