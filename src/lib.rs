//! Real-time 3D rendering core: compressed-octree culling, a multi-pass
//! lighting pipeline with per-light stencil shadow volumes, and the
//! shadow-volume/geometry-scissors caches that make repeated lights and
//! static geometry cheap to redraw.
//!
//! GPU command issuance, shader management, HDR tone-mapping, shadow-map
//! rendering, mesh I/O/preprocessing, bounds-primitive math beyond what the
//! culler needs, text overlay and window/swap integration are all host
//! concerns reached through [`gpu::GpuDriver`] and [`gpu::ShaderManager`].
//! See the `gl_backend` module (behind the `gl-backend` feature) for a
//! reference implementation of that boundary.

pub mod bounds;
pub mod cache;
pub mod context;
pub mod culler;
pub mod error;
pub mod frustum;
pub mod gpu;
pub mod light;
pub mod mesh;
pub mod octree;
pub mod renderer;
pub mod scene;
pub mod shadow;
pub mod stats;

#[cfg(feature = "gl-backend")]
pub mod gl_backend;

pub use bounds::{Aabb, ConvexHull, Cylinder, OrientedBox, Plane, Sphere, SphericalSector, Verdict};
pub use cache::{ModelShadowVolumeCache, ObjectShadowVolumeCache};
pub use context::RenderContext;
pub use culler::Culler;
pub use error::{CoreError, CoreResult};
pub use frustum::{Frustum, ScissorsRect};
pub use gpu::{GpuDriver, ShaderManager};
pub use light::{Attenuation, ConeOrBeam, Light, LightBounds, LightId, LightKind};
pub use mesh::{unit_cube, Edge, Lod, Model, Triangle};
pub use octree::{EntityRef, FastOctree};
pub use renderer::{RenderFlags, Renderer, ShadowMode};
pub use scene::{Object, ObjectFlags, ObjectId, Scene};
pub use stats::{CacheStats, RenderStats};
