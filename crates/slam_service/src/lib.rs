//! # SLAM Service
//!
//! Service facade over a running engine.
//!
//! Responsibilities:
//! - Bring up engine and ingestion in order, tear them down in reverse
//! - Answer position, map, internal-state and map-info queries
//! - Stream large payloads as fixed-size chunks
//! - Idempotent close
//!
//! ## Usage Example
//!
//! ```ignore
//! use slam_service::SlamService;
//!
//! let service = SlamService::new(&library, config, sensor).await?;
//!
//! let (pose, component) = service.get_position().await?;
//! for chunk in service.get_point_cloud_map().await? {
//!     send(chunk).await?;
//! }
//!
//! service.close().await?;
//! library.terminate()?;
//! ```

mod chunk;
mod lifecycle;
mod position;
mod service;

pub use chunk::{ChunkStream, CHUNK_SIZE_BYTES};
pub use lifecycle::LifecycleManager;
pub use position::check_quaternion;
pub use service::{SlamService, JOB_DONE_COMMAND};
