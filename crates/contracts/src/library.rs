//! EngineLibrary - process-wide engine library handle
//!
//! The underlying algorithm library is initialized once per process and
//! terminated once, after every engine created from it has been terminated.
//! It is passed explicitly to whoever constructs a service instead of being
//! held in a global.

use crate::{AlgoConfig, EngineConfig, EngineError, SlamEngine};

/// Engine library resource
pub trait EngineLibrary: Send + Sync {
    /// Engine type produced by this library
    type Engine: SlamEngine + 'static;

    /// Create a new engine instance in the `Constructed` state
    fn create_engine(
        &self,
        config: &EngineConfig,
        algo: &AlgoConfig,
    ) -> Result<Self::Engine, EngineError>;

    /// Release the library itself
    ///
    /// Must be called at most once, after all services are closed.
    fn terminate(&self) -> Result<(), EngineError>;
}
