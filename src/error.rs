//! Error types surfaced at the simulation API boundary.

/// Errors returned by fallible simulation APIs.
///
/// All failure modes are explicit return values; none of them mutate state
/// before surfacing. Degenerate arithmetic (near-zero separation in gravity)
/// is a silent guard, not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    /// Input rejected at the call site (non-positive mass or radius,
    /// non-finite vector, zero-volume world bounds, non-positive time step,
    /// out-of-range material coefficient).
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The world refused a new body because it is at its configured limit.
    #[error("world is at capacity ({0} bodies)")]
    CapacityExceeded(usize),

    /// A task was submitted to a work pool that has been closed.
    #[error("work pool is closed")]
    PoolClosed,
}
