use thiserror::Error;

// Unified error type for distmg

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("process grid {npx}x{npy}x{npz} does not match size {size}")]
    GridMismatch { size: usize, npx: usize, npy: usize, npz: usize },
    #[error("cannot coarsen local dimension {0} (must be even and >= 2)")]
    NotCoarsenable(usize),
    #[error("container `{0}` has no local storage")]
    MissingContainer(&'static str),
    #[error("container `{name}` of length {len} cannot be split into {parts} equal parts")]
    UnevenSplit { name: &'static str, len: usize, parts: usize },
    #[error("container `{0}` is already bound")]
    AlreadyBound(&'static str),
    #[error("declaration must be bound before {0}")]
    NotBound(&'static str),
    #[error("partition count {parts} does not match geometry size {size}")]
    PartitionCount { parts: usize, size: usize },
    #[error("broken level chain: expected {expected} levels, found {found}")]
    BrokenLevelChain { expected: usize, found: usize },
    #[error("global-to-local map must be populated before {0}")]
    MapNotPopulated(&'static str),
    #[error("column {0} is neither local nor in the halo")]
    UnreachableColumn(usize),
    #[error("halo must be set up before {0}")]
    HaloNotReady(&'static str),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}
