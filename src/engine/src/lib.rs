//! logrotor engine
//!
//! Resolves configured glob patterns, decides which files qualify for their
//! entry's action, and deletes or rotates them. Rotation renames the file
//! with a timestamp suffix, optionally compresses it to gzip or zip, and
//! prunes older rotated copies down to a retention limit.

pub mod compress;
pub mod condition;
pub mod context;
pub mod deletion;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod resolver;
pub mod retention;
pub mod rotation;
pub mod units;

pub use compress::{CompressionFormat, compress};
pub use condition::{Trigger, Verdict, evaluate};
pub use context::EngineContext;
pub use deletion::{DeletionExecutor, DeletionReport};
pub use dispatcher::{Dispatcher, DispatcherHandle, EntryTask, RunGuard, TickOutcome, TickReport};
pub use error::{Error, Result};
pub use metrics::{MetricsSummary, RotationMetrics};
pub use resolver::{ResolvedFile, resolve};
pub use retention::{FamilyMember, PruneReport, prune};
pub use rotation::{RotatedFile, RotationExecutor, RotationReport};
pub use units::{parse_age, parse_size};
