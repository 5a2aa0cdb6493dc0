pub mod builder;
pub mod channel;
pub mod checksum;
pub mod config;
pub mod forges;
pub mod http;
pub mod naming;
pub mod tool;
pub mod updater;
pub mod walk;

pub use builder::{BuildOptions, BuildOutcome, cook_recipe};
pub use channel::{PublishGuard, Published};
pub use checksum::{ChecksumError, ChecksumStrategy, ResolvedChecksum, resolve_checksum};
pub use forges::traits::{ItemOutcome, ReleaseSource};
pub use tool::{BuildTool, RattlerBuild, ToolError};
pub use updater::{UpdateOptions, UpdateOutcome, update_recipe};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("rforge/", env!("CARGO_PKG_VERSION"));
