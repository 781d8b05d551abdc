//! Configuration.
//!
//! Tiers are merged field-by-field, later tiers winning:
//! 1. **Defaults** - built in
//! 2. **Project** - `./hive/config.yaml`
//! 3. **User** - `~/.hive/config.yaml`
//! 4. **Explicit** - `--config <file>` or `HIVE_CONFIG_PATH`
//! 5. **Environment** - see below
//!
//! Command-line flags are applied by the binary on top of the result.
//!
//! ## Environment Variables
//! - `HIVE_CONFIG_PATH` - Explicit config file
//! - `HIVE_DATA_DIR` - Data directory
//! - `HIVE_AGENT` - Acting agent identity
//! - `HIVE_STALE_MINUTES` - Reaper fallback threshold
//! - `HIVE_STORE` - Store backend (`file` or `sqlite`)

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
