//! Reading molecular systems from disk.
//!
//! The coupling engine itself owns no persisted state. This module only provides the
//! TOML system snapshot used by the command-line tools and by tests to stand in for
//! the data a classical engine would hand over.

pub mod system_file;
