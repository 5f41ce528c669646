//! Command implementations, one module per subcommand.

pub mod csv;
pub mod delete;
pub mod download;
pub mod import;
pub mod list;
pub mod locate;
pub mod regrid;
pub mod set;
pub mod share;
pub mod show;
pub mod trim;
