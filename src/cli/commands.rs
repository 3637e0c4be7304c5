use clap::Subcommand;

use super::find::FindArgs;
use super::source::SourceArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Dump the element hierarchy
    Source(SourceArgs),

    /// Locate elements and print their keys
    Find(FindArgs),

    /// List the queryable attribute names
    Attributes,
}
