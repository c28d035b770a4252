pub mod builder;
pub mod comparator;
pub mod index;
pub mod loader;
pub mod normalize;
pub mod paths;
pub mod reporter;
pub mod settings;
pub mod source;
pub mod validation;

pub use comparator::{InstallerSelection, ManifestComparator, Options};
pub use index::{IndexError, OpenDisposition, PackageIndex, SchemaRegistry, SchemaVersion};
pub use paths::*;
pub use reporter::{NullReporter, Reporter};
pub use source::{LocalSource, ManifestSource, SourceError};
pub use validation::validate_manifest;
