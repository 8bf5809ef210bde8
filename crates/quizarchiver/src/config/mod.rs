pub mod loader;
pub mod schema;
pub mod variables;

pub use loader::{load_config, load_config_from_str};
pub use schema::{ArchiverConfig, LoggingConfig};
pub use variables::{
    generate_attempt_filename, generate_attempt_foldername, is_valid_pattern, validate_pattern,
    AttemptFilenameVariable, AttemptNameContext, PatternKind,
};
