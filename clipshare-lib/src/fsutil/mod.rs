pub mod listing;
pub mod paths;
pub mod staging;

pub use listing::{collect_entries, ListedEntry};
pub use paths::{contains_parent_escape, is_valid_name, mkdirs, to_native_path, uniquify};
pub use staging::{create_staging_dir, promote_staging};
