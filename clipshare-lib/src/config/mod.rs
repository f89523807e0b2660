mod loader;
mod root;
mod validator;

pub use loader::load_from_path;
pub use root::{Config, MethodConfig, TlsConfig, CONFIG_FILE_NAME};
pub use validator::validate_config;
