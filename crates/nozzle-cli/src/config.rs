//! Configuration loading for the nozzle binary.

use std::ffi::OsString;

use nozzle_config::Config;

use crate::AppError;

pub(crate) trait ConfigLoader {
    /// Loads configuration from `args` and the ambient layers.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

/// Loads configuration through `ortho_config`.
pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_layered(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}
