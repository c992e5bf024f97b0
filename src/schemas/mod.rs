// Configuration schemas.
pub mod setup_config;
