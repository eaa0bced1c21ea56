//! Configuration loading: file discovery, `${ENV}` substitution, schema and
//! route key normalisation.

pub mod env_subst;
pub mod loader;
pub mod route_keys;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    route_keys::{DEFAULT_ROUTE_KEY, normalize_route_keys},
    schema::{ChatlayConfig, OverlayConfig, ServerConfig, TimingConfig},
};
