// Application state module
// Everything a request needs, built once at start-up and shared read-only

use crate::error::RelayError;
use crate::handler::forward::Upstream;
use crate::handler::static_files::StaticAssets;
use crate::http::cors::CorsPolicy;

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,
    pub cors: CorsPolicy,
    pub upstream: Upstream,
    pub assets: StaticAssets,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, RelayError> {
        let upstream = Upstream::new(config.upstream_origin()?, config.upstream.max_redirects)?;
        let assets = StaticAssets::new(&config.assets);

        Ok(Self {
            config: config.clone(),
            cors: CorsPolicy::default(),
            upstream,
            assets,
        })
    }
}
