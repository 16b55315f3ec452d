//! Session resolver configuration

use std::time::Duration;

use leanweb_common::Config;

/// Credentials and endpoint of the BaaS REST API
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub app_id: String,
    pub app_key: String,
    pub api_server: String,
    pub timeout: Duration,
}

impl AuthConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            app_id: config.leancloud_app_id.clone(),
            app_key: config.leancloud_app_key.clone(),
            api_server: config.leancloud_api_server.clone(),
            timeout: config.leancloud_timeout,
        }
    }
}
