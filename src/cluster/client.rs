use crate::config::ClusterConfig;
use reqwest::Client;

/// Builds the HTTP client used for every control-plane call
///
/// Both the total request time and the connect time are bounded by the
/// configuration; a control plane that stops responding surfaces as a
/// timeout error instead of hanging the run.
pub fn build_http_client(config: &ClusterConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()
}
