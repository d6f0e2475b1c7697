use std::env;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address the API listener binds to.
    pub bind_addr: String,
    /// Address the Prometheus metrics listener binds to.
    pub metrics_addr: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            metrics_addr: env::var("METRICS_ADDR").unwrap_or_else(|_| "0.0.0.0:9090".to_string()),
        }
    }
}
