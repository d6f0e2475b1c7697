use std::env;

#[derive(Clone, Debug)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn from_env() -> Self {
        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self { allowed_origins }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_origins_cover_local_dev() {
        // Only meaningful when ALLOWED_ORIGINS is unset in the test env
        if env::var("ALLOWED_ORIGINS").is_err() {
            let config = CorsConfig::from_env();
            assert!(
                config
                    .allowed_origins
                    .contains(&"http://localhost:3000".to_string())
            );
        }
    }
}
