use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub temp_dir: String,
    pub cors_origins: Vec<String>,
    pub request_timeout_seconds: u64,
    /// How long a processed file outlives the response that served it.
    pub processed_linger_seconds: u64,
    /// Interval of the background sweep over the temp directory.
    pub cleanup_interval_seconds: u64,
    /// Files older than this are removed by the sweep.
    pub temp_file_max_age_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_file_size: 10 * 1024 * 1024, // 10MB
            temp_dir: "/tmp/sticker-press".to_string(),
            cors_origins: vec!["*".to_string()],
            request_timeout_seconds: 30,
            processed_linger_seconds: 5,
            cleanup_interval_seconds: 3600,
            temp_file_max_age_seconds: 3600,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }

        if let Ok(port) = env::var("PORT") {
            if let Ok(port_num) = port.parse::<u16>() {
                config.port = port_num;
            }
        }

        if let Ok(max_size) = env::var("MAX_FILE_SIZE") {
            if let Ok(size) = max_size.parse::<usize>() {
                config.max_file_size = size;
            }
        }

        if let Ok(temp_dir) = env::var("TEMP_DIR") {
            config.temp_dir = temp_dir;
        }

        if let Ok(origins) = env::var("CORS_ORIGINS") {
            config.cors_origins = origins.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Ok(timeout) = env::var("REQUEST_TIMEOUT_SECONDS") {
            if let Ok(timeout_num) = timeout.parse::<u64>() {
                config.request_timeout_seconds = timeout_num;
            }
        }

        if let Ok(linger) = env::var("PROCESSED_LINGER_SECONDS") {
            if let Ok(linger_num) = linger.parse::<u64>() {
                config.processed_linger_seconds = linger_num;
            }
        }

        if let Ok(interval) = env::var("CLEANUP_INTERVAL_SECONDS") {
            if let Ok(interval_num) = interval.parse::<u64>() {
                config.cleanup_interval_seconds = interval_num;
            }
        }

        if let Ok(max_age) = env::var("TEMP_FILE_MAX_AGE_SECONDS") {
            if let Ok(max_age_num) = max_age.parse::<u64>() {
                config.temp_file_max_age_seconds = max_age_num;
            }
        }

        config
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
