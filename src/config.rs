use std::env;
use anyhow::{bail, Context, Result};

const DEFAULT_GEOCODER_BASE_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";

/// Which key-value store backs the ledger
#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Memory,
    Spanner(SpannerConfig),
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Spanner(_) => "spanner",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub access_token: String,
    pub timeout_secs: u64,
}

/// Response metadata policy applied to every request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPolicy {
    /// Hostnames accepted in the `Host` header. Empty disables the check.
    pub allowed_hosts: Vec<String>,
    /// CORS origins; a single `*` means any origin.
    pub cors_allowed_origins: Vec<String>,
    pub cors_max_age_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    pub dir: String,
    pub public_base_url: String,
    pub max_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,
    pub geocoder: GeocoderConfig,
    pub policy: RequestPolicy,
    pub upload: UploadConfig,
    pub list_page_size: usize,
    pub service_port: u16,
    pub service_host: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name).with_context(|| format!("{} environment variable is required", name))
        };

        let store = match lookup("STORE_BACKEND").as_deref().unwrap_or("spanner") {
            "memory" => StoreBackend::Memory,
            "spanner" => StoreBackend::Spanner(SpannerConfig {
                emulator_host: lookup("SPANNER_EMULATOR_HOST"),
                project: require("SPANNER_PROJECT")?,
                instance: require("SPANNER_INSTANCE")?,
                database: require("SPANNER_DATABASE")?,
            }),
            other => bail!("STORE_BACKEND must be 'spanner' or 'memory', got '{}'", other),
        };

        let geocoder = GeocoderConfig {
            base_url: lookup("GEOCODER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEOCODER_BASE_URL.to_string()),
            access_token: require("GEOCODER_ACCESS_TOKEN")?,
            timeout_secs: lookup("GEOCODER_TIMEOUT_SECS")
                .unwrap_or_else(|| "10".to_string())
                .parse::<u64>()
                .context("GEOCODER_TIMEOUT_SECS must be a whole number of seconds")?,
        };

        let policy = RequestPolicy {
            allowed_hosts: split_list(lookup("ALLOWED_HOSTS").as_deref().unwrap_or("")),
            cors_allowed_origins: split_list(
                lookup("CORS_ALLOWED_ORIGINS").as_deref().unwrap_or("*"),
            ),
            cors_max_age_secs: lookup("CORS_MAX_AGE_SECS")
                .unwrap_or_else(|| "86400".to_string())
                .parse::<u64>()
                .context("CORS_MAX_AGE_SECS must be a whole number of seconds")?,
        };

        let upload = UploadConfig {
            dir: lookup("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string()),
            public_base_url: lookup("UPLOAD_PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000/uploads".to_string()),
            max_bytes: lookup("UPLOAD_MAX_BYTES")
                .unwrap_or_else(|| (10 * 1024 * 1024).to_string())
                .parse::<usize>()
                .context("UPLOAD_MAX_BYTES must be a byte count")?,
        };

        let list_page_size = lookup("LIST_PAGE_SIZE")
            .unwrap_or_else(|| "100".to_string())
            .parse::<usize>()
            .context("LIST_PAGE_SIZE must be a positive integer")?;
        if list_page_size == 0 {
            bail!("LIST_PAGE_SIZE must be at least 1");
        }

        let service_port = lookup("SERVICE_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = lookup("SERVICE_HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        Ok(Config {
            store,
            geocoder,
            policy,
            upload,
            list_page_size,
            service_port,
            service_host,
        })
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        match &self.store {
            StoreBackend::Memory => tracing::info!("  Store: in-memory (data is lost on restart)"),
            StoreBackend::Spanner(spanner) => {
                tracing::info!("  Store: Spanner");
                tracing::info!("  Spanner emulator: {}",
                    spanner.emulator_host.as_deref().unwrap_or("disabled (using production)"));
                tracing::info!("  Spanner project: {}", spanner.project);
                tracing::info!("  Spanner instance: {}", spanner.instance);
                tracing::info!("  Spanner database: {}", spanner.database);
            }
        }
        tracing::info!("  Geocoder: {} (timeout {}s)", self.geocoder.base_url, self.geocoder.timeout_secs);
        if self.policy.allowed_hosts.is_empty() {
            tracing::info!("  Allowed hosts: any");
        } else {
            tracing::info!("  Allowed hosts: {}", self.policy.allowed_hosts.join(", "));
        }
        tracing::info!("  CORS origins: {}", self.policy.cors_allowed_origins.join(", "));
        tracing::info!("  Uploads: {} -> {}", self.upload.dir, self.upload.public_base_url);
        tracing::info!("  Listing page size: {}", self.list_page_size);
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn required_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SPANNER_PROJECT", "test-project"),
            ("SPANNER_INSTANCE", "test-instance"),
            ("SPANNER_DATABASE", "test-database"),
            ("GEOCODER_ACCESS_TOKEN", "pk.test"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(|name| vars.get(name).map(|value| value.to_string()))
    }

    #[test]
    fn test_config_with_all_vars() {
        let mut vars = required_vars();
        vars.insert("SPANNER_EMULATOR_HOST", "localhost:9010");
        vars.insert("SERVICE_PORT", "8080");
        vars.insert("SERVICE_HOST", "127.0.0.1");
        vars.insert("GEOCODER_BASE_URL", "http://localhost:9999/places");
        vars.insert("GEOCODER_TIMEOUT_SECS", "3");
        vars.insert("ALLOWED_HOSTS", "kindapi.example.dev, kindapi.example.workers.dev");
        vars.insert("CORS_ALLOWED_ORIGINS", "https://app.example.dev");
        vars.insert("CORS_MAX_AGE_SECS", "600");
        vars.insert("UPLOAD_DIR", "/tmp/uploads");
        vars.insert("UPLOAD_PUBLIC_BASE_URL", "https://cdn.example.dev");
        vars.insert("UPLOAD_MAX_BYTES", "1024");
        vars.insert("LIST_PAGE_SIZE", "25");

        let config = load(&vars).unwrap();

        assert_eq!(
            config.store,
            StoreBackend::Spanner(SpannerConfig {
                emulator_host: Some("localhost:9010".to_string()),
                project: "test-project".to_string(),
                instance: "test-instance".to_string(),
                database: "test-database".to_string(),
            })
        );
        assert_eq!(config.service_port, 8080);
        assert_eq!(config.service_host, "127.0.0.1");
        assert_eq!(config.geocoder.base_url, "http://localhost:9999/places");
        assert_eq!(config.geocoder.access_token, "pk.test");
        assert_eq!(config.geocoder.timeout_secs, 3);
        assert_eq!(
            config.policy.allowed_hosts,
            vec!["kindapi.example.dev", "kindapi.example.workers.dev"]
        );
        assert_eq!(config.policy.cors_allowed_origins, vec!["https://app.example.dev"]);
        assert_eq!(config.policy.cors_max_age_secs, 600);
        assert_eq!(config.upload.dir, "/tmp/uploads");
        assert_eq!(config.upload.max_bytes, 1024);
        assert_eq!(config.list_page_size, 25);
    }

    #[test]
    fn test_config_with_defaults() {
        let config = load(&required_vars()).unwrap();

        match config.store {
            StoreBackend::Spanner(spanner) => assert_eq!(spanner.emulator_host, None),
            StoreBackend::Memory => panic!("spanner should be the default backend"),
        }
        assert_eq!(config.service_port, 3000);
        assert_eq!(config.service_host, "0.0.0.0");
        assert_eq!(config.geocoder.base_url, DEFAULT_GEOCODER_BASE_URL);
        assert_eq!(config.geocoder.timeout_secs, 10);
        assert!(config.policy.allowed_hosts.is_empty());
        assert_eq!(config.policy.cors_allowed_origins, vec!["*"]);
        assert_eq!(config.policy.cors_max_age_secs, 86400);
        assert_eq!(config.upload.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.list_page_size, 100);
    }

    #[test]
    fn test_memory_backend_needs_no_spanner_vars() {
        let vars = HashMap::from([
            ("STORE_BACKEND", "memory"),
            ("GEOCODER_ACCESS_TOKEN", "pk.test"),
        ]);

        let config = load(&vars).unwrap();
        assert_eq!(config.store, StoreBackend::Memory);
    }

    #[test]
    fn test_unknown_backend() {
        let mut vars = required_vars();
        vars.insert("STORE_BACKEND", "redis");

        let error = load(&vars).unwrap_err();
        assert!(error.to_string().contains("STORE_BACKEND"));
    }

    #[test]
    fn test_missing_required_var() {
        let mut vars = required_vars();
        vars.remove("SPANNER_DATABASE");

        let error = load(&vars).unwrap_err();
        assert!(error.to_string().contains("SPANNER_DATABASE"));
    }

    #[test]
    fn test_missing_geocoder_token() {
        let mut vars = required_vars();
        vars.remove("GEOCODER_ACCESS_TOKEN");

        let error = load(&vars).unwrap_err();
        assert!(error.to_string().contains("GEOCODER_ACCESS_TOKEN"));
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = required_vars();
        vars.insert("SERVICE_PORT", "not-a-number");

        let error = load(&vars).unwrap_err();
        assert!(error.to_string().contains("SERVICE_PORT"));
    }

    #[test]
    fn test_port_out_of_range() {
        let mut vars = required_vars();
        vars.insert("SERVICE_PORT", "99999");

        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut vars = required_vars();
        vars.insert("LIST_PAGE_SIZE", "0");

        let error = load(&vars).unwrap_err();
        assert!(error.to_string().contains("LIST_PAGE_SIZE"));
    }
}
