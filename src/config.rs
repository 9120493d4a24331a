use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Public base URL of this relay, used as the proxy endpoint prefix in
    /// rewritten manifests (e.g. `http://localhost:8001`).
    pub public_base_url: String,
    /// Referer sent upstream when the client request carries none.
    pub default_referer: String,
    pub is_dev: bool,
    /// Per-attempt timeout for manifest/segment fetches (default: 30s)
    pub fetch_timeout: Duration,
    /// Timeout for lightweight existence probes (default: 10s)
    pub probe_timeout: Duration,
    /// Retries after the initial attempt on retryable failures (default: 3)
    pub max_retries: u32,
    /// Base delay for exponential backoff between attempts (default: 1s)
    pub backoff_base: Duration,
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, the
    /// deployment-specific vars (PORT, PUBLIC_BASE_URL, DEFAULT_REFERER)
    /// are required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Check if running in dev mode
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        // Port: required in prod, defaults to 8001 in dev
        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "8001".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        // Public base URL: required in prod, defaults to localhost in dev
        let public_base_url = if is_dev {
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"))
        } else {
            env::var("PUBLIC_BASE_URL").map_err(|_| "PUBLIC_BASE_URL is required in production")?
        };

        // Default referer: required in prod, defaults to example.com in dev
        let default_referer = if is_dev {
            env::var("DEFAULT_REFERER").unwrap_or_else(|_| "https://example.com/".to_string())
        } else {
            env::var("DEFAULT_REFERER").map_err(|_| "DEFAULT_REFERER is required in production")?
        };

        let fetch_timeout_secs: u64 = env::var("FETCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let probe_timeout_secs: u64 = env::var("PROBE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let max_retries: u32 = env::var("MAX_RETRIES")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .unwrap_or(3);

        let backoff_base_ms: u64 = env::var("BACKOFF_BASE_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .unwrap_or(1000);

        Ok(Config {
            port,
            public_base_url,
            default_referer,
            is_dev,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            probe_timeout: Duration::from_secs(probe_timeout_secs),
            max_retries,
            backoff_base: Duration::from_millis(backoff_base_ms),
        })
    }

    /// Absolute proxy endpoint used as the rewrite target
    /// (e.g. `http://localhost:8001/proxy`).
    pub fn proxy_endpoint(&self) -> String {
        format!("{}/proxy", self.public_base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serialize all env-var tests to prevent races between parallel test threads.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Set env vars, run `f`, then restore original state.
    ///
    /// `set` — vars to set; `unset` — vars to remove before running `f`.
    fn with_env(set: &[(&str, &str)], unset: &[&str], f: impl FnOnce()) {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());

        // Save state for all touched vars
        let save_set: Vec<(&str, Option<String>)> = set
            .iter()
            .map(|(k, _)| (*k, std::env::var(k).ok()))
            .collect();
        let save_unset: Vec<(&str, Option<String>)> =
            unset.iter().map(|k| (*k, std::env::var(k).ok())).collect();

        for (k, v) in set {
            // SAFETY: serialized by ENV_LOCK — no other thread modifies env vars concurrently.
            unsafe { std::env::set_var(k, v) };
        }
        for k in unset {
            unsafe { std::env::remove_var(k) };
        }

        f();

        // Restore
        for (k, old) in save_set.into_iter().chain(save_unset) {
            match old {
                Some(v) => unsafe { std::env::set_var(k, v) },
                None => unsafe { std::env::remove_var(k) },
            }
        }
    }

    const ALL_VARS: &[&str] = &[
        "PORT",
        "PUBLIC_BASE_URL",
        "DEFAULT_REFERER",
        "FETCH_TIMEOUT_SECS",
        "PROBE_TIMEOUT_SECS",
        "MAX_RETRIES",
        "BACKOFF_BASE_MS",
    ];

    #[test]
    fn dev_mode_uses_defaults() {
        with_env(&[("DEV_MODE", "true")], ALL_VARS, || {
            let config = Config::from_env().expect("should succeed in dev mode");
            assert!(config.is_dev);
            assert_eq!(config.port, 8001);
            assert_eq!(config.public_base_url, "http://localhost:8001");
            assert_eq!(config.default_referer, "https://example.com/");
            assert_eq!(config.fetch_timeout, Duration::from_secs(30));
            assert_eq!(config.probe_timeout, Duration::from_secs(10));
            assert_eq!(config.max_retries, 3);
            assert_eq!(config.backoff_base, Duration::from_millis(1000));
        });
    }

    #[test]
    fn prod_mode_requires_port() {
        with_env(
            &[],
            &["DEV_MODE", "PORT", "PUBLIC_BASE_URL", "DEFAULT_REFERER"],
            || {
                let result = Config::from_env();
                assert!(result.is_err(), "Should fail without PORT in prod mode");
            },
        );
    }

    #[test]
    fn prod_mode_requires_public_base_url() {
        with_env(
            &[("PORT", "8080")],
            &["DEV_MODE", "PUBLIC_BASE_URL", "DEFAULT_REFERER"],
            || {
                let result = Config::from_env();
                assert!(
                    result.is_err(),
                    "Should fail without PUBLIC_BASE_URL in prod mode"
                );
            },
        );
    }

    #[test]
    fn prod_mode_requires_default_referer() {
        with_env(
            &[
                ("PORT", "8080"),
                ("PUBLIC_BASE_URL", "https://relay.example.com"),
            ],
            &["DEV_MODE", "DEFAULT_REFERER"],
            || {
                let result = Config::from_env();
                assert!(
                    result.is_err(),
                    "Should fail without DEFAULT_REFERER in prod mode"
                );
            },
        );
    }

    #[test]
    fn dev_port_override_flows_into_base_url() {
        with_env(
            &[("DEV_MODE", "true"), ("PORT", "9000")],
            &["PUBLIC_BASE_URL"],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.port, 9000);
                assert_eq!(config.public_base_url, "http://localhost:9000");
            },
        );
    }

    #[test]
    fn timeouts_parsed() {
        with_env(
            &[
                ("DEV_MODE", "true"),
                ("FETCH_TIMEOUT_SECS", "15"),
                ("PROBE_TIMEOUT_SECS", "5"),
            ],
            &[],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.fetch_timeout, Duration::from_secs(15));
                assert_eq!(config.probe_timeout, Duration::from_secs(5));
            },
        );
    }

    #[test]
    fn retry_settings_parsed() {
        with_env(
            &[
                ("DEV_MODE", "true"),
                ("MAX_RETRIES", "5"),
                ("BACKOFF_BASE_MS", "250"),
            ],
            &[],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.max_retries, 5);
                assert_eq!(config.backoff_base, Duration::from_millis(250));
            },
        );
    }

    #[test]
    fn unparseable_timeout_falls_back_to_default() {
        with_env(
            &[("DEV_MODE", "true"), ("FETCH_TIMEOUT_SECS", "soon")],
            &[],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.fetch_timeout, Duration::from_secs(30));
            },
        );
    }

    #[test]
    fn proxy_endpoint_strips_trailing_slash() {
        with_env(
            &[
                ("DEV_MODE", "true"),
                ("PUBLIC_BASE_URL", "http://localhost:8001/"),
            ],
            &[],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.proxy_endpoint(), "http://localhost:8001/proxy");
            },
        );
    }
}
