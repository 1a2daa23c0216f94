use regex::Regex;
use std::time::Duration;

/// Which implementation backs the client data store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Direct Postgres connection through sqlx.
    Postgres { database_url: String },
    /// Supabase PostgREST endpoint.
    Supabase { url: String, key: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend: StoreBackend,
    pub intake_table: String,
    pub analysis_table: String,
    pub poll_interval: Duration,
    pub poller_enabled: bool,
    pub analysis_user_id: String,
    pub store_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match var("DB_URL").or_else(|| var("DATABASE_URL")) {
            Some(url) => {
                if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                    anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                }
                StoreBackend::Postgres { database_url: url }
            }
            None => {
                let url = var("SUPABASE_URL").ok_or_else(|| {
                    anyhow::anyhow!(
                        "DATABASE_URL or SUPABASE_URL + SUPABASE_KEY environment variables required"
                    )
                })?;
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!("SUPABASE_URL must start with http:// or https://");
                }
                let key = var("SUPABASE_KEY").ok_or_else(|| {
                    anyhow::anyhow!("SUPABASE_KEY environment variable required with SUPABASE_URL")
                })?;
                StoreBackend::Supabase {
                    url: url.trim_end_matches('/').to_string(),
                    key,
                }
            }
        };

        let port = var("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?;

        let intake_table = table_name(var("INTAKE_TABLE"), "client_forms", "INTAKE_TABLE")?;
        let analysis_table =
            table_name(var("ANALYSIS_TABLE"), "unified_table", "ANALYSIS_TABLE")?;

        let poll_interval_secs = bounded_secs(var("POLL_INTERVAL_SECS"), 5, 1..=3600)
            .map_err(|_| anyhow::anyhow!("POLL_INTERVAL_SECS must be between 1 and 3600"))?;
        let store_timeout_secs = bounded_secs(var("STORE_TIMEOUT_SECS"), 30, 1..=600)
            .map_err(|_| anyhow::anyhow!("STORE_TIMEOUT_SECS must be between 1 and 600"))?;

        let poller_enabled = match var("POLLER_ENABLED") {
            Some(v) => !matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            ),
            None => true,
        };

        let config = Self {
            port,
            backend,
            intake_table,
            analysis_table,
            poll_interval: Duration::from_secs(poll_interval_secs),
            poller_enabled,
            analysis_user_id: var("ANALYSIS_USER_ID")
                .unwrap_or_else(|| "default_user".to_string()),
            store_timeout: Duration::from_secs(store_timeout_secs),
        };

        // Log what was resolved (without sensitive values)
        match &config.backend {
            StoreBackend::Postgres { database_url } => tracing::debug!(
                "Store backend: postgres ({}...)",
                &database_url[..20.min(database_url.len())]
            ),
            StoreBackend::Supabase { url, .. } => {
                tracing::debug!("Store backend: supabase ({})", url)
            }
        }
        tracing::debug!(
            "Tables: intake={}, analysis={}",
            config.intake_table,
            config.analysis_table
        );
        tracing::debug!(
            "Poller enabled: {}, interval: {:?}",
            config.poller_enabled,
            config.poll_interval
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Table names are interpolated into SQL and REST paths, so only plain
/// (optionally schema-qualified) identifiers are accepted.
fn table_name(value: Option<String>, default: &str, key: &str) -> anyhow::Result<String> {
    let name = value.unwrap_or_else(|| default.to_string());
    let ident = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")?;
    if !ident.is_match(&name) {
        anyhow::bail!("{} must be a plain table identifier, got '{}'", key, name);
    }
    Ok(name)
}

fn bounded_secs(
    value: Option<String>,
    default: u64,
    range: std::ops::RangeInclusive<u64>,
) -> Result<u64, ()> {
    let secs = match value {
        Some(v) => v.trim().parse::<u64>().map_err(|_| ())?,
        None => default,
    };
    if range.contains(&secs) {
        Ok(secs)
    } else {
        Err(())
    }
}
