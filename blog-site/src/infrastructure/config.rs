use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    pub sidebar_size: u64,
    pub admin: Option<AdminAccount>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".into());
        let port = lookup("PORT")
            .unwrap_or_else(|| "8080".into())
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid PORT: {}", e))?;
        let storage = match lookup("STORAGE")
            .unwrap_or_else(|| "postgres".into())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => anyhow::bail!("invalid STORAGE: {} (expected postgres or memory)", other),
        };
        let database_url = lookup("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set");
        }
        let jwt_secret = lookup("JWT_SECRET").ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set"))?;
        let session_ttl_hours = lookup("SESSION_TTL_HOURS")
            .unwrap_or_else(|| "24".into())
            .parse::<i64>()
            .map_err(|e| anyhow::anyhow!("invalid SESSION_TTL_HOURS: {}", e))?;
        if session_ttl_hours <= 0 {
            anyhow::bail!("SESSION_TTL_HOURS must be positive");
        }
        let secure_cookies = parse_flag(lookup("SECURE_COOKIES").as_deref())
            .ok_or_else(|| anyhow::anyhow!("invalid SECURE_COOKIES"))?;
        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let sidebar_size = lookup("SIDEBAR_SIZE")
            .unwrap_or_else(|| "3".into())
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid SIDEBAR_SIZE: {}", e))?;
        let admin = match (lookup("ADMIN_USERNAME"), lookup("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminAccount {
                email: lookup("ADMIN_EMAIL").unwrap_or_else(|| format!("{username}@localhost.localdomain")),
                username,
                password,
            }),
            (None, None) => None,
            _ => anyhow::bail!("ADMIN_USERNAME and ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            host,
            port,
            storage,
            database_url,
            jwt_secret,
            session_ttl_hours,
            secure_cookies,
            cors_origins,
            sidebar_size,
            admin,
        })
    }
}

fn parse_flag(value: Option<&str>) -> Option<bool> {
    match value.map(|v| v.trim().to_lowercase()) {
        None => Some(false),
        Some(v) => match v.as_str() {
            "" | "0" | "false" | "no" | "off" => Some(false),
            "1" | "true" | "yes" | "on" => Some(true),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_for_memory_storage() {
        let config =
            AppConfig::from_lookup(lookup(&[("STORAGE", "memory"), ("JWT_SECRET", "s")])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.sidebar_size, 3);
        assert!(!config.secure_cookies);
        assert!(config.cors_origins.is_empty());
        assert!(config.admin.is_none());
    }

    #[test]
    fn postgres_requires_database_url() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s"),
            ("DATABASE_URL", "postgres://localhost/blog"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("SECURE_COOKIES", "true"),
        ]))
        .unwrap();
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.cors_origins, ["http://a.test", "http://b.test"]);
        assert!(config.secure_cookies);
    }

    #[test]
    fn jwt_secret_is_required() {
        assert!(AppConfig::from_lookup(lookup(&[("STORAGE", "memory")])).is_err());
    }

    #[test]
    fn admin_credentials_come_in_pairs() {
        let partial = AppConfig::from_lookup(lookup(&[
            ("STORAGE", "memory"),
            ("JWT_SECRET", "s"),
            ("ADMIN_USERNAME", "root"),
        ]));
        assert!(partial.is_err());

        let config = AppConfig::from_lookup(lookup(&[
            ("STORAGE", "memory"),
            ("JWT_SECRET", "s"),
            ("ADMIN_USERNAME", "root"),
            ("ADMIN_PASSWORD", "Sup3rSecret!"),
        ]))
        .unwrap();
        let admin = config.admin.unwrap();
        assert_eq!(admin.username, "root");
        assert_eq!(admin.email, "root@localhost.localdomain");
    }

    #[test]
    fn rejects_bad_values() {
        for (key, value) in [
            ("PORT", "eighty"),
            ("STORAGE", "sqlite"),
            ("SESSION_TTL_HOURS", "0"),
            ("SECURE_COOKIES", "maybe"),
        ] {
            let result = AppConfig::from_lookup(lookup(&[
                ("STORAGE", "memory"),
                ("JWT_SECRET", "s"),
                (key, value),
            ]));
            assert!(result.is_err(), "{key}={value} should be rejected");
        }
    }
}
