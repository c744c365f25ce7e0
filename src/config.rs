use envconfig::Envconfig;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    // Unset means in-memory storage
    #[envconfig(from = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[envconfig(from = "PORT", default = "3001")]
    pub port: u16,

    #[envconfig(from = "MAX_CONNECTIONS", default = "5")]
    pub max_connections: u32,

    #[envconfig(from = "JWT_SECRET")]
    pub jwt_secret: String,

    #[envconfig(from = "TOKEN_TTL_HOURS", default = "24")]
    pub token_ttl_hours: i64,

    #[envconfig(from = "BCRYPT_COST", default = "12")]
    pub bcrypt_cost: u32,

    #[envconfig(from = "ADMIN_USERNAME", default = "admin")]
    pub admin_username: String,

    // Built-in admin login is disabled unless a password is configured
    #[envconfig(from = "ADMIN_PASSWORD")]
    pub admin_password: Option<String>,
}

impl Config {
    /// Settings the request handlers need; the connection settings stay in `main`.
    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.jwt_secret.clone(),
            token_ttl_hours: self.token_ttl_hours,
            bcrypt_cost: self.bcrypt_cost,
            admin_username: self.admin_username.clone(),
            admin_password: self.admin_password.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub admin_username: String,
    pub admin_password: Option<String>,
}

impl AuthConfig {
    pub fn is_builtin_admin(&self, username: &str, password: &str) -> bool {
        match &self.admin_password {
            Some(expected) => username == self.admin_username && password == expected,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let config = Config::init_from_hashmap(&env(&[
            ("DATABASE_URL", "postgres://localhost/medstore"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/medstore"));
        assert_eq!(config.port, 3001);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.bcrypt_cost, 12);
        assert_eq!(config.admin_username, "admin");
        assert!(config.admin_password.is_none());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let result = Config::init_from_hashmap(&env(&[("DATABASE_URL", "postgres://x/y")]));
        assert!(result.is_err());
    }

    #[test]
    fn database_url_is_optional() {
        let config = Config::init_from_hashmap(&env(&[("JWT_SECRET", "secret")])).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn builtin_admin_requires_configured_password() {
        let mut auth = AuthConfig {
            jwt_secret: "s".into(),
            token_ttl_hours: 1,
            bcrypt_cost: 4,
            admin_username: "admin".into(),
            admin_password: None,
        };
        assert!(!auth.is_builtin_admin("admin", ""));

        auth.admin_password = Some("hunter2".into());
        assert!(auth.is_builtin_admin("admin", "hunter2"));
        assert!(!auth.is_builtin_admin("admin", "wrong"));
        assert!(!auth.is_builtin_admin("root", "hunter2"));
    }
}
