use std::net::SocketAddr;

pub const DEFAULT_SOCKET_ORIGIN: &str = "https://enchanting-sprite-cbb1aa.netlify.app";

/// Process configuration, read once at startup.
///
/// | Variable | Default |
/// |---|---|
/// | `DATABASE_URL` | `sqlite://roomchat.db?mode=rwc` |
/// | `HOST` | `0.0.0.0` |
/// | `PORT` | `5000` |
/// | `SOCKET_ALLOWED_ORIGINS` | [`DEFAULT_SOCKET_ORIGIN`] |
/// | `DB_MAX_CONNECTIONS` | `16` |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    /// Origins allowed to open the socket channel.
    pub socket_origins: Vec<String>,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_env_fn(|key| dotenv::var(key).ok())
    }

    fn from_env_fn<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = env("DATABASE_URL").unwrap_or_else(|| "sqlite://roomchat.db?mode=rwc".into());

        let host = env("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = env("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);
        let listen_addr = format!("{host}:{port}")
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));

        let socket_origins = env("SOCKET_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_else(|| vec![DEFAULT_SOCKET_ORIGIN.to_owned()]);

        let db_max_connections = env("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(16);

        Self {
            database_url,
            listen_addr,
            socket_origins,
            db_max_connections,
        }
    }

    pub fn allows_origin(&self, origin: &str) -> bool {
        self.socket_origins.iter().any(|allowed| allowed == "*" || allowed == origin)
    }
}
