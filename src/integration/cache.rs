use std::env;

use crate::integration;
use crate::integration::Result;

#[derive(Clone, Debug)]
pub struct Config {
    host: String,
    port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 6379,
        }
    }
}

impl Config {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn env() -> Result<Self> {
        let host = env::var("REDIS_HOST")?;
        let port = env::var("REDIS_PORT").unwrap_or("6379".into()).parse()?;
        Ok(Self { host, port })
    }

    pub fn url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }
}

pub async fn init(config: &Config) -> Result<redis::aio::ConnectionManager> {
    redis::Client::open(config.url())?
        .get_connection_manager()
        .await
        .map_err(integration::Error::from)
}
