use std::time::Duration;
use reqwest::{Client, ClientBuilder, Proxy};
use crate::errors::Result;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const MAX_IDLE_PER_HOST: usize = 8;

/// Shared HTTP client for catalog APIs. Every request is bounded by `timeout`.
#[derive(Clone)]
pub struct HttpPool {
    client: Client,
    timeout: Duration,
}

impl HttpPool {
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_seconds);
        let client = Self::builder(timeout).build()?;
        Ok(Self { client, timeout })
    }

    pub fn with_proxy(mut self, proxy_url: &str) -> Result<Self> {
        let proxy = Proxy::all(proxy_url)?;
        self.client = Self::builder(self.timeout).proxy(proxy).build()?;
        log::info!("🌐 [HTTP] Using proxy {}", proxy_url);
        Ok(self)
    }

    fn builder(timeout: Duration) -> ClientBuilder {
        ClientBuilder::new()
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .gzip(true)
            .brotli(true)
            .tcp_keepalive(Duration::from_secs(60))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
