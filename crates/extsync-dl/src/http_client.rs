use std::{
    sync::{LazyLock, PoisonError, RwLock},
    time::Duration,
};

use ureq::{
    http::{self, Uri},
    typestate::WithoutBody,
    Agent, Proxy, RequestBuilder,
};

pub const DEFAULT_USER_AGENT: &str = concat!("extsync/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    pub proxy: Option<Proxy>,
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    /// Creates a default ClientConfig with the `extsync/<version>` user agent and no proxy or
    /// timeout.
    fn default() -> Self {
        Self {
            user_agent: Some(DEFAULT_USER_AGENT.into()),
            proxy: None,
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Builds an HTTP `Agent` from this config.
    ///
    /// The agent follows redirects (the ureq default) and, as for every caller of the shared
    /// agent, treats 4xx/5xx responses as errors.
    pub fn build(&self) -> Agent {
        let mut config = ureq::Agent::config_builder()
            .proxy(self.proxy.clone())
            .timeout_global(self.timeout);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }
}

struct SharedClient {
    agent: Agent,
    config: ClientConfig,
}

static SHARED_CLIENT_STATE: LazyLock<RwLock<SharedClient>> = LazyLock::new(|| {
    let config = ClientConfig::default();
    let agent = config.build();

    RwLock::new(SharedClient {
        agent,
        config,
    })
});

/// Handle to the process-wide HTTP agent.
#[derive(Clone, Default)]
pub struct SharedAgent;

impl SharedAgent {
    pub fn new() -> Self {
        Self
    }

    /// Create a GET request builder for the given URI using the shared agent.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use extsync_dl::http_client::SHARED_AGENT;
    ///
    /// let response = SHARED_AGENT.get("https://example.com").call();
    /// ```
    pub fn get<T>(&self, uri: T) -> RequestBuilder<WithoutBody>
    where
        Uri: TryFrom<T>,
        <Uri as TryFrom<T>>::Error: Into<http::Error>,
    {
        let state = SHARED_CLIENT_STATE
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        state.agent.get(uri)
    }
}

pub static SHARED_AGENT: LazyLock<SharedAgent> = LazyLock::new(SharedAgent::new);

/// Updates the global shared HTTP client configuration and rebuilds the shared agent.
///
/// # Examples
///
/// ```
/// use extsync_dl::http_client::configure_http_client;
///
/// configure_http_client(|cfg| {
///     cfg.user_agent = Some("my-app/1.0".to_string());
/// });
/// ```
pub fn configure_http_client<F>(updater: F)
where
    F: FnOnce(&mut ClientConfig),
{
    let mut state = SHARED_CLIENT_STATE
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    let mut new_config = state.config.clone();
    updater(&mut new_config);
    state.agent = new_config.build();
    state.config = new_config;
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    async fn get_status(agent: Agent, url: String) -> Result<u16, ureq::Error> {
        tokio::task::spawn_blocking(move || {
            agent
                .get(url.as_str())
                .call()
                .map(|resp| resp.status().as_u16())
        })
        .await
        .unwrap()
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert!(config
            .user_agent
            .as_deref()
            .is_some_and(|ua| ua.starts_with("extsync/")));
        assert!(config.proxy.is_none());
        assert!(config.timeout.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_default_user_agent_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ua"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let agent = ClientConfig::default().build();
        let status = get_status(agent, format!("{}/ua", server.uri())).await;
        assert_eq!(status.unwrap(), 204);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_timeout_aborts_slow_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let agent = ClientConfig {
            timeout: Some(Duration::from_millis(200)),
            ..Default::default()
        }
        .build();
        let result = get_status(agent, format!("{}/slow", server.uri())).await;
        assert!(matches!(result, Err(ureq::Error::Timeout(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_configure_http_client_changes_shared_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shared"))
            .and(header("user-agent", "extsync-test/1.0"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        configure_http_client(|cfg| {
            cfg.user_agent = Some("extsync-test/1.0".to_string());
        });

        let url = format!("{}/shared", server.uri());
        let status = tokio::task::spawn_blocking(move || {
            SHARED_AGENT
                .get(url.as_str())
                .call()
                .map(|resp| resp.status().as_u16())
        })
        .await
        .unwrap();
        assert_eq!(status.unwrap(), 204);
    }
}
