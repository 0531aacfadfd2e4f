pub mod states;

use crate::core::config::ManagerConfig;
use crate::core::listeners::InboundMessage;
use crate::core::manager::{ConnectionManager, Hooks};
use crate::core::tungstenite::TungsteniteConnector;
use crate::traits::*;
use states::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Type-state builder for ConnectionManager
///
/// The URL must be set before `build()` is available. Everything else has
/// a default: [`ManagerConfig::default`], the tokio-tungstenite transport
/// and exponential backoff derived from the config.
pub struct ConnectionManagerBuilder<U>
where
    U: UrlState,
{
    _state: TypeState<U>,
    url: Option<String>,
    config: ManagerConfig,
    connector: Option<Arc<dyn Connector>>,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    hooks: Hooks,
    subscriptions: Vec<String>,
}

impl ConnectionManagerBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            url: None,
            config: ManagerConfig::default(),
            connector: None,
            reconnect_strategy: None,
            hooks: Hooks::default(),
            subscriptions: Vec::new(),
        }
    }

    pub fn url(self, url: impl Into<String>) -> ConnectionManagerBuilder<HasUrl> {
        ConnectionManagerBuilder {
            _state: TypeState::new(),
            url: Some(url.into()),
            config: self.config,
            connector: self.connector,
            reconnect_strategy: self.reconnect_strategy,
            hooks: self.hooks,
            subscriptions: self.subscriptions,
        }
    }
}

impl Default for ConnectionManagerBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration methods
impl<U> ConnectionManagerBuilder<U>
where
    U: UrlState,
{
    /// Replace the whole configuration
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.max_reconnect_attempts = Some(attempts);
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Set the PONG timeout for connection health tracking
    ///
    /// If a ping stays unanswered this long, the socket is closed with code
    /// 4000 and the normal reconnect path runs.
    ///
    /// Recommended value: 1.5x the heartbeat interval or more, since the
    /// check only runs on heartbeat ticks.
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.config.pong_timeout = Some(timeout);
        self
    }

    /// Enable batching with the given flush interval
    pub fn batching(mut self, interval: Duration) -> Self {
        self.config.enable_batching = true;
        self.config.batch_interval = interval;
        self
    }

    /// Plug in a transport other than tokio-tungstenite
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Override the backoff derived from the config
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    pub fn on_open(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks.on_open = Some(Arc::new(hook));
        self
    }

    pub fn on_close(mut self, hook: impl Fn(&CloseFrame) + Send + Sync + 'static) -> Self {
        self.hooks.on_close = Some(Arc::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.hooks.on_error = Some(Arc::new(hook));
        self
    }

    /// Called with the attempt number right before each reconnect attempt
    pub fn on_reconnect(mut self, hook: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.hooks.on_reconnect = Some(Arc::new(hook));
        self
    }

    /// Called for every inbound message except pongs, before listeners
    pub fn on_message(mut self, hook: impl Fn(&InboundMessage) + Send + Sync + 'static) -> Self {
        self.hooks.on_message = Some(Arc::new(hook));
        self
    }

    /// Resource to subscribe to on every open
    pub fn subscription(mut self, resource: impl Into<String>) -> Self {
        self.subscriptions.push(resource.into());
        self
    }

    pub fn subscriptions<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subscriptions
            .extend(resources.into_iter().map(Into::into));
        self
    }
}

// Build method - only available once the URL is set
impl ConnectionManagerBuilder<HasUrl> {
    /// Validate the configuration and start connecting
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<ConnectionManager> {
        let Some(url) = self.url else {
            return Err(LiveSocketError::Configuration("URL must be set".to_string()));
        };
        self.config.validate()?;

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(LiveSocketError::Configuration(
                "ConnectionManager must be built inside a tokio runtime".to_string(),
            ));
        }

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(TungsteniteConnector::new()));
        let strategy = self
            .reconnect_strategy
            .unwrap_or_else(|| Box::new(self.config.backoff()));

        debug!(url = %url, config = ?self.config, "Building connection manager");

        Ok(ConnectionManager::start(
            url,
            self.config,
            connector,
            strategy,
            self.hooks,
            self.subscriptions,
        ))
    }
}
