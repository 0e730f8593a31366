//! Gateway configuration.

/// Settings for one gateway session.
///
/// Passed in at construction — there is no global option state. The
/// defaults are fine for local use; embedders mostly set
/// [`service_host`](Self::service_host) to the remote service they
/// bridge to.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host label reported for remote participants in identity
    /// replies.
    pub service_host: String,

    /// Tail of the greeting notice sent after registration.
    pub greeting: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            service_host: "rooms.invalid".to_string(),
            greeting: "this is the Parlor gateway.".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Creates a new builder.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    /// Sets the host label used in identity replies.
    pub fn service_host(mut self, host: impl Into<String>) -> Self {
        self.config.service_host = host.into();
        self
    }

    /// Sets the post-registration greeting.
    pub fn greeting(mut self, greeting: impl Into<String>) -> Self {
        self.config.greeting = greeting.into();
        self
    }

    /// Finalizes the configuration.
    pub fn build(self) -> GatewayConfig {
        self.config
    }
}
