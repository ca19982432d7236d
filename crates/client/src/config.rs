//! Agent configuration, resolved once at page load.

use std::time::Duration;

use devreload_shared::{
    StartupError, CACHE_BUST_PARAM, ENDPOINT_META_NAME, RECONNECT_DELAY_MS, SUBPROTOCOL,
};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Absolute channel endpoint, e.g. `ws://localhost:3001/dev`
    pub endpoint: Url,
    /// Sub-protocol requested when opening the channel
    pub protocol: String,
    /// Fixed delay before every reconnection attempt
    pub reconnect_delay: Duration,
    /// Query parameter carrying the cache-busting token
    pub cache_bust_param: String,
}

impl AgentConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            protocol: SUBPROTOCOL.to_string(),
            reconnect_delay: Duration::from_millis(u64::from(RECONNECT_DELAY_MS)),
            cache_bust_param: CACHE_BUST_PARAM.to_string(),
        }
    }

    /// Build the config from the `content` of the endpoint meta tag.
    ///
    /// `None` means the tag is absent. There is no default endpoint.
    pub fn from_meta(content: Option<&str>) -> Result<Self, StartupError> {
        let value = content.ok_or_else(|| StartupError::MissingEndpoint {
            name: ENDPOINT_META_NAME.to_string(),
        })?;
        let endpoint =
            Url::parse(value.trim()).map_err(|source| StartupError::InvalidEndpoint {
                value: value.to_string(),
                source,
            })?;
        Ok(Self::new(endpoint))
    }

    /// Reconnect delay in the millisecond unit browser timers take
    pub fn reconnect_delay_ms(&self) -> u32 {
        u32::try_from(self.reconnect_delay.as_millis()).unwrap_or(u32::MAX)
    }
}

/// Read the endpoint declaration from `document.head`.
#[cfg(target_arch = "wasm32")]
pub fn from_document(document: &web_sys::Document) -> Result<AgentConfig, StartupError> {
    use wasm_bindgen::JsCast;

    let selector = format!("[name=\"{}\"]", ENDPOINT_META_NAME);
    let content = document
        .head()
        .and_then(|head| head.query_selector(&selector).ok().flatten())
        .and_then(|el| el.dyn_into::<web_sys::HtmlMetaElement>().ok())
        .map(|meta| meta.content());
    AgentConfig::from_meta(content.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_absolute_endpoint() {
        let config = AgentConfig::from_meta(Some(" ws://localhost:3001/dev ")).unwrap();
        assert_eq!(config.endpoint.as_str(), "ws://localhost:3001/dev");
        assert_eq!(config.protocol, "ws");
        assert_eq!(config.reconnect_delay_ms(), 2000);
        assert_eq!(config.cache_bust_param, "v");
    }

    #[test]
    fn missing_meta_is_fatal() {
        let err = AgentConfig::from_meta(None).unwrap_err();
        assert!(matches!(err, StartupError::MissingEndpoint { ref name } if name == "dev-socket-url"));
    }

    #[test]
    fn relative_endpoint_is_fatal() {
        let err = AgentConfig::from_meta(Some("/dev")).unwrap_err();
        assert!(matches!(err, StartupError::InvalidEndpoint { ref value, .. } if value == "/dev"));
    }

    #[test]
    fn empty_endpoint_is_fatal() {
        assert!(AgentConfig::from_meta(Some("")).is_err());
    }
}
