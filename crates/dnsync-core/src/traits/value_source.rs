// # Value Source Trait
//
// Defines where the record value comes from on each tick.
//
// ## Implementations
//
// - Static content: [`StaticValue`] in this module
// - Public IP over HTTP: `dnsync-ip-http` crate
//
// A source is asked once per tick. It must not cache across ticks or poll in
// the background: the scheduler decides when a value is needed.

use async_trait::async_trait;

/// Trait for value source implementations
#[async_trait]
pub trait ValueSource: Send + Sync {
    /// Resolve the value the record should hold right now
    async fn current(&self) -> Result<String, crate::Error>;

    /// Short description for logs (e.g. the URL queried)
    fn describe(&self) -> String;
}

/// A source that always yields the configured content
#[derive(Debug, Clone)]
pub struct StaticValue {
    content: String,
}

impl StaticValue {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[async_trait]
impl ValueSource for StaticValue {
    async fn current(&self) -> Result<String, crate::Error> {
        Ok(self.content.clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

/// Helper trait for constructing value sources from configuration
pub trait ValueSourceFactory: Send + Sync {
    /// Create a ValueSource instance from configuration
    fn create(
        &self,
        config: &crate::config::ValueConfig,
        record_type: crate::config::RecordType,
    ) -> Result<Box<dyn ValueSource>, crate::Error>;
}
