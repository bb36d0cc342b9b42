// Message aggregator - collects non-fatal problems for the user

use tracing::{error, warn};

/// Ordered collection of warnings and errors raised during an import
///
/// Every message is also mirrored to the tracing log.
#[derive(Debug, Default, Clone)]
pub struct MessageAggregator {
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl MessageAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        warn!("{}", msg);
        self.warnings.push(msg);
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        error!("{}", msg);
        self.errors.push(msg);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Take all warnings, leaving the aggregator empty of them
    pub fn consume_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub fn consume_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_drains() {
        let mut msgs = MessageAggregator::new();
        msgs.add_warning("first");
        msgs.add_warning(String::from("second"));
        msgs.add_error("boom");

        assert_eq!(msgs.warnings().len(), 2);
        assert_eq!(msgs.consume_warnings(), vec!["first", "second"]);
        assert!(msgs.warnings().is_empty());

        assert_eq!(msgs.consume_errors(), vec!["boom"]);
        assert!(msgs.errors().is_empty());
    }
}
