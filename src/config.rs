//! Binding configuration.
//!
//! Attribute names and scheduler limits. Every field has a default matching
//! the markup conventions documented in the crate root, so most hosts use
//! `BindConfig::default()`.

/// Markup conventions and scheduler limits shared by every component of a
/// [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindConfig {
    /// Attribute holding the serialized per-instance state.
    pub state_attribute: String,
    /// Attribute holding the serialized, non-reactive props.
    pub props_attribute: String,
    /// Attribute naming a ref. `ref="[name]"` forces list semantics.
    pub ref_attribute: String,
    /// Prefix marking a directive attribute (`:text`).
    pub directive_prefix: char,
    /// Prefix marking an event attribute (`@click.stop`).
    pub event_prefix: char,
    /// Inline display value used when `:show` hides an element.
    pub hidden_display: String,
    /// Consecutive flushes, each caused by writes made inside the previous
    /// flush, allowed before the queue is dropped.
    pub max_flush_depth: usize,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            state_attribute: "data-state".to_string(),
            props_attribute: "data-props".to_string(),
            ref_attribute: "ref".to_string(),
            directive_prefix: ':',
            event_prefix: '@',
            hidden_display: "none".to_string(),
            max_flush_depth: 100,
        }
    }
}

impl BindConfig {
    /// Split a markup attribute into directive name, if it is one.
    pub fn directive_name<'a>(&self, attribute: &'a str) -> Option<&'a str> {
        attribute
            .strip_prefix(self.directive_prefix)
            .filter(|name| !name.is_empty())
    }

    /// Split a markup attribute into an event declaration, if it is one.
    pub fn event_declaration<'a>(&self, attribute: &'a str) -> Option<&'a str> {
        attribute
            .strip_prefix(self.event_prefix)
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_split() {
        let config = BindConfig::default();
        assert_eq!(config.directive_name(":text"), Some("text"));
        assert_eq!(config.directive_name(":"), None);
        assert_eq!(config.directive_name("text"), None);
        assert_eq!(config.event_declaration("@click.stop"), Some("click.stop"));
        assert_eq!(config.event_declaration("click"), None);
    }
}
