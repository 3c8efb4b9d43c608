//! Button and modal routing.
//!
//! Component ids have the shape `"{owner}_{local}"`. Command names may not
//! contain `_`, so the first delimiter always ends the owner.

use crate::descriptor::CommandDescriptor;
use crate::error::{Capability, LookupError};
use crate::handler::{ButtonHandler, ModalHandler};
use crate::registry::CommandRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Parsed component id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentKey {
    pub owner: String,
    pub local: String,
}

impl ComponentKey {
    pub const DELIMITER: char = '_';

    pub fn new(owner: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            local: local.into(),
        }
    }

    /// Split an id on its first delimiter.
    pub fn parse(id: &str) -> Result<Self, LookupError> {
        match id.split_once(Self::DELIMITER) {
            Some((owner, local)) if !owner.is_empty() => Ok(Self::new(owner, local)),
            _ => Err(LookupError::MalformedComponentId(id.to_string())),
        }
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.owner, Self::DELIMITER, self.local)
    }
}

/// Resolves component ids to the commands that own them.
#[derive(Clone)]
pub struct ComponentRouter {
    registry: Arc<CommandRegistry>,
}

impl ComponentRouter {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    /// Find the owning descriptor of a component id.
    pub fn route(&self, id: &str) -> Result<(Arc<CommandDescriptor>, ComponentKey), LookupError> {
        let key = ComponentKey::parse(id)?;
        let descriptor = self
            .registry
            .get(&key.owner)
            .ok_or_else(|| LookupError::UnknownComponentOwner {
                id: id.to_string(),
                owner: key.owner.clone(),
            })?;
        debug!(component = id, owner = %key.owner, "Routed component");
        Ok((descriptor, key))
    }

    /// Route a button press and fetch the owner's button handler.
    pub fn button_handler(
        &self,
        id: &str,
    ) -> Result<(Arc<CommandDescriptor>, ComponentKey, Arc<dyn ButtonHandler>), LookupError> {
        let (descriptor, key) = self.route(id)?;
        let handler = descriptor
            .button_handler()
            .cloned()
            .ok_or_else(|| missing(&descriptor, Capability::Button))?;
        Ok((descriptor, key, handler))
    }

    /// Route a modal submission and fetch the owner's modal handler.
    pub fn modal_handler(
        &self,
        id: &str,
    ) -> Result<(Arc<CommandDescriptor>, ComponentKey, Arc<dyn ModalHandler>), LookupError> {
        let (descriptor, key) = self.route(id)?;
        let handler = descriptor
            .modal_handler()
            .cloned()
            .ok_or_else(|| missing(&descriptor, Capability::Modal))?;
        Ok((descriptor, key, handler))
    }
}

fn missing(descriptor: &CommandDescriptor, capability: Capability) -> LookupError {
    LookupError::MissingCapability {
        command: descriptor.name().to_string(),
        capability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, CommandContext};
    use crate::response::CommandResponse;
    use async_trait::async_trait;

    struct Wave;

    #[async_trait]
    impl ButtonHandler for Wave {
        async fn on_button(
            &self,
            _key: &str,
            _ctx: &CommandContext<'_>,
        ) -> anyhow::Result<Option<CommandResponse>> {
            Ok(Some(CommandResponse::text("wave")))
        }
    }

    fn router() -> ComponentRouter {
        let hello = CommandDescriptor::builder("hello", handler_fn(|_| Ok(CommandResponse::text("hi"))))
            .description("Say hello")
            .on_button(Wave)
            .build()
            .unwrap();
        let plain = CommandDescriptor::builder("plain", handler_fn(|_| Ok(CommandResponse::text("hi"))))
            .description("No components")
            .build()
            .unwrap();

        let mut registry = CommandRegistry::new();
        registry.register(vec![hello, plain]);
        ComponentRouter::new(Arc::new(registry))
    }

    #[test]
    fn test_parse_splits_on_first_delimiter() {
        assert_eq!(
            ComponentKey::parse("hello_goodbye").unwrap(),
            ComponentKey::new("hello", "goodbye")
        );
        assert_eq!(
            ComponentKey::parse("hello_good_bye").unwrap(),
            ComponentKey::new("hello", "good_bye")
        );
        assert_eq!(ComponentKey::parse("hello_").unwrap(), ComponentKey::new("hello", ""));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            ComponentKey::parse("nodelimiter"),
            Err(LookupError::MalformedComponentId(_))
        ));
        assert!(matches!(
            ComponentKey::parse("_orphan"),
            Err(LookupError::MalformedComponentId(_))
        ));
    }

    #[test]
    fn test_display_round_trip() {
        let key = ComponentKey::new("hello", "goodbye");
        assert_eq!(key.to_string(), "hello_goodbye");
    }

    #[test]
    fn test_route_to_owner() {
        let (descriptor, key) = router().route("hello_goodbye").unwrap();
        assert_eq!(descriptor.name(), "hello");
        assert_eq!(key.local, "goodbye");
    }

    #[test]
    fn test_route_unknown_owner() {
        let result = router().route("nobody_goodbye");
        assert_eq!(
            result.unwrap_err(),
            LookupError::UnknownComponentOwner {
                id: "nobody_goodbye".into(),
                owner: "nobody".into()
            }
        );
    }

    #[test]
    fn test_missing_capability() {
        let router = router();
        assert!(router.button_handler("hello_goodbye").is_ok());
        assert_eq!(
            router.button_handler("plain_x").err(),
            Some(LookupError::MissingCapability {
                command: "plain".into(),
                capability: Capability::Button
            })
        );
        assert!(matches!(
            router.modal_handler("hello_form"),
            Err(LookupError::MissingCapability {
                capability: Capability::Modal,
                ..
            })
        ));
    }
}
