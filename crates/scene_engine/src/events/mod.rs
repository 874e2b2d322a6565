//! Scene change notifications
//!
//! Scenes queue a [`SceneEvent`] for every structural change. The framework
//! drains those queues into an [`EventSystem`], which hands each event to the
//! handlers registered for its type. A handler returning `true` consumes the
//! event and later handlers do not see it.

use std::collections::HashMap;

use crate::foundation::collections::SceneKey;
use crate::scene::{AttributeChange, ComponentId, EntityId};

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneEventType {
    /// Entity was added to a scene
    EntityCreated,
    /// Entity was removed from a scene
    EntityRemoved,
    /// Component was added to an entity
    ComponentAdded,
    /// Component was removed from an entity
    ComponentRemoved,
    /// Attribute value changed
    AttributeChanged,
    /// Attribute was added to a dynamic component
    AttributeAdded,
    /// Attribute was removed from a dynamic component
    AttributeRemoved,
    /// Entity got a new parent or became a root
    EntityParentChanged,
    /// Entity was moved to another id
    EntityIdChanged,
    /// Every entity was removed
    SceneCleared,
}

/// One change in a scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneEvent {
    /// Type of event
    pub event_type: SceneEventType,
    /// Scene the change happened in
    pub scene: SceneKey,
    /// Entity concerned, 0 for scene-wide events
    pub entity: EntityId,
    /// Component concerned, if any
    pub component: Option<ComponentId>,
    /// Attribute id concerned, if any
    pub attribute: Option<String>,
    /// Propagation mode requested by the change
    pub change: AttributeChange,
}

impl SceneEvent {
    /// Create an entity-level event
    pub fn new(event_type: SceneEventType, scene: SceneKey, entity: EntityId, change: AttributeChange) -> Self {
        Self {
            event_type,
            scene,
            entity,
            component: None,
            attribute: None,
            change,
        }
    }

    /// Attach the component id (builder pattern)
    #[must_use]
    pub fn with_component(mut self, component: ComponentId) -> Self {
        self.component = Some(component);
        self
    }

    /// Attach the attribute id (builder pattern)
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding)
pub trait SceneEventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &SceneEvent) -> bool;
}

/// Event system with registration and queuing
/// Follows chain of responsibility pattern
#[derive(Default)]
pub struct EventSystem {
    queue: Vec<SceneEvent>,
    handlers: HashMap<SceneEventType, Vec<Box<dyn SceneEventHandler>>>,
}

impl EventSystem {
    /// Create a new empty event system
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a specific event type
    pub fn register_handler(&mut self, event_type: SceneEventType, handler: Box<dyn SceneEventHandler>) {
        self.handlers.entry(event_type).or_default().push(handler);
    }

    /// Queue an event for the next dispatch
    pub fn send(&mut self, event: SceneEvent) {
        self.queue.push(event);
    }

    /// Queue several events, keeping their order
    pub fn send_all(&mut self, events: impl IntoIterator<Item = SceneEvent>) {
        self.queue.extend(events);
    }

    /// Number of queued events
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Dispatch all pending events in the order they were sent
    pub fn dispatch(&mut self) {
        let queue = std::mem::take(&mut self.queue);
        for event in &queue {
            self.dispatch_event(event);
        }
    }

    /// Stops on first handler that returns true (consumed)
    fn dispatch_event(&mut self, event: &SceneEvent) {
        if let Some(handlers) = self.handlers.get_mut(&event.event_type) {
            for handler in handlers.iter_mut() {
                if handler.on_event(event) {
                    break;
                }
            }
        }
    }

    /// Drop all queued events
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
