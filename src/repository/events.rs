use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::composition::RepositoryComposition;
use crate::core::{Result, TypeInformation, Value};
use crate::reflect::{AnnotationKind, Method, TypeRegistry};

/// Receives domain events collected from saved or deleted aggregates.
pub trait DomainEventPublisher: Send + Sync {
    fn publish(&self, event: &Value);
}

impl<F> DomainEventPublisher for F
where
    F: Fn(&Value) + Send + Sync,
{
    fn publish(&self, event: &Value) {
        self(event)
    }
}

const DELETE_METHODS: [&str; 4] = ["delete", "deleteAll", "deleteInBatch", "deleteAllInBatch"];

fn is_event_publishing_method(method: &Method) -> bool {
    method.parameter_count() == 1
        && (method.name.starts_with("save") || DELETE_METHODS.contains(&method.name.as_str()))
}

/// Decorates a composition so that `save*` and `delete*` calls publish the
/// domain events exposed by their aggregate argument.
pub struct EventPublishingRepository {
    composition: RepositoryComposition,
    registry: TypeRegistry,
    publisher: Arc<dyn DomainEventPublisher>,
    // aggregate type -> name of its DomainEvents property
    event_properties: DashMap<String, Option<String>>,
}

impl EventPublishingRepository {
    pub fn new(
        composition: RepositoryComposition,
        registry: TypeRegistry,
        publisher: impl DomainEventPublisher + 'static,
    ) -> Self {
        Self {
            composition,
            registry,
            publisher: Arc::new(publisher),
            event_properties: DashMap::new(),
        }
    }

    pub fn composition(&self) -> &RepositoryComposition {
        &self.composition
    }

    /// Invokes `method`, then publishes events of the argument aggregates
    /// when the call succeeded.
    pub fn invoke(&self, method: &Method, args: Vec<Value>) -> Result<Value> {
        if !is_event_publishing_method(method) {
            return self.composition.invoke(method, args);
        }

        let argument = args.first().cloned().unwrap_or(Value::Null);
        let result = self.composition.invoke(method, args)?;

        let events = self.collect_events(&argument)?;
        if !events.is_empty() {
            debug!(method = %method, count = events.len(), "publishing domain events");
        }
        for event in &events {
            self.publisher.publish(event);
        }

        Ok(result)
    }

    fn collect_events(&self, argument: &Value) -> Result<Vec<Value>> {
        let mut events = Vec::new();
        match argument {
            Value::List(aggregates) | Value::Set(aggregates) => {
                for aggregate in aggregates {
                    self.events_of(aggregate, &mut events)?;
                }
            }
            aggregate => self.events_of(aggregate, &mut events)?,
        }
        Ok(events)
    }

    fn events_of(&self, aggregate: &Value, events: &mut Vec<Value>) -> Result<()> {
        let Some(bean) = aggregate.as_bean() else {
            return Ok(());
        };
        let Some(property) = self.event_property(bean.type_name())? else {
            return Ok(());
        };

        match bean.get(&property) {
            Value::Null => {}
            Value::List(items) | Value::Set(items) => {
                events.extend(items.iter().filter(|e| !e.is_null()).cloned())
            }
            event => events.push(event.clone()),
        }
        Ok(())
    }

    fn event_property(&self, type_name: &str) -> Result<Option<String>> {
        if let Some(cached) = self.event_properties.get(type_name) {
            return Ok(cached.value().clone());
        }

        let property = if self.registry.contains(type_name) {
            let type_info = TypeInformation::of(type_name);
            let field = self
                .registry
                .resolved_fields(&type_info)?
                .into_iter()
                .find(|f| f.annotations.iter().any(|a| a.is(&AnnotationKind::DomainEvents)))
                .map(|f| f.name);

            match field {
                Some(name) => Some(name),
                None => self
                    .registry
                    .resolved_accessors(&type_info)?
                    .into_iter()
                    .find(|a| a.annotations.iter().any(|a| a.is(&AnnotationKind::DomainEvents)))
                    .map(|a| a.name),
            }
        } else {
            None
        };

        Ok(self
            .event_properties
            .entry(type_name.to_string())
            .or_insert(property)
            .value()
            .clone())
    }
}

impl fmt::Debug for EventPublishingRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublishingRepository")
            .field("composition", &self.composition)
            .finish()
    }
}
