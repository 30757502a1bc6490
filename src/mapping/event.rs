use std::sync::Arc;

use super::entity::PersistentEntity;
use crate::core::TypeInformation;

/// Published once for every entity a mapping context creates.
#[derive(Debug, Clone)]
pub struct MappingContextEvent {
    type_information: TypeInformation,
    entity: Arc<PersistentEntity>,
}

impl MappingContextEvent {
    pub fn new(type_information: TypeInformation, entity: Arc<PersistentEntity>) -> Self {
        Self {
            type_information,
            entity,
        }
    }

    pub fn type_information(&self) -> &TypeInformation {
        &self.type_information
    }

    pub fn entity(&self) -> &Arc<PersistentEntity> {
        &self.entity
    }
}

pub trait MappingEventListener: Send + Sync {
    fn on_entity_created(&self, event: &MappingContextEvent);
}

impl<F> MappingEventListener for F
where
    F: Fn(&MappingContextEvent) + Send + Sync,
{
    fn on_entity_created(&self, event: &MappingContextEvent) {
        self(event)
    }
}
