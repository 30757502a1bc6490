use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use super::entity::PersistentEntity;
use crate::core::TypeInformation;
use crate::reflect::{
    AccessType, AccessorDescriptor, Annotation, AnnotationKind, FieldDescriptor, SimpleTypeHolder,
    find_annotation,
};

/// Raw material for a persistent property: a field, a bean accessor
/// descriptor, or both sharing one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: String,
    type_info: TypeInformation,
    field: Option<FieldDescriptor>,
    accessor: Option<AccessorDescriptor>,
}

impl Property {
    pub fn of_field(field: FieldDescriptor, accessor: Option<AccessorDescriptor>) -> Self {
        Self {
            name: field.name.clone(),
            type_info: field.type_info.clone(),
            field: Some(field),
            accessor,
        }
    }

    pub fn of_accessor(accessor: AccessorDescriptor) -> Self {
        Self {
            name: accessor.name.clone(),
            type_info: accessor.type_info.clone(),
            field: None,
            accessor: Some(accessor),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_information(&self) -> &TypeInformation {
        &self.type_info
    }

    pub fn field(&self) -> Option<&FieldDescriptor> {
        self.field.as_ref()
    }

    pub fn accessor(&self) -> Option<&AccessorDescriptor> {
        self.accessor.as_ref()
    }

    pub fn is_field_backed(&self) -> bool {
        self.field.is_some()
    }

    pub fn has_accessor(&self) -> bool {
        self.accessor.as_ref().is_some_and(AccessorDescriptor::has_accessor)
    }

    pub fn has_getter(&self) -> bool {
        self.accessor.as_ref().is_some_and(|a| a.has_getter)
    }

    pub fn has_setter(&self) -> bool {
        self.accessor.as_ref().is_some_and(|a| a.has_setter)
    }

    pub fn has_wither(&self) -> bool {
        self.accessor.as_ref().is_some_and(|a| a.has_wither)
    }

    /// Field annotations first, then accessor annotations.
    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        let field = self.field.iter().flat_map(|f| f.annotations.iter());
        let accessor = self.accessor.iter().flat_map(|a| a.annotations.iter());
        field.chain(accessor)
    }
}

/// Link from an owning property to the aggregate it references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Association {
    inverse: String,
    owner: TypeInformation,
    target: TypeInformation,
}

impl Association {
    pub fn new(inverse: impl Into<String>, owner: TypeInformation, target: TypeInformation) -> Self {
        Self {
            inverse: inverse.into(),
            owner,
            target,
        }
    }

    /// Name of the property on the owning entity that holds the reference.
    pub fn inverse(&self) -> &str {
        &self.inverse
    }

    pub fn owner(&self) -> &TypeInformation {
        &self.owner
    }

    pub fn target(&self) -> &TypeInformation {
        &self.target
    }
}

/// State shared by every persistent property implementation, derived once
/// at construction.
pub struct PropertyCore {
    property: Property,
    owner: Weak<PersistentEntity>,
    owner_type: TypeInformation,
    owner_is_interface: bool,
    owner_annotations: Vec<Annotation>,
    entity_type: Option<TypeInformation>,
    immutable: bool,
    association: OnceLock<Option<Association>>,
}

impl PropertyCore {
    pub fn new(
        property: Property,
        owner: &Arc<PersistentEntity>,
        simple_types: &SimpleTypeHolder,
    ) -> Self {
        let immutable = !property.has_setter()
            && property.field().is_none_or(|f| f.modifiers.is_final);

        let actual = property.type_information().actual_type();
        let entity_type = (!simple_types.is_simple_type(actual)
            && !actual.is_collection_like()
            && !actual.is_map()
            && !actual.is_variable())
        .then(|| actual.clone());

        Self {
            owner: Arc::downgrade(owner),
            owner_type: owner.type_information().clone(),
            owner_is_interface: owner.descriptor().is_interface(),
            owner_annotations: owner.descriptor().annotations.clone(),
            entity_type,
            immutable,
            association: OnceLock::new(),
            property,
        }
    }

    pub fn property(&self) -> &Property {
        &self.property
    }
}

impl fmt::Debug for PropertyCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyCore")
            .field("name", &self.property.name)
            .field("type", &self.property.type_info.to_string())
            .field("owner", &self.owner_type.to_string())
            .finish()
    }
}

/// Metadata for one field/accessor pair of a persistent entity.
///
/// Store flavours implement [`core`](Self::core) and override the
/// classification hooks they need; the provided defaults are
/// annotation-driven.
pub trait PersistentProperty: fmt::Debug + Send + Sync {
    fn core(&self) -> &PropertyCore;

    fn is_id_property(&self) -> bool {
        self.is_annotation_present(&AnnotationKind::Id)
    }

    fn is_version_property(&self) -> bool {
        self.is_annotation_present(&AnnotationKind::Version)
    }

    fn is_transient(&self) -> bool {
        self.core()
            .property
            .field()
            .is_some_and(|f| f.modifiers.is_transient)
            || self.is_annotation_present(&AnnotationKind::Transient)
    }

    fn is_association(&self) -> bool {
        !self.is_transient() && self.is_annotation_present(&AnnotationKind::Reference)
    }

    fn is_writable(&self) -> bool {
        !self.is_transient() && !self.is_annotation_present(&AnnotationKind::ReadOnly)
    }

    fn is_readable(&self) -> bool {
        !self.is_transient()
    }

    /// Access through accessors instead of the field: always for interface
    /// owners, otherwise when requested via `AccessType(Property)`.
    fn uses_property_access(&self) -> bool {
        let requested = matches!(
            self.find_property_or_owner_annotation(&AnnotationKind::AccessType),
            Some(Annotation::AccessType(AccessType::Property))
        );
        requested || self.core().owner_is_interface
    }

    fn name(&self) -> &str {
        self.core().property.name()
    }

    fn type_information(&self) -> &TypeInformation {
        self.core().property.type_information()
    }

    fn raw_type_name(&self) -> &str {
        self.type_information().name()
    }

    fn actual_type(&self) -> &TypeInformation {
        self.type_information().actual_type()
    }

    fn component_type(&self) -> Option<&TypeInformation> {
        self.type_information().component_type()
    }

    fn map_value_type(&self) -> Option<&TypeInformation> {
        self.type_information().map_value_type()
    }

    fn is_collection_like(&self) -> bool {
        self.type_information().is_collection_like()
    }

    fn is_map(&self) -> bool {
        self.type_information().is_map()
    }

    fn is_array(&self) -> bool {
        self.type_information().is_array()
    }

    fn is_entity(&self) -> bool {
        !self.is_transient() && self.core().entity_type.is_some()
    }

    fn is_immutable(&self) -> bool {
        self.core().immutable
    }

    fn is_field_backed(&self) -> bool {
        self.core().property.is_field_backed()
    }

    fn has_getter(&self) -> bool {
        self.core().property.has_getter()
    }

    fn has_setter(&self) -> bool {
        self.core().property.has_setter()
    }

    fn has_wither(&self) -> bool {
        self.core().property.has_wither()
    }

    fn owner_type(&self) -> &TypeInformation {
        &self.core().owner_type
    }

    /// The owning entity, unless it has already been dropped.
    fn owner(&self) -> Option<Arc<PersistentEntity>> {
        self.core().owner.upgrade()
    }

    fn find_annotation(&self, kind: &AnnotationKind) -> Option<&Annotation> {
        self.core().property.annotations().find(|a| a.is(kind))
    }

    fn is_annotation_present(&self, kind: &AnnotationKind) -> bool {
        self.find_annotation(kind).is_some()
    }

    fn find_property_or_owner_annotation(&self, kind: &AnnotationKind) -> Option<&Annotation> {
        self.find_annotation(kind)
            .or_else(|| find_annotation(&self.core().owner_annotations, kind))
    }

    /// Explicit `Reference` target, or the property's actual type.
    fn association_target_type(&self) -> Option<TypeInformation> {
        match self.find_annotation(&AnnotationKind::Reference)? {
            Annotation::Reference(Some(target)) => Some(TypeInformation::of(target.as_str())),
            _ => Some(self.actual_type().clone()),
        }
    }

    fn association(&self) -> Option<Association> {
        self.core()
            .association
            .get_or_init(|| {
                if !self.is_association() {
                    return None;
                }
                let target = self.association_target_type()?;
                Some(Association::new(self.name(), self.owner_type().clone(), target))
            })
            .clone()
    }

    /// Entity types reachable through this property (at most one).
    fn persistent_entity_types(&self) -> Vec<TypeInformation> {
        if !self.is_entity() {
            return Vec::new();
        }
        self.core().entity_type.iter().cloned().collect()
    }
}

/// Default annotation-driven property.
#[derive(Debug)]
pub struct AnnotationBasedPersistentProperty {
    core: PropertyCore,
}

impl AnnotationBasedPersistentProperty {
    pub fn new(
        property: Property,
        owner: &Arc<PersistentEntity>,
        simple_types: &SimpleTypeHolder,
    ) -> Self {
        Self {
            core: PropertyCore::new(property, owner, simple_types),
        }
    }
}

impl PersistentProperty for AnnotationBasedPersistentProperty {
    fn core(&self) -> &PropertyCore {
        &self.core
    }
}
