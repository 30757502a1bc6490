//! Property paths: validated chains of property names navigating from a
//! root type through nested types.
//!
//! A source such as `address.city`, `address_city` or `addressCity` is
//! split on `_`/`.` first; a part that does not name a property is then
//! split at camel-case boundaries from the right, retrying the head and
//! re-attaching the peeled suffix to the remainder of the path.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use regex::Regex;
use tracing::trace;

use crate::core::{MappingError, Result, TypeInformation};
use crate::reflect::TypeRegistry;

/// Maximum number of segments a path may accumulate while parsing.
pub const MAX_PATH_DEPTH: usize = 1000;

lazy_static::lazy_static! {
    static ref SPLITTER: Regex = Regex::new(r"(?:[_.]?([_.]*?[^_.]+))").unwrap();
    static ref SPLITTER_FOR_QUOTED: Regex = Regex::new(r"(?:[.]?([.]*?[^.]+))").unwrap();
    static ref NESTED_PROPERTY: Regex = Regex::new(r"\p{Lu}[\p{Ll}\p{Nd}]*$").unwrap();
    static ref QUOTED: Regex = Regex::new(r"^\\Q.*\\E$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Segment {
    owning_type: TypeInformation,
    name: String,
    type_info: TypeInformation,
    actual_type: TypeInformation,
    is_collection: bool,
}

impl Segment {
    fn resolve(
        registry: &TypeRegistry,
        source: &str,
        owning_type: &TypeInformation,
        base: &[Segment],
    ) -> Result<Self> {
        let name = decapitalize(source);

        let type_info = registry.property_type(owning_type, &name).ok_or_else(|| {
            MappingError::PropertyReference {
                property: name.clone(),
                owner: owning_type.to_string(),
                resolved: base.iter().map(|s| s.name.clone()).collect(),
            }
        })?;

        Ok(Self {
            owning_type: owning_type.clone(),
            actual_type: type_info.actual_type().clone(),
            is_collection: type_info.is_collection_like(),
            name,
            type_info,
        })
    }
}

/// Bean-style decapitalization: `Name` -> `name`, but `URL` stays `URL`.
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    if let Some(second) = chars.next()
        && first.is_uppercase()
        && second.is_uppercase()
    {
        return name.to_string();
    }

    first.to_lowercase().chain(name.chars().skip(1)).collect()
}

/// One node of a resolved path. Cloning is cheap: all nodes of a path share
/// one segment list and differ only in their starting position.
#[derive(Debug, Clone)]
pub struct PropertyPath {
    segments: Arc<[Segment]>,
    position: usize,
}

impl PropertyPath {
    /// Parses `source` against `owner`, returning the cached instance when
    /// the same pair was parsed before.
    pub fn from(source: &str, owner: &TypeInformation, registry: &TypeRegistry) -> Result<Arc<Self>> {
        let key = (owner.clone(), source.to_string());
        let cache = registry.path_cache();

        if let Some(path) = cache.get(&key)? {
            trace!(path = source, owner = %owner, "property path cache hit");
            return Ok(path);
        }

        let path = Arc::new(Self::parse(source, owner, registry)?);
        cache.put(key, Arc::clone(&path))?;
        Ok(path)
    }

    fn parse(source: &str, owner: &TypeInformation, registry: &TypeRegistry) -> Result<Self> {
        let parts = split(source);
        if parts.is_empty() {
            return Err(MappingError::InvalidArgument(format!(
                "Expected parsing to yield a property path from '{}'",
                source
            )));
        }

        let mut segments: Vec<Segment> = Vec::new();
        for part in parts {
            if segments.len() > MAX_PATH_DEPTH {
                return Err(MappingError::ParseDepthExceeded(MAX_PATH_DEPTH));
            }

            let type_info = match segments.last() {
                Some(previous) => previous.type_info.required_actual_type()?.clone(),
                None => owner.clone(),
            };

            let created = create(registry, &part, &type_info, &segments)?;
            segments.extend(created);
        }

        Ok(Self {
            segments: segments.into(),
            position: 0,
        })
    }

    fn current(&self) -> &Segment {
        &self.segments[self.position]
    }

    pub fn owning_type(&self) -> &TypeInformation {
        &self.current().owning_type
    }

    pub fn segment(&self) -> &str {
        &self.current().name
    }

    /// Declared type of this segment, containers included.
    pub fn type_information(&self) -> &TypeInformation {
        &self.current().type_info
    }

    /// Declared type with one level of collection/map/optional unwrapped.
    pub fn actual_type(&self) -> &TypeInformation {
        &self.current().actual_type
    }

    pub fn is_collection(&self) -> bool {
        self.current().is_collection
    }

    pub fn has_next(&self) -> bool {
        self.position + 1 < self.segments.len()
    }

    pub fn next(&self) -> Option<PropertyPath> {
        self.has_next().then(|| PropertyPath {
            segments: Arc::clone(&self.segments),
            position: self.position + 1,
        })
    }

    pub fn leaf_property(&self) -> PropertyPath {
        PropertyPath {
            segments: Arc::clone(&self.segments),
            position: self.segments.len() - 1,
        }
    }

    pub fn leaf_type(&self) -> &TypeInformation {
        &self.segments[self.segments.len() - 1].actual_type
    }

    /// Number of segments from this node to the leaf.
    pub fn len(&self) -> usize {
        self.segments.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = PropertyPath> + '_ {
        (self.position..self.segments.len()).map(move |position| PropertyPath {
            segments: Arc::clone(&self.segments),
            position,
        })
    }

    pub fn to_dot_path(&self) -> String {
        self.segments[self.position..]
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Re-resolves this path with `path` appended, starting from this node's
    /// owning type.
    pub fn nested(&self, path: &str, registry: &TypeRegistry) -> Result<Arc<PropertyPath>> {
        let lookup = format!("{}.{}", self.to_dot_path(), path);
        Self::from(&lookup, self.owning_type(), registry)
    }
}

impl PartialEq for PropertyPath {
    fn eq(&self, other: &Self) -> bool {
        self.segments[self.position..] == other.segments[other.position..]
    }
}

impl Eq for PropertyPath {}

impl Hash for PropertyPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segments[self.position..].hash(state);
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owning_type().name(), self.to_dot_path())
    }
}

fn split(source: &str) -> Vec<String> {
    if QUOTED.is_match(source) {
        let unquoted = source.replace("\\Q", "").replace("\\E", "");
        return SPLITTER_FOR_QUOTED
            .captures_iter(&unquoted)
            .map(|c| c[1].to_string())
            .collect();
    }

    let prefixed = format!("_{}", source);
    SPLITTER
        .captures_iter(&prefixed)
        .map(|c| c[1].to_string())
        .collect()
}

/// Resolves `source` against `type_info`, returning the created segments in
/// order.
///
/// A head that does not resolve is shortened one camel-case hump at a time;
/// the peeled humps become the tail resolved against the head's type. Peeling
/// counts towards the depth limit, so a long run of capitals fails with
/// [`MappingError::ParseDepthExceeded`] instead of exhausting the stack.
fn create(
    registry: &TypeRegistry,
    source: &str,
    type_info: &TypeInformation,
    base: &[Segment],
) -> Result<Vec<Segment>> {
    let mut first_failure: Option<MappingError> = None;
    let mut split = source.len();
    let mut peeled = 0;

    loop {
        if base.len() + peeled > MAX_PATH_DEPTH {
            return Err(MappingError::ParseDepthExceeded(MAX_PATH_DEPTH));
        }

        let (head, tail) = source.split_at(split);

        let err = match Segment::resolve(registry, head, type_info, base) {
            Ok(current) if tail.is_empty() => return Ok(vec![current]),
            Ok(current) => {
                // once the head resolved, a failing tail is final
                let mut new_base = base.to_vec();
                new_base.push(current.clone());

                return match create(registry, tail, &current.actual_type, &new_base) {
                    Ok(rest) => {
                        let mut created = Vec::with_capacity(rest.len() + 1);
                        created.push(current);
                        created.extend(rest);
                        Ok(created)
                    }
                    Err(err) => Err(deepest(err, first_failure)),
                };
            }
            Err(err) => err,
        };

        let failure = first_failure.get_or_insert(err);

        match NESTED_PROPERTY.find(head) {
            Some(found) if found.start() != 0 => {
                split = found.start();
                peeled += 1;
            }
            _ => return Err(failure.clone()),
        }
    }
}

/// Keeps the error that got further into the path; on a tie the failure of
/// the unsplit source wins.
fn deepest(err: MappingError, failure: Option<MappingError>) -> MappingError {
    match failure {
        Some(failure) if err.is_property_reference() && !err.has_deeper_resolution_than(&failure) => {
            failure
        }
        _ => err,
    }
}

/// Per-registry LRU of parsed paths keyed by (root type, source).
pub(crate) struct PathCache {
    entries: Mutex<LruCache<(TypeInformation, String), Arc<PropertyPath>>>,
}

impl PathCache {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn get(&self, key: &(TypeInformation, String)) -> Result<Option<Arc<PropertyPath>>> {
        let mut entries = self.entries.lock()?;
        Ok(entries.get(key).map(Arc::clone))
    }

    fn put(&self, key: (TypeInformation, String), path: Arc<PropertyPath>) -> Result<()> {
        let mut entries = self.entries.lock()?;
        entries.put(key, path);
        Ok(())
    }
}
