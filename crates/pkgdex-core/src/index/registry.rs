//! Version-indexed factory for schema implementations.

use std::collections::BTreeMap;

use super::error::{IndexError, Result};
use super::schema::{SchemaInterface, V1_0, V1_1, V1_2, V1_3, V1_4, V1_5, V1_6, V1_7, V2_0};
use super::version::SchemaVersion;

pub type SchemaFactory = fn() -> Box<dyn SchemaInterface>;

fn boxed<S: SchemaInterface + Default + 'static>() -> Box<dyn SchemaInterface> {
    Box::new(S::default())
}

/// Maps each schema major to its known minors, in ascending order.
///
/// Built once at startup and passed to whatever opens an index.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    families: BTreeMap<u32, BTreeMap<u32, SchemaFactory>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every schema version this build implements.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(SchemaVersion::new(1, 0), boxed::<V1_0>);
        registry.register(SchemaVersion::new(1, 1), boxed::<V1_1>);
        registry.register(SchemaVersion::new(1, 2), boxed::<V1_2>);
        registry.register(SchemaVersion::new(1, 3), boxed::<V1_3>);
        registry.register(SchemaVersion::new(1, 4), boxed::<V1_4>);
        registry.register(SchemaVersion::new(1, 5), boxed::<V1_5>);
        registry.register(SchemaVersion::new(1, 6), boxed::<V1_6>);
        registry.register(SchemaVersion::new(1, 7), boxed::<V1_7>);
        registry.register(SchemaVersion::new(2, 0), boxed::<V2_0>);
        registry
    }

    pub fn register(&mut self, version: SchemaVersion, factory: SchemaFactory) {
        self.families
            .entry(version.major)
            .or_default()
            .insert(version.minor, factory);
    }

    /// Implementation for `requested`: the smallest registered minor at or
    /// above the requested one, or the latest minor when the request is
    /// newer than anything known.
    ///
    /// # Errors
    ///
    /// [`IndexError::SchemaNotSupported`] when the major is unknown.
    pub fn create(&self, requested: SchemaVersion) -> Result<Box<dyn SchemaInterface>> {
        let family = self
            .families
            .get(&requested.major)
            .ok_or(IndexError::SchemaNotSupported(requested))?;

        let factory = family
            .range(requested.minor..)
            .next()
            .or_else(|| family.iter().next_back())
            .map(|(_, factory)| factory)
            .ok_or(IndexError::SchemaNotSupported(requested))?;

        Ok(factory())
    }

    /// Newest known version of a major.
    pub fn latest(&self, major: u32) -> Option<SchemaVersion> {
        self.families
            .get(&major)
            .and_then(|family| family.keys().next_back())
            .map(|&minor| SchemaVersion::new(major, minor))
    }

    pub fn versions(&self) -> impl Iterator<Item = SchemaVersion> + '_ {
        self.families.iter().flat_map(|(&major, family)| {
            family
                .keys()
                .map(move |&minor| SchemaVersion::new(major, minor))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::schema::schema_chain;

    #[test]
    fn test_exact_versions() {
        let registry = SchemaRegistry::standard();
        for version in registry.versions() {
            assert_eq!(registry.create(version).unwrap().version(), version);
        }
        assert_eq!(registry.versions().count(), 9);
    }

    #[test]
    fn test_newer_minor_clamps_to_latest() {
        let registry = SchemaRegistry::standard();
        let schema = registry.create(SchemaVersion::new(1, 42)).unwrap();
        assert_eq!(schema.version(), SchemaVersion::new(1, 7));
        assert_eq!(registry.latest(1), Some(SchemaVersion::new(1, 7)));
    }

    #[test]
    fn test_gaps_pick_next_registered_minor() {
        let mut registry = SchemaRegistry::new();
        registry.register(SchemaVersion::new(1, 0), boxed::<V1_0>);
        registry.register(SchemaVersion::new(1, 3), boxed::<V1_3>);
        let schema = registry.create(SchemaVersion::new(1, 1)).unwrap();
        assert_eq!(schema.version(), SchemaVersion::new(1, 3));
    }

    #[test]
    fn test_unknown_major_is_not_supported() {
        let registry = SchemaRegistry::standard();
        let err = registry.create(SchemaVersion::new(3, 0)).unwrap_err();
        assert!(matches!(err, IndexError::SchemaNotSupported(v) if v == SchemaVersion::new(3, 0)));
        assert_eq!(registry.latest(3), None);
    }

    #[test]
    fn test_chain_covers_every_minor() {
        let registry = SchemaRegistry::standard();
        let schema = registry.create(SchemaVersion::new(1, 7)).unwrap();
        let chain: Vec<_> = schema_chain(schema.as_ref())
            .iter()
            .map(|s| s.version().minor)
            .collect();
        assert_eq!(chain, [7, 6, 5, 4, 3, 2, 1, 0]);
    }
}
