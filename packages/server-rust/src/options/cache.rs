//! Tenant-scoped configuration cache.
//!
//! [`TenantOptionsCache`] lazily builds one configuration instance per
//! [`ResolvedCacheKey`] and reuses it until it is explicitly invalidated.
//! Entries are `Arc<T>` values published into a [`DashMap`]: readers never
//! block each other, and writers only contend on the shard of the key they
//! publish.
//!
//! Construction runs outside any map lock. When two callers miss on the same
//! key at once both build, the first to publish wins, and the other caller
//! returns the winner. A build that overlaps an invalidation of its key is
//! returned to its caller but never published, so invalidation always forces
//! the next lookup to rebuild from the tenant data it is given.
//!
//! Outside related-sites mode every entry remembers the tenant it was built
//! for. A tenant that takes over a folder another tenant vacated never reads
//! the previous owner's entry; it rebuilds and replaces it. Calls without a
//! tenant get a fresh template and are never cached.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use multisite_core::{ConfigurationKind, OptionsError, ResolvedCacheKey, TenantContext, TenantId};
use tracing::{debug, warn};

use super::builder::TenantOptionsBuilder;
use crate::traits::ConfigurationFactory;

/// A published instance and the tenant it was built for.
struct Published<T> {
    /// `None` for related-sites entries, which every tenant shares.
    owner: Option<TenantId>,
    value: Arc<T>,
}

/// Tenant an entry built for `tenant` belongs to.
fn owner_of(tenant: &TenantContext) -> Option<TenantId> {
    (!tenant.use_related_sites_mode()).then(|| tenant.id())
}

/// Cache of tenant-customized configuration instances of type `T`.
pub struct TenantOptionsCache<T> {
    factory: Arc<dyn ConfigurationFactory<T>>,
    builder: Arc<dyn TenantOptionsBuilder<T>>,
    entries: DashMap<ResolvedCacheKey, Published<T>>,
    /// Bumped by bulk invalidations; affects builds for every key.
    epoch: AtomicU64,
    /// Bumped by single-key invalidations; affects builds for that key only.
    key_generations: DashMap<ResolvedCacheKey, u64>,
}

impl<T: Send + Sync + 'static> TenantOptionsCache<T> {
    #[must_use]
    pub fn new(
        factory: Arc<dyn ConfigurationFactory<T>>,
        builder: Arc<dyn TenantOptionsBuilder<T>>,
    ) -> Self {
        Self {
            factory,
            builder,
            entries: DashMap::new(),
            epoch: AtomicU64::new(0),
            key_generations: DashMap::new(),
        }
    }

    /// Returns the configuration for `kind` as seen by `tenant`, building it
    /// on first use.
    ///
    /// Without a tenant the builder sees no context and the result is returned
    /// to this caller only.
    ///
    /// # Errors
    ///
    /// Propagates factory and builder failures. A failed build leaves no entry.
    pub fn get(
        &self,
        kind: &ConfigurationKind,
        tenant: Option<&TenantContext>,
    ) -> Result<Arc<T>, OptionsError> {
        let Some(tenant) = tenant else {
            let key = ResolvedCacheKey::for_tenant(kind, None);
            debug!(key = %key, "no tenant context, building uncached");
            return self.construct(&key, None).map(Arc::new);
        };

        let key = ResolvedCacheKey::for_tenant(kind, Some(tenant));
        let owner = owner_of(tenant);
        if let Some(entry) = self.entries.get(&key) {
            if entry.owner == owner {
                metrics::counter!("multisite_options_cache_hits_total").increment(1);
                return Ok(Arc::clone(&entry.value));
            }
            debug!(key = %key, tenant_id = %tenant.id(), "entry belongs to a previous tenant");
        }
        metrics::counter!("multisite_options_cache_misses_total").increment(1);

        let generation = self.generation_of(&key);
        let built = Arc::new(self.construct(&key, Some(tenant))?);
        let published = Published {
            owner,
            value: Arc::clone(&built),
        };

        // Generations are read under the shard lock; invalidation bumps before removing.
        match self.entries.entry(key) {
            Entry::Occupied(mut current) => {
                if current.get().owner == owner {
                    return Ok(Arc::clone(&current.get().value));
                }
                if self.generation_of(current.key()) != generation {
                    debug!(key = %current.key(), "invalidated during build, not publishing");
                    return Ok(built);
                }
                debug!(key = %current.key(), "replacing entry of a previous tenant");
                current.insert(published);
                Ok(built)
            }
            Entry::Vacant(slot) => {
                if self.generation_of(slot.key()) != generation {
                    debug!(key = %slot.key(), "invalidated during build, not publishing");
                    return Ok(built);
                }
                debug!(key = %slot.key(), "publishing options");
                slot.insert(published);
                Ok(built)
            }
        }
    }

    /// Returns the cached entry `tenant` would read, without building one.
    #[must_use]
    pub fn peek(&self, kind: &ConfigurationKind, tenant: Option<&TenantContext>) -> Option<Arc<T>> {
        let tenant = tenant?;
        let key = ResolvedCacheKey::for_tenant(kind, Some(tenant));
        self.entries
            .get(&key)
            .filter(|entry| entry.owner == owner_of(tenant))
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Drops the entry for `kind` as seen by `tenant`. Returns whether one existed.
    ///
    /// Builds in flight for other keys are unaffected.
    pub fn invalidate(&self, kind: &ConfigurationKind, tenant: Option<&TenantContext>) -> bool {
        let key = ResolvedCacheKey::for_tenant(kind, tenant);
        *self.key_generations.entry(key.clone()).or_insert(0) += 1;
        let removed = self.entries.remove(&key).is_some();
        debug!(key = %key, removed, "options invalidated");
        removed
    }

    /// Drops every entry `tenant` would read, across all kinds, plus every
    /// entry built for the same tenant id under an earlier folder. In
    /// related-sites mode this includes the shared entries. Returns the number
    /// removed.
    pub fn invalidate_tenant(&self, tenant: &TenantContext) -> usize {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let id = tenant.id();
        let mut removed = 0;
        self.entries.retain(|key, entry| {
            let owned = entry.owner == Some(id)
                || *key == ResolvedCacheKey::for_tenant(&key.kind, Some(tenant));
            if owned {
                removed += 1;
            }
            !owned
        });
        debug!(tenant_id = %id, removed, "tenant options invalidated");
        removed
    }

    /// Drops every entry.
    pub fn invalidate_all(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
        // Safe to reset: the epoch bump already voids every in-flight build.
        self.key_generations.clear();
        debug!("all options invalidated");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn generation_of(&self, key: &ResolvedCacheKey) -> (u64, u64) {
        let per_key = self.key_generations.get(key).map_or(0, |generation| *generation);
        (self.epoch.load(Ordering::Acquire), per_key)
    }

    fn construct(
        &self,
        key: &ResolvedCacheKey,
        tenant: Option<&TenantContext>,
    ) -> Result<T, OptionsError> {
        let kind = &key.kind;
        let outcome = self
            .factory
            .create_template(kind)
            .map_err(|source| OptionsError::Factory {
                kind: kind.clone(),
                source,
            })
            .and_then(|template| {
                let applied = self.builder.build(kind, &template, tenant)?;
                Ok(applied.or_template(template))
            });
        if let Err(err) = &outcome {
            warn!(key = %key, error = %err, "options build failed");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::Barrier;
    use std::time::Duration;

    use multisite_core::{MultiTenantOptions, ResolutionMode, TenantSettings};

    use super::*;
    use crate::options::TenantOverride;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Banner {
        kind: String,
        text: String,
    }

    /// Factory that counts calls and can be told to fail or to stall.
    #[derive(Default)]
    struct BannerFactory {
        calls: AtomicUsize,
        fail_next: AtomicBool,
        stall: Option<Duration>,
    }

    impl ConfigurationFactory<Banner> for BannerFactory {
        fn create_template(&self, kind: &ConfigurationKind) -> anyhow::Result<Banner> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(stall) = self.stall {
                std::thread::sleep(stall);
            }
            if self.fail_next.swap(false, Ordering::SeqCst) {
                anyhow::bail!("template source offline");
            }
            Ok(Banner {
                kind: kind.to_string(),
                text: "default".to_string(),
            })
        }
    }

    /// Overrides the banner text with the tenant name.
    struct NameBuilder;

    impl TenantOptionsBuilder<Banner> for NameBuilder {
        fn build(
            &self,
            _kind: &ConfigurationKind,
            template: &Banner,
            tenant: Option<&TenantContext>,
        ) -> Result<TenantOverride<Banner>, OptionsError> {
            Ok(match tenant {
                Some(t) if !t.settings.name.is_empty() => TenantOverride::Applied(Banner {
                    text: t.settings.name.clone(),
                    ..template.clone()
                }),
                _ => TenantOverride::NoOverride,
            })
        }
    }

    /// Parks inside `build` until the test has acted twice on the gate.
    struct GatedBuilder {
        gate: Arc<Barrier>,
    }

    impl TenantOptionsBuilder<Banner> for GatedBuilder {
        fn build(
            &self,
            kind: &ConfigurationKind,
            template: &Banner,
            tenant: Option<&TenantContext>,
        ) -> Result<TenantOverride<Banner>, OptionsError> {
            self.gate.wait();
            self.gate.wait();
            NameBuilder.build(kind, template, tenant)
        }
    }

    fn tenant(name: &str, folder: &str, related: bool) -> TenantContext {
        TenantContext::new(
            Arc::new(TenantSettings::new(name, folder)),
            MultiTenantOptions {
                mode: ResolutionMode::FolderName,
                use_related_sites_mode: related,
            },
        )
    }

    fn cache_with(factory: Arc<BannerFactory>) -> TenantOptionsCache<Banner> {
        TenantOptionsCache::new(factory, Arc::new(NameBuilder))
    }

    #[test]
    fn repeated_get_returns_cached_instance() {
        let factory = Arc::new(BannerFactory::default());
        let cache = cache_with(factory.clone());
        let site = tenant("Site One", "site1", false);

        let first = cache.get(&ConfigurationKind::FACEBOOK, Some(&site)).unwrap();
        let second = cache.get(&ConfigurationKind::FACEBOOK, Some(&site)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.text, "Site One");
        assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_rebuilds_from_current_tenant_data() {
        let cache = cache_with(Arc::new(BannerFactory::default()));
        let before = tenant("Old Name", "site1", false);
        let first = cache.get(&ConfigurationKind::GOOGLE, Some(&before)).unwrap();
        assert_eq!(first.text, "Old Name");

        let mut renamed = (*before.settings).clone();
        renamed.name = "New Name".to_string();
        let after = TenantContext::new(Arc::new(renamed), before.options);

        // Still cached until invalidated.
        assert_eq!(cache.get(&ConfigurationKind::GOOGLE, Some(&after)).unwrap().text, "Old Name");

        assert!(cache.invalidate(&ConfigurationKind::GOOGLE, Some(&after)));
        assert!(!cache.invalidate(&ConfigurationKind::GOOGLE, Some(&after)));
        assert_eq!(cache.get(&ConfigurationKind::GOOGLE, Some(&after)).unwrap().text, "New Name");
    }

    #[test]
    fn related_sites_share_one_entry() {
        let factory = Arc::new(BannerFactory::default());
        let cache = cache_with(factory.clone());
        let a = tenant("A", "a", true);
        let b = tenant("B", "b", true);

        let from_a = cache.get(&ConfigurationKind::FACEBOOK, Some(&a)).unwrap();
        let from_b = cache.get(&ConfigurationKind::FACEBOOK, Some(&b)).unwrap();

        assert!(Arc::ptr_eq(&from_a, &from_b));
        assert_eq!(cache.len(), 1);
        assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unrelated_sites_get_distinct_entries() {
        let cache = cache_with(Arc::new(BannerFactory::default()));
        let a = tenant("A", "a", false);
        let b = tenant("B", "b", false);

        let from_a = cache.get(&ConfigurationKind::FACEBOOK, Some(&a)).unwrap();
        let from_b = cache.get(&ConfigurationKind::FACEBOOK, Some(&b)).unwrap();

        assert_ne!(*from_a, *from_b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn kinds_are_cached_separately() {
        let cache = cache_with(Arc::new(BannerFactory::default()));
        let site = tenant("A", "a", false);

        let fb = cache.get(&ConfigurationKind::FACEBOOK, Some(&site)).unwrap();
        let google = cache.get(&ConfigurationKind::GOOGLE, Some(&site)).unwrap();

        assert_eq!(fb.kind, "facebook");
        assert_eq!(google.kind, "google");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn missing_tenant_yields_uncached_template() {
        let factory = Arc::new(BannerFactory::default());
        let cache = cache_with(factory.clone());

        let first = cache.get(&ConfigurationKind::TWITTER, None).unwrap();
        let second = cache.get(&ConfigurationKind::TWITTER, None).unwrap();

        assert_eq!(first.text, "default");
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(cache.is_empty());
        assert_eq!(factory.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn tenantless_get_does_not_shadow_related_sites_entry() {
        let cache = cache_with(Arc::new(BannerFactory::default()));
        let site = tenant("Site One", "site1", true);

        assert_eq!(cache.get(&ConfigurationKind::FACEBOOK, None).unwrap().text, "default");
        let banner = cache.get(&ConfigurationKind::FACEBOOK, Some(&site)).unwrap();

        assert_eq!(banner.text, "Site One");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn folder_taken_over_by_another_tenant_is_rebuilt() {
        let cache = cache_with(Arc::new(BannerFactory::default()));
        let previous = tenant("Previous Owner", "site1", false);
        let newcomer = tenant("Newcomer", "site1", false);

        cache.get(&ConfigurationKind::FACEBOOK, Some(&previous)).unwrap();
        assert!(cache.peek(&ConfigurationKind::FACEBOOK, Some(&newcomer)).is_none());

        let banner = cache.get(&ConfigurationKind::FACEBOOK, Some(&newcomer)).unwrap();
        assert_eq!(banner.text, "Newcomer");
        assert_eq!(cache.len(), 1);
        let cached = cache.peek(&ConfigurationKind::FACEBOOK, Some(&newcomer)).unwrap();
        assert!(Arc::ptr_eq(&banner, &cached));
    }

    #[test]
    fn invalidate_tenant_follows_a_moved_tenant() {
        let cache = cache_with(Arc::new(BannerFactory::default()));
        let before = tenant("Site One", "site1", false);
        cache.get(&ConfigurationKind::FACEBOOK, Some(&before)).unwrap();
        cache.get(&ConfigurationKind::GOOGLE, Some(&before)).unwrap();

        let mut moved = (*before.settings).clone();
        moved.folder_name = "site1-new".to_string();
        let after = TenantContext::new(Arc::new(moved), before.options);

        assert_eq!(cache.invalidate_tenant(&after), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn failed_build_does_not_poison_cache() {
        let factory = Arc::new(BannerFactory::default());
        factory.fail_next.store(true, Ordering::SeqCst);
        let cache = cache_with(factory.clone());
        let site = tenant("A", "a", false);

        let err = cache.get(&ConfigurationKind::FACEBOOK, Some(&site)).unwrap_err();
        assert!(matches!(err, OptionsError::Factory { .. }));
        assert!(err.to_string().contains("template source offline"));
        assert!(cache.is_empty());

        let banner = cache.get(&ConfigurationKind::FACEBOOK, Some(&site)).unwrap();
        assert_eq!(banner.text, "A");
        assert_eq!(factory.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_misses_converge_on_one_complete_instance() {
        const CALLERS: usize = 16;
        let factory = Arc::new(BannerFactory {
            stall: Some(Duration::from_millis(5)),
            ..BannerFactory::default()
        });
        let cache = cache_with(factory.clone());
        let site = tenant("Site One", "site1", false);
        let start = Barrier::new(CALLERS);

        let results: Vec<Arc<Banner>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..CALLERS)
                .map(|_| {
                    scope.spawn(|| {
                        start.wait();
                        cache.get(&ConfigurationKind::FACEBOOK, Some(&site)).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let cached = cache.peek(&ConfigurationKind::FACEBOOK, Some(&site)).unwrap();
        for banner in &results {
            assert!(Arc::ptr_eq(banner, &cached));
            assert_eq!(banner.text, "Site One");
            assert_eq!(banner.kind, "facebook");
        }
        assert_eq!(cache.len(), 1);
        assert!(factory.calls.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn build_overlapping_invalidation_is_not_published() {
        let gate = Arc::new(Barrier::new(2));
        let cache = TenantOptionsCache::new(
            Arc::new(BannerFactory::default()),
            Arc::new(GatedBuilder {
                gate: Arc::clone(&gate),
            }),
        );
        let site = tenant("Site One", "site1", false);

        std::thread::scope(|scope| {
            let pending = scope.spawn(|| cache.get(&ConfigurationKind::FACEBOOK, Some(&site)));
            gate.wait();
            cache.invalidate_all();
            gate.wait();
            let banner = pending.join().unwrap().unwrap();
            assert_eq!(banner.text, "Site One");
        });

        assert!(cache.is_empty());
    }

    #[test]
    fn invalidating_the_building_key_prevents_publishing() {
        let gate = Arc::new(Barrier::new(2));
        let cache = TenantOptionsCache::new(
            Arc::new(BannerFactory::default()),
            Arc::new(GatedBuilder {
                gate: Arc::clone(&gate),
            }),
        );
        let site = tenant("Site One", "site1", false);

        std::thread::scope(|scope| {
            let pending = scope.spawn(|| cache.get(&ConfigurationKind::FACEBOOK, Some(&site)));
            gate.wait();
            assert!(!cache.invalidate(&ConfigurationKind::FACEBOOK, Some(&site)));
            gate.wait();
            pending.join().unwrap().unwrap();
        });

        assert!(cache.is_empty());
    }

    #[test]
    fn invalidating_another_key_does_not_block_publishing() {
        let gate = Arc::new(Barrier::new(2));
        let cache = TenantOptionsCache::new(
            Arc::new(BannerFactory::default()),
            Arc::new(GatedBuilder {
                gate: Arc::clone(&gate),
            }),
        );
        let site = tenant("Site One", "site1", false);
        let other = tenant("Site Two", "site2", false);

        std::thread::scope(|scope| {
            let pending = scope.spawn(|| cache.get(&ConfigurationKind::FACEBOOK, Some(&site)));
            gate.wait();
            cache.invalidate(&ConfigurationKind::FACEBOOK, Some(&other));
            cache.invalidate(&ConfigurationKind::GOOGLE, Some(&site));
            gate.wait();
            pending.join().unwrap().unwrap();
        });

        let cached = cache.peek(&ConfigurationKind::FACEBOOK, Some(&site)).unwrap();
        assert_eq!(cached.text, "Site One");
    }

    #[test]
    fn invalidate_tenant_removes_only_that_tenant() {
        let cache = cache_with(Arc::new(BannerFactory::default()));
        let a = tenant("A", "a", false);
        let b = tenant("B", "b", false);
        for kind in [ConfigurationKind::FACEBOOK, ConfigurationKind::GOOGLE] {
            cache.get(&kind, Some(&a)).unwrap();
            cache.get(&kind, Some(&b)).unwrap();
        }

        assert_eq!(cache.invalidate_tenant(&a), 2);

        assert_eq!(cache.len(), 2);
        assert!(cache.peek(&ConfigurationKind::FACEBOOK, Some(&a)).is_none());
        assert!(cache.peek(&ConfigurationKind::FACEBOOK, Some(&b)).is_some());
    }

    #[test]
    fn invalidate_all_clears_everything() {
        let cache = cache_with(Arc::new(BannerFactory::default()));
        cache.get(&ConfigurationKind::FACEBOOK, Some(&tenant("A", "a", false))).unwrap();
        cache.get(&ConfigurationKind::GOOGLE, Some(&tenant("B", "b", true))).unwrap();

        cache.invalidate_all();

        assert!(cache.is_empty());
    }
}
