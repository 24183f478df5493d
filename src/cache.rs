//! Shadow-volume caches: two 4-way set-associative LRU caches, one keyed
//! by object identity and one by
//! model identity, so a static mesh shared by many object instances (same
//! model-space light vector) only gets its shadow volume built once.

use glam::Vec4;

use crate::scene::ModelHandle;
use crate::shadow::builder::{EncodingFlags, RenderType, ShadowVolumeGeometry};
use crate::stats::CacheStats;

pub const OBJECT_CACHE_SIZE: usize = 1024;
pub const MODEL_CACHE_SIZE: usize = 256;
const WAYS: usize = 4;

/// A light's contribution to an object's cache key: salted so the same
/// object under two different lights doesn't collide on the identity bits
/// alone.
const LIGHT_SALT: u32 = 0x9E37_79B9;

fn object_slot(object_id: u32, light_id: u32) -> usize {
    (object_id.wrapping_add(light_id.wrapping_mul(LIGHT_SALT)) as usize) % (OBJECT_CACHE_SIZE / WAYS)
}

fn model_slot(model_id: u32) -> usize {
    (model_id as usize) % (MODEL_CACHE_SIZE / WAYS)
}

/// `GpuDriver::IndexBufferHandle` lives behind the GPU-driver boundary; the
/// cache only needs an opaque handle it can hand back to the driver on a hit and
/// ask the driver to destroy on eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBufferHandle(pub u64);

#[derive(Debug, Clone)]
pub struct CacheEntry<Key> {
    pub key: Key,
    pub index_buffer: IndexBufferHandle,
    pub vertex_count: u32,
    pub render_type: RenderType,
    pub encoding: EncodingFlags,
    pub last_use_frame: u64,
}

/// Exact-bit key equality: cache keys compare the model-space light vector
/// bit-for-bit, not within epsilon — a moving light must always miss,
/// never subtly reuse stale geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectCacheKey {
    pub object_id: u32,
    pub light_id: u32,
    pub model_space_light: Vec4,
    pub render_type: RenderType,
}

impl ObjectCacheKey {
    fn bit_equal(&self, other: &ObjectCacheKey) -> bool {
        self.object_id == other.object_id
            && self.light_id == other.light_id
            && self.render_type == other.render_type
            && self.model_space_light.to_array() == other.model_space_light.to_array()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelCacheKey {
    pub model: ModelHandle,
    pub light_id: u32,
    pub model_space_light: Vec4,
    pub render_type: RenderType,
}

impl ModelCacheKey {
    fn bit_equal(&self, other: &ModelCacheKey) -> bool {
        self.model == other.model
            && self.light_id == other.light_id
            && self.render_type == other.render_type
            && self.model_space_light.to_array() == other.model_space_light.to_array()
    }
}

/// One 4-way set. `None` slots are free; occupied slots are evicted by
/// least-recently-used `last_use_frame` on a miss.
#[derive(Debug, Clone)]
struct CacheSet<Key> {
    ways: [Option<CacheEntry<Key>>; WAYS],
}

impl<Key> Default for CacheSet<Key> {
    fn default() -> Self {
        Self { ways: [None, None, None, None] }
    }
}

impl<Key: Copy> CacheSet<Key> {
    fn find(&mut self, matches: impl Fn(&Key) -> bool, frame: u64) -> Option<&mut CacheEntry<Key>> {
        let hit = self.ways.iter_mut().position(|w| w.as_ref().is_some_and(|e| matches(&e.key)))?;
        let entry = self.ways[hit].as_mut().unwrap();
        entry.last_use_frame = frame;
        Some(entry)
    }

    /// Inserts, evicting the LRU way if every way is occupied. Returns the
    /// evicted entry, if any, so the caller can ask the GPU driver to
    /// destroy its index buffer.
    fn insert(&mut self, entry: CacheEntry<Key>) -> Option<CacheEntry<Key>> {
        if let Some(free) = self.ways.iter().position(|w| w.is_none()) {
            self.ways[free] = Some(entry);
            return None;
        }
        let lru = self
            .ways
            .iter()
            .enumerate()
            .min_by_key(|(_, w)| w.as_ref().unwrap().last_use_frame)
            .map(|(i, _)| i)
            .unwrap();
        self.ways[lru].replace(entry)
    }

    fn occupied_count(&self) -> u32 {
        self.ways.iter().filter(|w| w.is_some()).count() as u32
    }
}

pub struct ObjectShadowVolumeCache {
    sets: Vec<CacheSet<ObjectCacheKey>>,
}

impl ObjectShadowVolumeCache {
    pub fn new() -> Self {
        Self { sets: vec![CacheSet::default(); OBJECT_CACHE_SIZE / WAYS] }
    }

    pub fn lookup(&mut self, key: &ObjectCacheKey, frame: u64, stats: &mut CacheStats) -> Option<&CacheEntry<ObjectCacheKey>> {
        let set = object_slot(key.object_id, key.light_id);
        let found = self.sets[set].find(|k| k.bit_equal(key), frame);
        if found.is_some() {
            stats.record_hit();
        } else {
            stats.record_miss();
        }
        found.map(|e| &*e)
    }

    pub fn insert(&mut self, key: ObjectCacheKey, index_buffer: IndexBufferHandle, geometry: &ShadowVolumeGeometry, frame: u64, stats: &mut CacheStats) -> Option<CacheEntry<ObjectCacheKey>> {
        let set = object_slot(key.object_id, key.light_id);
        let entry = CacheEntry {
            key,
            index_buffer,
            vertex_count: geometry.vertex_count,
            render_type: geometry.render_type,
            encoding: geometry.encoding,
            last_use_frame: frame,
        };
        let evicted = self.sets[set].insert(entry);
        stats.used_slots = self.sets.iter().map(|s| s.occupied_count()).sum();
        evicted
    }
}

impl Default for ObjectShadowVolumeCache {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ModelShadowVolumeCache {
    sets: Vec<CacheSet<ModelCacheKey>>,
}

impl ModelShadowVolumeCache {
    pub fn new() -> Self {
        Self { sets: vec![CacheSet::default(); MODEL_CACHE_SIZE / WAYS] }
    }

    pub fn lookup(&mut self, key: &ModelCacheKey, frame: u64, stats: &mut CacheStats) -> Option<&CacheEntry<ModelCacheKey>> {
        let set = model_slot(key.model.0);
        let found = self.sets[set].find(|k| k.bit_equal(key), frame);
        if found.is_some() {
            stats.record_hit();
        } else {
            stats.record_miss();
        }
        found.map(|e| &*e)
    }

    pub fn insert(&mut self, key: ModelCacheKey, index_buffer: IndexBufferHandle, geometry: &ShadowVolumeGeometry, frame: u64, stats: &mut CacheStats) -> Option<CacheEntry<ModelCacheKey>> {
        let set = model_slot(key.model.0);
        let entry = CacheEntry {
            key,
            index_buffer,
            vertex_count: geometry.vertex_count,
            render_type: geometry.render_type,
            encoding: geometry.encoding,
            last_use_frame: frame,
        };
        let evicted = self.sets[set].insert(entry);
        stats.used_slots = self.sets.iter().map(|s| s.occupied_count()).sum();
        evicted
    }
}

impl Default for ModelShadowVolumeCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shadow::builder::ShadowVolumeGeometry;

    fn geom() -> ShadowVolumeGeometry {
        ShadowVolumeGeometry {
            indices: vec![0, 1, 2],
            vertex_count: 3,
            render_type: RenderType::DepthPass,
            encoding: EncodingFlags::empty(),
        }
    }

    #[test]
    fn exact_bit_key_distinguishes_tiny_light_movement() {
        let mut stats = CacheStats::default();
        let mut cache = ObjectShadowVolumeCache::new();
        let key_a = ObjectCacheKey { object_id: 1, light_id: 0, model_space_light: Vec4::new(0.0, 0.0, 1.0, 0.0), render_type: RenderType::DepthPass };
        cache.insert(key_a, IndexBufferHandle(1), &geom(), 0, &mut stats);

        let key_b = ObjectCacheKey { object_id: 1, light_id: 0, model_space_light: Vec4::new(0.0, 0.0, 1.0 + f32::EPSILON, 0.0), render_type: RenderType::DepthPass };
        assert!(cache.lookup(&key_b, 1, &mut stats).is_none());
        assert!(cache.lookup(&key_a, 1, &mut stats).is_some());
    }

    #[test]
    fn fifth_insert_into_same_set_evicts_lru_way() {
        let mut stats = CacheStats::default();
        let mut cache = ObjectShadowVolumeCache::new();
        // All four keyed to collide into the same set by using light_id=0
        // and object ids that are multiples of the per-set table size.
        let table_size = (OBJECT_CACHE_SIZE / WAYS) as u32;
        let keys: Vec<ObjectCacheKey> = (0..5)
            .map(|i| ObjectCacheKey { object_id: i * table_size, light_id: 0, model_space_light: Vec4::new(i as f32, 0.0, 0.0, 0.0), render_type: RenderType::DepthPass })
            .collect();
        for (frame, key) in keys.iter().enumerate().take(4) {
            cache.insert(*key, IndexBufferHandle(frame as u64), &geom(), frame as u64, &mut stats);
        }
        let evicted = cache.insert(keys[4], IndexBufferHandle(4), &geom(), 4, &mut stats);
        assert!(evicted.is_some());
        assert_eq!(evicted.unwrap().key, keys[0]);
    }
}
