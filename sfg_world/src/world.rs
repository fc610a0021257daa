use bitflags::bitflags;

use sfg_memory::{ChunkAllocator, Handle, Pool};

use crate::entity::{Entity, EntityManager};
use crate::traits::Trait;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct WorldFlags: u8 {
        const IS_INIT = 1 << 0;
        const IS_PLAYING = 1 << 1;
    }
}

/// Capacities for the entity pool, every trait pool, and the shared trait-aux chunk arena.
/// Settable from `sfg_app::Settings` (§9 Open Question #4) rather than compiled-in constants;
/// defaults match the original source's `MAX_ENTITIES`/`trait_view<..., N>` constants.
#[derive(Clone, Copy, Debug)]
pub struct WorldCapacities {
    pub max_entities: usize,
    pub mesh_renderer_capacity: usize,
    pub light_capacity: usize,
    pub trait_aux_memory_bytes: usize,
}

impl Default for WorldCapacities {
    fn default() -> Self {
        WorldCapacities {
            max_entities: 512,
            mesh_renderer_capacity: 256,
            light_capacity: 100,
            trait_aux_memory_bytes: 1024,
        }
    }
}

/// Owns the entity store, every trait pool, and the world-wide trait-aux chunk arena. Resource
/// handles (textures, models, materials) referenced from traits are looked up through
/// `sfg_resources::ResourceManager`, which the host wires in separately — this crate stays
/// resource-manager-agnostic (§DESIGN.md).
pub struct World {
    pub entities: EntityManager,
    pub(crate) mesh_renderers: Pool<crate::traits::MeshRenderer>,
    pub(crate) lights: Pool<crate::traits::Light>,
    pub(crate) trait_aux_memory: ChunkAllocator<u32>,
    flags: WorldFlags,
}

impl World {
    pub fn new(capacities: WorldCapacities) -> Self {
        World {
            entities: EntityManager::new(capacities.max_entities, capacities.max_entities * 5),
            mesh_renderers: Pool::new(capacities.mesh_renderer_capacity),
            lights: Pool::new(capacities.light_capacity),
            trait_aux_memory: ChunkAllocator::new(capacities.trait_aux_memory_bytes),
            flags: WorldFlags::IS_INIT,
        }
    }

    pub fn flags(&self) -> WorldFlags {
        self.flags
    }

    pub fn set_playing(&mut self, playing: bool) {
        if playing {
            self.flags.insert(WorldFlags::IS_PLAYING);
        } else {
            self.flags.remove(WorldFlags::IS_PLAYING);
        }
    }

    pub fn view<T: Trait>(&self) -> &Pool<T> {
        T::storage(self)
    }

    /// Allocates from `T`'s pool, writes `entity` into the trait, then calls `T::on_add` (§4.5).
    pub fn add_trait<T: Trait>(&mut self, entity: Handle<Entity>, mut initial: T) -> Handle<T> {
        assert!(self.entities.is_valid(entity), "invalid entity handle");
        initial.set_entity(entity);
        let handle = T::storage_mut(self).allocate(initial);
        T::on_add(self, handle);
        handle
    }

    /// Calls `T::on_remove` before freeing the pool slot (§4.5).
    pub fn remove_trait<T: Trait>(&mut self, handle: Handle<T>) {
        T::on_remove(self, handle);
        T::storage_mut(self).free(handle);
    }

    pub fn get_trait<T: Trait>(&self, handle: Handle<T>) -> &T {
        T::storage(self).get(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_world_has_init_flag() {
        let world = World::new(WorldCapacities::default());
        assert!(world.flags().contains(WorldFlags::IS_INIT));
        assert!(!world.flags().contains(WorldFlags::IS_PLAYING));
    }
}
