use sfg_math::Aabb;
use sfg_memory::{ChunkHandle, Handle};

use crate::entity::Entity;
use crate::world::World;

/// A typed component attached to an entity, stored in its own [`sfg_memory::Pool`] rather than on
/// the entity's SOA arrays (§4.5, GLOSSARY "Trait"). `TID` exists for debug/tooling display; the
/// actual storage dispatch is the `storage`/`storage_mut` pair, mirroring
/// `sfg_resources::manager::ResourceKind`.
pub trait Trait: Sized {
    const TID: u8;

    fn entity(&self) -> Handle<Entity>;
    fn set_entity(&mut self, entity: Handle<Entity>);

    fn storage(world: &World) -> &sfg_memory::Pool<Self>;
    fn storage_mut(world: &mut World) -> &mut sfg_memory::Pool<Self>;

    /// Called once after the trait is allocated and its `entity` field is set. The mesh-renderer
    /// trait uses this to expand the owning entity's AABB (§4.5).
    fn on_add(_world: &mut World, _handle: Handle<Self>) {}
    /// Called before the trait's pool slot is freed.
    fn on_remove(_world: &mut World, _handle: Handle<Self>) {}
}

/// Attaches a mesh to an entity. `model_aabb` is the referenced model's bounds in model space, as
/// looked up by the caller from `sfg_resources::ResourceManager` before attaching the trait — this
/// crate does not depend on `sfg_resources` (§DESIGN.md), so the AABB travels in rather than being
/// fetched here.
#[derive(Clone, Copy, Debug)]
pub struct MeshRenderer {
    entity: Handle<Entity>,
    pub model_hash: u64,
    pub model_aabb: Aabb,
}

impl MeshRenderer {
    pub fn new(model_hash: u64, model_aabb: Aabb) -> Self {
        MeshRenderer {
            entity: Handle::NULL,
            model_hash,
            model_aabb,
        }
    }
}

impl Trait for MeshRenderer {
    const TID: u8 = 0;

    fn entity(&self) -> Handle<Entity> {
        self.entity
    }

    fn set_entity(&mut self, entity: Handle<Entity>) {
        self.entity = entity;
    }

    fn storage(world: &World) -> &sfg_memory::Pool<Self> {
        &world.mesh_renderers
    }

    fn storage_mut(world: &mut World) -> &mut sfg_memory::Pool<Self> {
        &mut world.mesh_renderers
    }

    fn on_add(world: &mut World, handle: Handle<Self>) {
        let mesh_renderer = *world.view::<MeshRenderer>().get(handle);
        world
            .entities
            .expand_aabb(mesh_renderer.entity, &mesh_renderer.model_aabb);
    }
}

/// Point/spot/directional light. Variable-length data (shadow-cascade split distances) lives in
/// the world's shared `trait_aux_memory` chunk arena rather than inline, matching the original
/// source's `_trait_aux_memory` (§4.5).
#[derive(Clone, Copy, Debug)]
pub struct Light {
    entity: Handle<Entity>,
    pub color: [f32; 3],
    pub intensity: f32,
    pub cascades: ChunkHandle<u32>,
}

impl Light {
    pub fn new(color: [f32; 3], intensity: f32) -> Self {
        Light {
            entity: Handle::NULL,
            color,
            intensity,
            cascades: ChunkHandle { offset: 0, size: 0 },
        }
    }
}

impl Trait for Light {
    const TID: u8 = 1;

    fn entity(&self) -> Handle<Entity> {
        self.entity
    }

    fn set_entity(&mut self, entity: Handle<Entity>) {
        self.entity = entity;
    }

    fn storage(world: &World) -> &sfg_memory::Pool<Self> {
        &world.lights
    }

    fn storage_mut(world: &mut World) -> &mut sfg_memory::Pool<Self> {
        &mut world.lights
    }

    fn on_remove(world: &mut World, handle: Handle<Self>) {
        let cascades = world.view::<Light>().get(handle).cascades;
        if cascades.size > 0 {
            world.trait_aux_memory.free(cascades);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{World, WorldCapacities};

    #[test]
    fn add_mesh_renderer_expands_entity_aabb() {
        let mut world = World::new(WorldCapacities::default());
        let e = world.entities.create_entity("renderable");
        let aabb = Aabb::from_min_max(
            sfg_math::Vector3::new(-1.0, -1.0, -1.0),
            sfg_math::Vector3::new(1.0, 1.0, 1.0),
        );
        world.add_trait(e, MeshRenderer::new(42, aabb));
        assert_eq!(world.entities.aabb(e), aabb);
    }

    #[test]
    fn remove_light_frees_cascade_chunk() {
        let mut world = World::new(WorldCapacities::default());
        let e = world.entities.create_entity("light");
        let handle = world.add_trait(e, Light::new([1.0, 1.0, 1.0], 2.0));
        world.remove_trait::<Light>(handle);
        assert!(!world.view::<Light>().is_valid(handle));
    }
}
