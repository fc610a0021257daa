use bitflags::bitflags;

use sfg_math::{Affine3, Aabb, Quaternion, Vector3};
use sfg_memory::{Handle, Pool, TextAllocator, TextHandle};

/// Marker type for [`Handle<Entity>`]; entities carry no payload of their own, they are indices
/// into the parallel SOA arrays this module owns (§3 "Entity store").
pub struct Entity;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct EntityFlags: u16 {
        const LOCAL_TRANSFORM_DIRTY = 1 << 0;
        const ABS_TRANSFORM_DIRTY = 1 << 1;
        const ABS_ROTATION_DIRTY = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EntityMeta {
    pub name: TextHandle,
    pub flags: EntityFlags,
}

/// Doubly-linked child list plus a parent back-pointer. `Handle::NULL` (generation 0) stands in
/// for "no relation" in every field, matching the original's `pool_handle16{}` default.
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityFamily {
    pub parent: Handle<Entity>,
    pub first_child: Handle<Entity>,
    pub prev_sibling: Handle<Entity>,
    pub next_sibling: Handle<Entity>,
}

/// Owns the entity id pool and every parallel SOA array indexed by `entity.index()`, plus the
/// text allocator entity names live in. Grounded on
/// `examples/original_source/src/world/entity_manager.{hpp,cpp}`.
pub struct EntityManager {
    entities: Pool<()>,
    metas: Vec<EntityMeta>,
    positions: Vec<Vector3>,
    prev_positions: Vec<Vector3>,
    rotations: Vec<Quaternion>,
    prev_rotations: Vec<Quaternion>,
    scales: Vec<Vector3>,
    prev_scales: Vec<Vector3>,
    aabbs: Vec<Aabb>,
    local_matrices: Vec<Affine3>,
    abs_matrices: Vec<Affine3>,
    families: Vec<EntityFamily>,
    names: TextAllocator,
}

impl EntityManager {
    pub fn new(max_entities: usize, text_capacity: usize) -> Self {
        EntityManager {
            entities: Pool::new(max_entities),
            metas: Vec::with_capacity(max_entities),
            positions: Vec::with_capacity(max_entities),
            prev_positions: Vec::with_capacity(max_entities),
            rotations: Vec::with_capacity(max_entities),
            prev_rotations: Vec::with_capacity(max_entities),
            scales: Vec::with_capacity(max_entities),
            prev_scales: Vec::with_capacity(max_entities),
            aabbs: Vec::with_capacity(max_entities),
            local_matrices: Vec::with_capacity(max_entities),
            abs_matrices: Vec::with_capacity(max_entities),
            families: Vec::with_capacity(max_entities),
            names: TextAllocator::new(text_capacity),
        }
    }

    pub fn live_count(&self) -> usize {
        self.entities.live_count()
    }

    pub fn is_valid(&self, entity: Handle<Entity>) -> bool {
        self.entities.is_valid(entity)
    }

    fn idx(entity: Handle<Entity>) -> usize {
        entity.index() as usize
    }

    /// Slots in every side array are created in step with the entity pool: a freshly reused
    /// index already has room, a freshly bumped index does not yet, so only that case pushes.
    fn ensure_slot(&mut self, index: usize) {
        if index == self.metas.len() {
            self.metas.push(EntityMeta {
                name: TextHandle::default(),
                flags: EntityFlags::empty(),
            });
            self.positions.push(Vector3::zeros());
            self.prev_positions.push(Vector3::zeros());
            self.rotations.push(Quaternion::identity());
            self.prev_rotations.push(Quaternion::identity());
            self.scales.push(Vector3::new(1.0, 1.0, 1.0));
            self.prev_scales.push(Vector3::new(1.0, 1.0, 1.0));
            self.aabbs.push(Aabb::empty());
            self.local_matrices.push(Affine3::identity());
            self.abs_matrices.push(Affine3::identity());
            self.families.push(EntityFamily::default());
        }
    }

    pub fn create_entity(&mut self, name: &str) -> Handle<Entity> {
        let handle = self.entities.allocate(());
        let index = Self::idx(handle);
        self.ensure_slot(index);

        self.metas[index] = EntityMeta {
            name: self.names.allocate(name),
            flags: EntityFlags::LOCAL_TRANSFORM_DIRTY | EntityFlags::ABS_TRANSFORM_DIRTY,
        };
        self.positions[index] = Vector3::zeros();
        self.prev_positions[index] = Vector3::zeros();
        self.rotations[index] = Quaternion::identity();
        self.prev_rotations[index] = Quaternion::identity();
        self.scales[index] = Vector3::new(1.0, 1.0, 1.0);
        self.prev_scales[index] = Vector3::new(1.0, 1.0, 1.0);
        self.aabbs[index] = Aabb::empty();
        self.local_matrices[index] = Affine3::identity();
        self.abs_matrices[index] = Affine3::identity();
        self.families[index] = EntityFamily::default();

        handle
    }

    pub fn name(&self, entity: Handle<Entity>) -> &str {
        assert!(self.is_valid(entity), "invalid entity handle");
        self.names.get(self.metas[Self::idx(entity)].name)
    }

    pub fn family(&self, entity: Handle<Entity>) -> EntityFamily {
        assert!(self.is_valid(entity), "invalid entity handle");
        self.families[Self::idx(entity)]
    }

    /// Destroys `entity`: detaches it from its parent's child list first, then recursively
    /// destroys every descendant (§3 invariant 3, §8 scenario 2).
    pub fn destroy_entity(&mut self, entity: Handle<Entity>) {
        assert!(self.is_valid(entity), "invalid entity handle");

        let family = self.families[Self::idx(entity)];
        if self.is_valid(family.parent) {
            self.remove_child(family.parent, entity);
        }

        let mut child = family.first_child;
        while self.is_valid(child) {
            let next = self.families[Self::idx(child)].next_sibling;
            self.destroy_entity(child);
            child = next;
        }

        self.names.free(self.metas[Self::idx(entity)].name);
        self.entities.free(entity);
    }

    /// Re-links `child_to_add`'s sibling chain onto the tail of `parent`'s children, detaching it
    /// from any current parent first.
    pub fn add_child(&mut self, parent: Handle<Entity>, child_to_add: Handle<Entity>) {
        assert!(self.is_valid(parent), "invalid parent handle");
        assert!(self.is_valid(child_to_add), "invalid child handle");

        let current_parent = self.families[Self::idx(child_to_add)].parent;
        if self.is_valid(current_parent) {
            self.remove_child(current_parent, child_to_add);
        }

        self.families[Self::idx(child_to_add)].parent = parent;

        let first_child = self.families[Self::idx(parent)].first_child;
        if !self.is_valid(first_child) {
            self.families[Self::idx(parent)].first_child = child_to_add;
            self.families[Self::idx(child_to_add)].prev_sibling = Handle::NULL;
            self.families[Self::idx(child_to_add)].next_sibling = Handle::NULL;
        } else {
            let mut last = first_child;
            loop {
                let next = self.families[Self::idx(last)].next_sibling;
                if !self.is_valid(next) {
                    break;
                }
                last = next;
            }
            self.families[Self::idx(last)].next_sibling = child_to_add;
            self.families[Self::idx(child_to_add)].prev_sibling = last;
        }

        self.mark_entity_dirty(child_to_add, EntityFlags::ABS_TRANSFORM_DIRTY);
    }

    /// Unlinks `child_to_remove` from `parent`'s sibling chain, reassigning `first_child` if the
    /// head was removed (§3 invariant 4).
    pub fn remove_child(&mut self, parent: Handle<Entity>, child_to_remove: Handle<Entity>) {
        assert!(self.is_valid(parent), "invalid parent handle");
        assert!(self.is_valid(child_to_remove), "invalid child handle");

        let child_family = self.families[Self::idx(child_to_remove)];

        if self.families[Self::idx(parent)].first_child == child_to_remove {
            self.families[Self::idx(parent)].first_child = child_family.next_sibling;
            if self.is_valid(child_family.next_sibling) {
                self.families[Self::idx(child_family.next_sibling)].prev_sibling = Handle::NULL;
            }
        } else {
            if self.is_valid(child_family.prev_sibling) {
                self.families[Self::idx(child_family.prev_sibling)].next_sibling =
                    child_family.next_sibling;
            }
            if self.is_valid(child_family.next_sibling) {
                self.families[Self::idx(child_family.next_sibling)].prev_sibling =
                    child_family.prev_sibling;
            }
        }

        let slot = &mut self.families[Self::idx(child_to_remove)];
        slot.parent = Handle::NULL;
        slot.prev_sibling = Handle::NULL;
        slot.next_sibling = Handle::NULL;
    }

    fn mark_entity_dirty(&mut self, entity: Handle<Entity>, flags: EntityFlags) {
        self.metas[Self::idx(entity)].flags.insert(flags);
    }

    fn mark_descendants_dirty(&mut self, entity: Handle<Entity>, flags: EntityFlags) {
        let mut child = self.families[Self::idx(entity)].first_child;
        while self.is_valid(child) {
            self.mark_entity_dirty(child, flags);
            self.mark_descendants_dirty(child, flags);
            child = self.families[Self::idx(child)].next_sibling;
        }
    }

    pub fn position(&self, entity: Handle<Entity>) -> Vector3 {
        self.positions[Self::idx(entity)]
    }

    pub fn rotation(&self, entity: Handle<Entity>) -> Quaternion {
        self.rotations[Self::idx(entity)]
    }

    pub fn scale(&self, entity: Handle<Entity>) -> Vector3 {
        self.scales[Self::idx(entity)]
    }

    pub fn aabb(&self, entity: Handle<Entity>) -> Aabb {
        self.aabbs[Self::idx(entity)]
    }

    pub fn expand_aabb(&mut self, entity: Handle<Entity>, other: &Aabb) {
        let index = Self::idx(entity);
        self.aabbs[index] = self.aabbs[index].merge(other);
    }

    pub fn set_position(&mut self, entity: Handle<Entity>, position: Vector3) {
        assert!(self.is_valid(entity), "invalid entity handle");
        self.positions[Self::idx(entity)] = position;
        self.mark_entity_dirty(
            entity,
            EntityFlags::LOCAL_TRANSFORM_DIRTY | EntityFlags::ABS_TRANSFORM_DIRTY,
        );
        self.mark_descendants_dirty(entity, EntityFlags::ABS_TRANSFORM_DIRTY);
    }

    pub fn set_rotation(&mut self, entity: Handle<Entity>, rotation: Quaternion) {
        assert!(self.is_valid(entity), "invalid entity handle");
        self.rotations[Self::idx(entity)] = rotation;
        self.mark_entity_dirty(
            entity,
            EntityFlags::LOCAL_TRANSFORM_DIRTY
                | EntityFlags::ABS_TRANSFORM_DIRTY
                | EntityFlags::ABS_ROTATION_DIRTY,
        );
        self.mark_descendants_dirty(
            entity,
            EntityFlags::ABS_TRANSFORM_DIRTY | EntityFlags::ABS_ROTATION_DIRTY,
        );
    }

    pub fn set_scale(&mut self, entity: Handle<Entity>, scale: Vector3) {
        assert!(self.is_valid(entity), "invalid entity handle");
        self.scales[Self::idx(entity)] = scale;
        self.mark_entity_dirty(
            entity,
            EntityFlags::LOCAL_TRANSFORM_DIRTY | EntityFlags::ABS_TRANSFORM_DIRTY,
        );
        self.mark_descendants_dirty(entity, EntityFlags::ABS_TRANSFORM_DIRTY);
    }

    /// Writes the current TRS into the previous-frame slots, for `calculate_interpolated_transform_abs`
    /// to read from. Called by the update thread once per fixed tick.
    pub fn snapshot_previous(&mut self, entity: Handle<Entity>) {
        let index = Self::idx(entity);
        self.prev_positions[index] = self.positions[index];
        self.prev_rotations[index] = self.rotations[index];
        self.prev_scales[index] = self.scales[index];
    }

    /// Recomputes `local_matrix = T * R * S` iff `LOCAL_TRANSFORM_DIRTY`, clearing the flag.
    pub fn transform(&mut self, entity: Handle<Entity>) -> Affine3 {
        assert!(self.is_valid(entity), "invalid entity handle");
        let index = Self::idx(entity);
        if self.metas[index]
            .flags
            .contains(EntityFlags::LOCAL_TRANSFORM_DIRTY)
        {
            self.local_matrices[index] =
                Affine3::from_trs(self.positions[index], self.rotations[index], self.scales[index]);
            self.metas[index]
                .flags
                .remove(EntityFlags::LOCAL_TRANSFORM_DIRTY);
        }
        self.local_matrices[index]
    }

    /// Recomputes `abs_matrix = parent.abs_matrix * local_matrix` iff `ABS_TRANSFORM_DIRTY`,
    /// recursing to the parent first, clearing the flag (§3 invariant 1, §8 scenario 3).
    pub fn transform_abs(&mut self, entity: Handle<Entity>) -> Affine3 {
        assert!(self.is_valid(entity), "invalid entity handle");
        let index = Self::idx(entity);
        if self.metas[index]
            .flags
            .contains(EntityFlags::ABS_TRANSFORM_DIRTY)
        {
            let local = self.transform(entity);
            let parent = self.families[index].parent;
            self.abs_matrices[index] = if self.is_valid(parent) {
                self.transform_abs(parent).compose(&local)
            } else {
                local
            };
            self.metas[index]
                .flags
                .remove(EntityFlags::ABS_TRANSFORM_DIRTY);
        }
        self.abs_matrices[index]
    }

    /// Resolves `position` (absolute space) to local space by left-multiplying with the parent's
    /// absolute inverse. A no-op if the parent's absolute linear part is singular (§8 boundary
    /// behavior: never divide by zero on an absolute-scale setter).
    pub fn set_position_abs(&mut self, entity: Handle<Entity>, position: Vector3) {
        assert!(self.is_valid(entity), "invalid entity handle");
        let parent = self.families[Self::idx(entity)].parent;
        if !self.is_valid(parent) {
            self.set_position(entity, position);
            return;
        }
        let parent_abs = self.transform_abs(parent);
        let Some(inverse_parent) = parent_abs.inverse() else {
            return;
        };
        self.set_position(entity, inverse_parent.transform_point(position));
    }

    pub fn set_rotation_abs(&mut self, entity: Handle<Entity>, rotation: Quaternion) {
        assert!(self.is_valid(entity), "invalid entity handle");
        let parent = self.families[Self::idx(entity)].parent;
        if !self.is_valid(parent) {
            self.set_rotation(entity, rotation);
            return;
        }
        let parent_abs = self.transform_abs(parent);
        let Some((_, parent_rotation, _)) = parent_abs.decompose() else {
            return;
        };
        self.set_rotation(entity, parent_rotation.inverse() * rotation);
    }

    pub fn set_scale_abs(&mut self, entity: Handle<Entity>, scale: Vector3) {
        assert!(self.is_valid(entity), "invalid entity handle");
        let parent = self.families[Self::idx(entity)].parent;
        if !self.is_valid(parent) {
            self.set_scale(entity, scale);
            return;
        }
        let parent_abs = self.transform_abs(parent);
        let Some((_, _, parent_scale)) = parent_abs.decompose() else {
            return;
        };
        self.set_scale(
            entity,
            Vector3::new(
                scale.x / parent_scale.x,
                scale.y / parent_scale.y,
                scale.z / parent_scale.z,
            ),
        );
    }

    pub fn position_abs(&mut self, entity: Handle<Entity>) -> Vector3 {
        self.transform_abs(entity).translation
    }

    /// `transform(lerp(prev_pos, pos, t), slerp(prev_rot, rot, t), lerp(prev_scale, scale, t))`,
    /// per §4.5. Reads only the entity's own previous/current TRS, not the abs chain: the render
    /// thread interpolates every ancestor on the way down and composes as it walks, rather than
    /// interpolating an already-composed abs matrix (which would not commute with slerp).
    pub fn calculate_interpolated_transform(&self, entity: Handle<Entity>, t: f32) -> Affine3 {
        let index = Self::idx(entity);
        let position = sfg_math::lerp(self.prev_positions[index], self.positions[index], t);
        let scale = sfg_math::lerp(self.prev_scales[index], self.scales[index], t);
        let rotation = sfg_math::slerp(self.prev_rotations[index], self.rotations[index], t);
        Affine3::from_trs(position, rotation, scale)
    }

    pub fn calculate_interpolated_transform_abs(&mut self, entity: Handle<Entity>, t: f32) -> Affine3 {
        let local = self.calculate_interpolated_transform(entity, t);
        let parent = self.families[Self::idx(entity)].parent;
        if self.is_valid(parent) {
            self.calculate_interpolated_transform_abs(parent, t).compose(&local)
        } else {
            local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> EntityManager {
        EntityManager::new(64, 64 * 5)
    }

    #[test]
    fn destroy_detaches_and_recurses() {
        let mut em = manager();
        let p = em.create_entity("P");
        let c1 = em.create_entity("C1");
        let c2 = em.create_entity("C2");
        let g = em.create_entity("G");
        em.add_child(p, c1);
        em.add_child(p, c2);
        em.add_child(c1, g);

        em.destroy_entity(c1);

        assert_eq!(em.family(p).first_child, c2);
        assert_eq!(em.family(c2).prev_sibling, Handle::NULL);
        assert_eq!(em.family(c2).next_sibling, Handle::NULL);
        assert!(!em.is_valid(g));
        assert_eq!(em.live_count(), 2);
    }

    #[test]
    fn transform_propagates_and_clears_dirty() {
        let mut em = manager();
        let p = em.create_entity("P");
        let c = em.create_entity("C");
        em.add_child(p, c);

        em.set_position(p, Vector3::new(10.0, 0.0, 0.0));
        em.set_position(c, Vector3::new(1.0, 0.0, 0.0));

        assert_eq!(em.transform_abs(c).translation, Vector3::new(11.0, 0.0, 0.0));

        em.set_position(p, Vector3::zeros());
        assert_eq!(em.transform_abs(c).translation, Vector3::new(1.0, 0.0, 0.0));
        assert!(!em.metas[EntityManager::idx(p)]
            .flags
            .contains(EntityFlags::ABS_TRANSFORM_DIRTY));
        assert!(!em.metas[EntityManager::idx(c)]
            .flags
            .contains(EntityFlags::ABS_TRANSFORM_DIRTY));
    }

    #[test]
    fn stale_handle_asserts() {
        let mut em = manager();
        let e = em.create_entity("e");
        em.destroy_entity(e);
        assert!(!em.is_valid(e));
    }

    #[test]
    fn abs_setter_is_noop_on_singular_parent_scale() {
        let mut em = manager();
        let p = em.create_entity("P");
        let c = em.create_entity("C");
        em.add_child(p, c);
        em.set_scale(p, Vector3::new(0.0, 1.0, 1.0));

        em.set_position_abs(c, Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(em.position(c), Vector3::zeros());
    }
}
