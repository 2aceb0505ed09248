//! # Transform Hierarchy: Parent/Child Transforms in a Dense Table
//!
//! Every entity that has ever had a local transform or a parent gets one
//! `TransformRow` in a dense `Vec`. Rows link to each other by row index, so
//! the tree lives entirely inside the table:
//!
//! ```text
//! row:          0 (sentinel)   1 (A)   2 (B)   3 (C)
//! parent:       0              0       1       1
//! first_child:  0              2       0       0
//! prev_sibling: 0              0       0       2
//! next_sibling: 0              0       3       0
//! ```
//!
//! Row 0 is never a real entity; a link value of `0` means "none".
//!
//! ## Propagation
//!
//! World matrices are recomputed eagerly: [`set_local`](TransformHierarchy::set_local)
//! and [`set_parent`](TransformHierarchy::set_parent) walk the touched subtree
//! top-down right away, so [`world_of`](TransformHierarchy::world_of) is always
//! a plain read. The cost of a write is proportional to the subtree size.
//!
//! glam uses column vectors, so a row's world matrix is
//! `parent.world * local`.
//!
//! ## Removal
//!
//! Destroying a row detaches it from its parent, re-roots its children (their
//! world matrix becomes their local one) and then swap-removes it. The row that
//! moves into the hole gets every reference to its old index patched: the
//! parent's `first_child`, both sibling neighbours, each child's `parent`, and
//! the slot → row map.

use crate::ecs::Entity;
use crate::error::EcsError;
use crate::math::Mat4;

/// Row index meaning "no row".
const NONE: u32 = 0;

/// One entity's transform state and tree links.
#[derive(Debug, Clone, Copy)]
struct TransformRow {
    local: Mat4,
    world: Mat4,
    parent: u32,
    first_child: u32,
    prev_sibling: u32,
    next_sibling: u32,
    /// Reverse lookup for compaction and stale-handle checks.
    owner: Entity,
}

impl TransformRow {
    fn new(owner: Entity) -> Self {
        Self {
            local: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
            parent: NONE,
            first_child: NONE,
            prev_sibling: NONE,
            next_sibling: NONE,
            owner,
        }
    }
}

/// Dense table of transform rows forming a forest.
///
/// Read access is public; writes go through [`World`](super::world::World) or a
/// [`SystemContext`](super::system::SystemContext), which reject stale
/// handles before touching the table.
pub struct TransformHierarchy {
    rows: Vec<TransformRow>,
    /// Entity slot → row index (`NONE` if the entity has no row).
    slot_to_row: Vec<u32>,
}

impl TransformHierarchy {
    pub(crate) fn new(capacity: usize) -> Self {
        let mut rows = Vec::with_capacity(capacity + 1);
        rows.push(TransformRow::new(Entity {
            index: 0,
            generation: 0,
        }));
        Self {
            rows,
            slot_to_row: Vec::with_capacity(capacity),
        }
    }

    fn row_of(&self, entity: Entity) -> Option<u32> {
        let row = *self.slot_to_row.get(entity.slot())?;
        if row == NONE || self.rows[row as usize].owner != entity {
            return None;
        }
        Some(row)
    }

    fn ensure_row(&mut self, entity: Entity) -> u32 {
        if let Some(row) = self.row_of(entity) {
            return row;
        }
        let row = self.rows.len() as u32;
        self.rows.push(TransformRow::new(entity));
        let slot = entity.slot();
        if slot >= self.slot_to_row.len() {
            self.slot_to_row.resize(slot + 1, NONE);
        }
        self.slot_to_row[slot] = row;
        row
    }

    /// Number of entities with a transform row.
    pub fn len(&self) -> usize {
        self.rows.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.row_of(entity).is_some()
    }

    /// Cached world matrix; identity when the entity has no row.
    pub fn world_of(&self, entity: Entity) -> Mat4 {
        self.row_of(entity)
            .map_or(Mat4::IDENTITY, |row| self.rows[row as usize].world)
    }

    pub fn local_of(&self, entity: Entity) -> Option<Mat4> {
        self.row_of(entity).map(|row| self.rows[row as usize].local)
    }

    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        let row = self.row_of(entity)?;
        match self.rows[row as usize].parent {
            NONE => None,
            parent => Some(self.rows[parent as usize].owner),
        }
    }

    /// Direct children in insertion order.
    pub fn children(&self, entity: Entity) -> Children<'_> {
        let first = self
            .row_of(entity)
            .map_or(NONE, |row| self.rows[row as usize].first_child);
        Children {
            rows: &self.rows,
            next: first,
        }
    }

    /// Entities with a row but no parent, in row order.
    pub fn roots(&self) -> impl Iterator<Item = Entity> + '_ {
        self.rows[1..]
            .iter()
            .filter(|row| row.parent == NONE)
            .map(|row| row.owner)
    }

    /// `(entity, world matrix)` for every row, in row order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &Mat4)> {
        self.rows[1..].iter().map(|row| (row.owner, &row.world))
    }

    /// Store a new local matrix and recompute the subtree.
    pub(crate) fn set_local(&mut self, entity: Entity, local: Mat4) {
        let row = self.ensure_row(entity);
        self.rows[row as usize].local = local;
        self.propagate(row);
    }

    /// Attach `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub(crate) fn set_parent(&mut self, child: Entity, parent: Entity) -> Result<(), EcsError> {
        let cyclic = child == parent
            || matches!(
                (self.row_of(child), self.row_of(parent)),
                (Some(c), Some(p)) if self.is_ancestor(c, p)
            );
        if cyclic {
            log::warn!("refusing to parent {:?} under {:?}: cycle", child, parent);
            return Err(EcsError::CyclicParent { child, parent });
        }
        let c = self.ensure_row(child);
        let p = self.ensure_row(parent);
        self.unlink(c);
        self.append_child(p, c);
        self.propagate(c);
        Ok(())
    }

    /// Make `entity` a root again. Returns whether it had a parent.
    pub(crate) fn remove_parent(&mut self, entity: Entity) -> bool {
        let Some(row) = self.row_of(entity) else {
            return false;
        };
        if self.rows[row as usize].parent == NONE {
            return false;
        }
        self.unlink(row);
        self.propagate(row);
        true
    }

    /// Remove the entity's row. Its children become roots.
    pub(crate) fn destroy(&mut self, entity: Entity) -> bool {
        let Some(row) = self.row_of(entity) else {
            return false;
        };
        self.unlink(row);

        let mut orphans = Vec::new();
        let mut child = std::mem::replace(&mut self.rows[row as usize].first_child, NONE);
        while child != NONE {
            let c = &mut self.rows[child as usize];
            let next = c.next_sibling;
            c.parent = NONE;
            c.prev_sibling = NONE;
            c.next_sibling = NONE;
            orphans.push(child);
            child = next;
        }
        for &orphan in &orphans {
            self.propagate(orphan);
        }
        if !orphans.is_empty() {
            log::debug!("re-rooted {} children of {:?}", orphans.len(), entity);
        }

        let last = (self.rows.len() - 1) as u32;
        self.rows.swap_remove(row as usize);
        self.slot_to_row[entity.slot()] = NONE;
        if row != last {
            self.relocate(last, row);
        }
        true
    }

    /// Entity followed by all of its descendants, parents before children.
    pub fn subtree(&self, entity: Entity) -> Vec<Entity> {
        let Some(root) = self.row_of(entity) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(row) = stack.pop() {
            out.push(self.rows[row as usize].owner);
            let mut child = self.rows[row as usize].first_child;
            while child != NONE {
                stack.push(child);
                child = self.rows[child as usize].next_sibling;
            }
        }
        out
    }

    // ── Link maintenance ─────────────────────────────────────────────

    fn unlink(&mut self, row: u32) {
        let TransformRow {
            parent,
            prev_sibling: prev,
            next_sibling: next,
            ..
        } = self.rows[row as usize];
        if parent == NONE {
            return;
        }
        if prev != NONE {
            self.rows[prev as usize].next_sibling = next;
        } else {
            self.rows[parent as usize].first_child = next;
        }
        if next != NONE {
            self.rows[next as usize].prev_sibling = prev;
        }
        let r = &mut self.rows[row as usize];
        r.parent = NONE;
        r.prev_sibling = NONE;
        r.next_sibling = NONE;
    }

    fn append_child(&mut self, parent: u32, child: u32) {
        let first = self.rows[parent as usize].first_child;
        let prev = if first == NONE {
            self.rows[parent as usize].first_child = child;
            NONE
        } else {
            let mut last = first;
            while self.rows[last as usize].next_sibling != NONE {
                last = self.rows[last as usize].next_sibling;
            }
            self.rows[last as usize].next_sibling = child;
            last
        };
        let c = &mut self.rows[child as usize];
        c.parent = parent;
        c.prev_sibling = prev;
        c.next_sibling = NONE;
    }

    /// The row formerly at `from` now lives at `to`; repoint everything that
    /// referenced `from`.
    fn relocate(&mut self, from: u32, to: u32) {
        let TransformRow {
            parent,
            first_child,
            prev_sibling,
            next_sibling,
            owner,
            ..
        } = self.rows[to as usize];

        if parent != NONE && self.rows[parent as usize].first_child == from {
            self.rows[parent as usize].first_child = to;
        }
        if prev_sibling != NONE {
            self.rows[prev_sibling as usize].next_sibling = to;
        }
        if next_sibling != NONE {
            self.rows[next_sibling as usize].prev_sibling = to;
        }
        let mut child = first_child;
        while child != NONE {
            self.rows[child as usize].parent = to;
            child = self.rows[child as usize].next_sibling;
        }
        self.slot_to_row[owner.slot()] = to;
    }

    /// Is `ancestor` on the parent chain of `row` (or `row` itself)?
    fn is_ancestor(&self, ancestor: u32, row: u32) -> bool {
        let mut current = row;
        while current != NONE {
            if current == ancestor {
                return true;
            }
            current = self.rows[current as usize].parent;
        }
        false
    }

    /// Recompute `row` and everything below it, parents before children.
    fn propagate(&mut self, row: u32) {
        let mut stack = vec![row];
        while let Some(current) = stack.pop() {
            let r = self.rows[current as usize];
            let parent_world = match r.parent {
                NONE => Mat4::IDENTITY,
                parent => self.rows[parent as usize].world,
            };
            self.rows[current as usize].world = parent_world * r.local;

            let mut child = r.first_child;
            while child != NONE {
                stack.push(child);
                child = self.rows[child as usize].next_sibling;
            }
        }
    }
}

/// Iterator over an entity's direct children, following sibling links.
pub struct Children<'a> {
    rows: &'a [TransformRow],
    next: u32,
}

impl Iterator for Children<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        if self.next == NONE {
            return None;
        }
        let row = &self.rows[self.next as usize];
        self.next = row.next_sibling;
        Some(row.owner)
    }
}

#[cfg(test)]
impl TransformHierarchy {
    /// Panic if any link, map entry or cached matrix is inconsistent.
    pub(crate) fn assert_consistent(&self) {
        let n = self.rows.len() as u32;
        let sentinel = &self.rows[0];
        assert_eq!(sentinel.parent, NONE);
        assert_eq!(sentinel.first_child, NONE);
        assert_eq!(sentinel.next_sibling, NONE);
        assert_eq!(sentinel.prev_sibling, NONE);

        let mut linked_children = 0usize;
        for r in 1..n {
            let row = &self.rows[r as usize];
            assert_eq!(self.slot_to_row[row.owner.slot()], r, "slot map for row {r}");

            // Acyclic: the parent chain ends within n steps.
            let mut steps = 0;
            let mut current = row.parent;
            while current != NONE {
                assert!(current < n, "row {r} has dangling ancestor {current}");
                steps += 1;
                assert!(steps < n, "row {r} is on a cycle");
                current = self.rows[current as usize].parent;
            }

            if row.prev_sibling == NONE {
                if row.parent != NONE {
                    assert_eq!(self.rows[row.parent as usize].first_child, r);
                }
            } else {
                assert_eq!(self.rows[row.prev_sibling as usize].next_sibling, r);
                assert_eq!(self.rows[row.prev_sibling as usize].parent, row.parent);
            }
            if row.next_sibling != NONE {
                assert_eq!(self.rows[row.next_sibling as usize].prev_sibling, r);
            }
            if row.parent == NONE {
                assert_eq!(row.prev_sibling, NONE, "root {r} has a sibling");
                assert_eq!(row.next_sibling, NONE, "root {r} has a sibling");
            }

            let mut visits = 0u32;
            let mut child = row.first_child;
            while child != NONE {
                assert!(child < n, "row {r} has dangling child {child}");
                assert_eq!(self.rows[child as usize].parent, r);
                visits += 1;
                assert!(visits < n, "child list of {r} loops");
                child = self.rows[child as usize].next_sibling;
            }
            linked_children += visits as usize;

            let parent_world = match row.parent {
                NONE => Mat4::IDENTITY,
                p => self.rows[p as usize].world,
            };
            assert!(
                row.world.abs_diff_eq(parent_world * row.local, 1e-3),
                "stale world matrix on row {r}"
            );
        }
        let with_parent = self.rows[1..].iter().filter(|row| row.parent != NONE).count();
        assert_eq!(linked_children, with_parent);

        for (slot, &r) in self.slot_to_row.iter().enumerate() {
            if r != NONE {
                assert!(r < n);
                assert_eq!(self.rows[r as usize].owner.slot(), slot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn e(index: u32) -> Entity {
        Entity {
            index,
            generation: 0,
        }
    }

    fn translation(m: Mat4) -> Vec3 {
        m.w_axis.truncate()
    }

    fn at(x: f32, y: f32, z: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x, y, z))
    }

    #[test]
    fn no_row_means_identity() {
        let h = TransformHierarchy::new(0);
        assert_eq!(h.world_of(e(3)), Mat4::IDENTITY);
        assert_eq!(h.local_of(e(3)), None);
        assert!(h.is_empty());
    }

    #[test]
    fn root_world_equals_local() {
        let mut h = TransformHierarchy::new(0);
        h.set_local(e(0), at(10.0, 20.0, 0.0));
        assert_eq!(h.world_of(e(0)), at(10.0, 20.0, 0.0));
        h.assert_consistent();
    }

    #[test]
    fn moving_parent_moves_both_children() {
        let mut h = TransformHierarchy::new(0);
        let (a, b, c) = (e(0), e(1), e(2));
        h.set_local(b, at(0.0, 2.0, 0.0));
        h.set_local(c, at(0.0, 0.0, 3.0));
        h.set_parent(b, a).unwrap();
        h.set_parent(c, a).unwrap();
        h.set_local(a, at(1.0, 0.0, 0.0));

        assert!(translation(h.world_of(b)).abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-5));
        assert!(translation(h.world_of(c)).abs_diff_eq(Vec3::new(1.0, 0.0, 3.0), 1e-5));
        h.assert_consistent();
    }

    #[test]
    fn deep_chain_propagation() {
        let mut h = TransformHierarchy::new(0);
        h.set_local(e(0), at(1.0, 0.0, 0.0));
        h.set_local(e(1), at(2.0, 0.0, 0.0));
        h.set_local(e(2), at(3.0, 0.0, 0.0));
        h.set_parent(e(1), e(0)).unwrap();
        h.set_parent(e(2), e(1)).unwrap();

        assert!((translation(h.world_of(e(2))).x - 6.0).abs() < 1e-5); // 1 + 2 + 3

        h.set_local(e(0), at(10.0, 0.0, 0.0));
        assert!((translation(h.world_of(e(2))).x - 15.0).abs() < 1e-5);
        h.assert_consistent();
    }

    #[test]
    fn children_keep_insertion_order() {
        let mut h = TransformHierarchy::new(0);
        for i in 1..=3 {
            h.set_parent(e(i), e(0)).unwrap();
        }
        assert_eq!(h.children(e(0)).collect::<Vec<_>>(), vec![e(1), e(2), e(3)]);
        assert_eq!(h.parent_of(e(2)), Some(e(0)));
        assert_eq!(h.roots().collect::<Vec<_>>(), vec![e(0)]);
    }

    #[test]
    fn reparent_moves_between_child_lists() {
        let mut h = TransformHierarchy::new(0);
        let (p1, p2, x, y, z) = (e(0), e(1), e(2), e(3), e(4));
        h.set_parent(x, p1).unwrap();
        h.set_parent(y, p1).unwrap();
        h.set_parent(z, p1).unwrap();
        h.set_parent(z, p2).unwrap(); // tail
        h.set_parent(x, p2).unwrap(); // head

        assert_eq!(h.children(p1).collect::<Vec<_>>(), vec![y]);
        assert_eq!(h.children(p2).collect::<Vec<_>>(), vec![z, x]);
        h.assert_consistent();

        h.set_parent(y, p2).unwrap(); // only child
        assert_eq!(h.children(p1).count(), 0);
        assert_eq!(h.children(p2).collect::<Vec<_>>(), vec![z, x, y]);
        h.assert_consistent();
    }

    #[test]
    fn reparent_to_same_parent_moves_to_tail() {
        let mut h = TransformHierarchy::new(0);
        h.set_parent(e(1), e(0)).unwrap();
        h.set_parent(e(2), e(0)).unwrap();
        h.set_parent(e(1), e(0)).unwrap();
        assert_eq!(h.children(e(0)).collect::<Vec<_>>(), vec![e(2), e(1)]);
        h.assert_consistent();
    }

    #[test]
    fn reparent_uses_new_parent_world() {
        let mut h = TransformHierarchy::new(0);
        h.set_local(e(0), at(5.0, 0.0, 0.0));
        h.set_local(e(1), at(-5.0, 0.0, 0.0));
        h.set_local(e(2), at(1.0, 0.0, 0.0));
        h.set_parent(e(2), e(0)).unwrap();
        assert!((translation(h.world_of(e(2))).x - 6.0).abs() < 1e-5);
        h.set_parent(e(2), e(1)).unwrap();
        assert!((translation(h.world_of(e(2))).x + 4.0).abs() < 1e-5);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut h = TransformHierarchy::new(0);
        h.set_parent(e(1), e(0)).unwrap();
        h.set_parent(e(2), e(1)).unwrap();

        assert!(matches!(
            h.set_parent(e(0), e(2)),
            Err(EcsError::CyclicParent { .. })
        ));
        assert!(matches!(
            h.set_parent(e(3), e(3)),
            Err(EcsError::CyclicParent { .. })
        ));
        // Untouched, and no row created for the self-parent attempt.
        assert_eq!(h.parent_of(e(0)), None);
        assert!(!h.contains(e(3)));
        h.assert_consistent();
    }

    #[test]
    fn remove_parent_reroots() {
        let mut h = TransformHierarchy::new(0);
        h.set_local(e(0), at(1.0, 0.0, 0.0));
        h.set_local(e(1), at(2.0, 0.0, 0.0));
        h.set_parent(e(1), e(0)).unwrap();
        assert!(h.remove_parent(e(1)));
        assert!(!h.remove_parent(e(1)));
        assert_eq!(h.world_of(e(1)), at(2.0, 0.0, 0.0));
        assert_eq!(h.children(e(0)).count(), 0);
        h.assert_consistent();
    }

    #[test]
    fn destroy_middle_of_chain_reroots_grandchild() {
        let mut h = TransformHierarchy::new(0);
        let (a, b, c) = (e(0), e(1), e(2));
        h.set_local(a, at(1.0, 0.0, 0.0));
        h.set_local(b, at(2.0, 0.0, 0.0));
        h.set_local(c, at(3.0, 0.0, 0.0));
        h.set_parent(b, a).unwrap();
        h.set_parent(c, b).unwrap();

        assert!(h.destroy(b));
        assert!(!h.contains(b));
        assert_eq!(h.parent_of(c), None);
        assert_eq!(h.world_of(c), at(3.0, 0.0, 0.0));
        assert_eq!(h.children(a).count(), 0);
        h.assert_consistent();
    }

    #[test]
    fn destroy_moves_last_row_with_children_and_siblings() {
        let mut h = TransformHierarchy::new(0);
        // Rows: 1=e0 (victim), 2=p, 3=s1, 4=s3, 5=kid, 6=moved (last).
        h.set_local(e(0), at(9.0, 0.0, 0.0));
        h.set_local(e(1), at(0.0, 1.0, 0.0)); // p
        h.set_parent(e(2), e(1)).unwrap(); // s1
        h.set_parent(e(3), e(1)).unwrap(); // s3 (will sit after moved)
        h.set_local(e(4), at(0.0, 0.0, 7.0)); // kid of moved
        h.set_parent(e(5), e(1)).unwrap(); // moved row, last in table
        // Put moved between s1 and s3: re-append s3 so order is s1, moved, s3.
        h.set_parent(e(3), e(1)).unwrap();
        h.set_parent(e(4), e(5)).unwrap();
        h.assert_consistent();

        assert!(h.destroy(e(0)));
        h.assert_consistent();

        assert_eq!(h.children(e(1)).collect::<Vec<_>>(), vec![e(2), e(5), e(3)]);
        assert_eq!(h.parent_of(e(4)), Some(e(5)));
        assert_eq!(h.children(e(5)).collect::<Vec<_>>(), vec![e(4)]);

        // Moved row still propagates correctly.
        h.set_local(e(1), at(0.0, 2.0, 0.0));
        assert!(translation(h.world_of(e(4))).abs_diff_eq(Vec3::new(0.0, 2.0, 7.0), 1e-5));
        h.assert_consistent();
    }

    #[test]
    fn destroy_relinks_after_consecutive_moves() {
        let mut h = TransformHierarchy::new(0);
        h.set_local(e(0), Mat4::IDENTITY);
        h.set_parent(e(2), e(1)).unwrap();
        h.set_parent(e(3), e(1)).unwrap();
        // e(3) is the last row and moves first; then e(1) moves.
        assert!(h.destroy(e(0)));
        h.assert_consistent();
        assert!(h.destroy(e(2)));
        h.assert_consistent();
        assert_eq!(h.children(e(1)).collect::<Vec<_>>(), vec![e(3)]);
    }

    #[test]
    fn stale_owner_is_not_found() {
        let mut h = TransformHierarchy::new(0);
        h.set_local(e(0), at(1.0, 0.0, 0.0));
        let stale = Entity {
            index: 0,
            generation: 1,
        };
        assert!(!h.contains(stale));
        assert_eq!(h.world_of(stale), Mat4::IDENTITY);
    }

    #[test]
    fn subtree_lists_parents_first() {
        let mut h = TransformHierarchy::new(0);
        h.set_parent(e(1), e(0)).unwrap();
        h.set_parent(e(2), e(1)).unwrap();
        h.set_parent(e(3), e(0)).unwrap();
        let sub = h.subtree(e(0));
        assert_eq!(sub.len(), 4);
        assert_eq!(sub[0], e(0));
        let pos = |x: Entity| sub.iter().position(|&s| s == x).unwrap();
        assert!(pos(e(1)) < pos(e(2)));
        assert!(h.subtree(e(9)).is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::math::Vec3;
    use proptest::prelude::*;

    const ENTITIES: u32 = 8;

    #[derive(Debug, Clone)]
    enum Op {
        SetLocal(u32, f32, f32, f32),
        SetParent(u32, u32),
        RemoveParent(u32),
        Destroy(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        let idx = 0..ENTITIES;
        let coord = -10.0f32..10.0;
        prop_oneof![
            (idx.clone(), coord.clone(), coord.clone(), coord).prop_map(|(i, x, y, z)| Op::SetLocal(i, x, y, z)),
            (idx.clone(), idx.clone()).prop_map(|(c, p)| Op::SetParent(c, p)),
            idx.clone().prop_map(Op::RemoveParent),
            idx.prop_map(Op::Destroy),
        ]
    }

    fn e(index: u32) -> Entity {
        Entity {
            index,
            generation: 0,
        }
    }

    proptest! {
        #[test]
        fn random_edits_keep_forest_consistent(ops in prop::collection::vec(op(), 1..120)) {
            let mut h = TransformHierarchy::new(0);
            for op in ops {
                match op {
                    Op::SetLocal(i, x, y, z) => {
                        h.set_local(e(i), Mat4::from_translation(Vec3::new(x, y, z)));
                    }
                    Op::SetParent(c, p) => {
                        let old_parent = h.parent_of(e(c));
                        match h.set_parent(e(c), e(p)) {
                            Ok(()) => {
                                prop_assert_eq!(h.parent_of(e(c)), Some(e(p)));
                                prop_assert_eq!(h.children(e(p)).filter(|&x| x == e(c)).count(), 1);
                                if let Some(old) = old_parent {
                                    if old != e(p) {
                                        prop_assert!(h.children(old).all(|x| x != e(c)));
                                    }
                                }
                            }
                            Err(_) => {
                                prop_assert_eq!(h.parent_of(e(c)), old_parent);
                            }
                        }
                    }
                    Op::RemoveParent(i) => {
                        h.remove_parent(e(i));
                        prop_assert_eq!(h.parent_of(e(i)), None);
                    }
                    Op::Destroy(i) => {
                        h.destroy(e(i));
                        prop_assert!(!h.contains(e(i)));
                    }
                }
                h.assert_consistent();
            }
        }
    }
}
