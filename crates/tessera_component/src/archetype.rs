//! Archetype tables.
//!
//! An archetype is a unique combination of component types. Every entity with
//! exactly that combination lives in the same [`ArchetypeTable`], one row per
//! entity, so iterating an archetype is a linear walk over dense columns.
//!
//! Row order is not stable: removing a row moves the last row into the hole.
//! The table reports which entity moved and leaves index bookkeeping to the
//! caller; it knows nothing about where else entities are tracked.

use std::any::Any;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::column::{Column, ErasedColumn};
use crate::component::ComponentTypeId;
use crate::entity::Entity;
use crate::signature::Signature;

/// Identifier of an archetype: its position in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArchetypeId(pub u32);

impl ArchetypeId {
    /// Returns the id as a slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Result of moving a row from one table into another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovedRow {
    /// The entity's row in the destination table.
    pub row: usize,
    /// The entity that was moved into the vacated source row, if any. Its row
    /// index changed and must be updated by the caller.
    pub displaced: Option<Entity>,
}

/// A table of entities sharing the same archetype (set of component types).
///
/// Data is stored in struct-of-arrays (SoA) layout: one column per component
/// type in the signature, with entity ids stored in a parallel vector.
/// `entities[i]` and cell `i` of every column describe one entity.
#[derive(Debug)]
pub struct ArchetypeTable {
    id: ArchetypeId,
    signature: Signature,
    entities: Vec<Entity>,
    /// Sorted by component id.
    columns: Vec<(ComponentTypeId, Box<dyn ErasedColumn>)>,
    capacity: usize,
    initial_capacity: usize,
}

impl ArchetypeTable {
    /// Create a new, empty archetype table.
    ///
    /// `columns` must hold one empty column per id in `signature`. Nothing is
    /// allocated until the first row is appended; from then on capacity
    /// starts at `initial_capacity` and doubles whenever it runs out.
    #[must_use]
    pub fn new(
        id: ArchetypeId,
        signature: Signature,
        mut columns: Vec<(ComponentTypeId, Box<dyn ErasedColumn>)>,
        initial_capacity: usize,
    ) -> Self {
        columns.sort_by_key(|(type_id, _)| *type_id);
        debug_assert!(
            columns.iter().map(|(type_id, _)| *type_id).eq(signature.ids()),
            "columns do not match signature {signature:?}"
        );

        Self {
            id,
            signature,
            entities: Vec::new(),
            columns,
            capacity: 0,
            initial_capacity: initial_capacity.max(1),
        }
    }

    /// The archetype identifier.
    #[must_use]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// The set of component types stored in this table.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns the number of entities in this archetype table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if this table has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns the number of rows the table can hold before growing.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entity ids in row order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Returns `true` if this archetype contains the given component type.
    #[must_use]
    pub fn has_component(&self, type_id: ComponentTypeId) -> bool {
        self.signature.has(type_id)
    }

    /// Returns the column index for the given component type, if present.
    #[must_use]
    pub fn column_index(&self, type_id: ComponentTypeId) -> Option<usize> {
        self.columns
            .binary_search_by_key(&type_id, |(column_type, _)| *column_type)
            .ok()
    }

    /// Typed view of one column.
    #[must_use]
    pub fn column<T: 'static>(&self, type_id: ComponentTypeId) -> Option<&[T]> {
        let index = self.column_index(type_id)?;
        self.columns[index]
            .1
            .as_any()
            .downcast_ref::<Column<T>>()
            .map(Column::as_slice)
    }

    /// Mutable typed view of one column.
    #[must_use]
    pub fn column_mut<T: 'static>(&mut self, type_id: ComponentTypeId) -> Option<&mut [T]> {
        let index = self.column_index(type_id)?;
        self.columns[index]
            .1
            .as_any_mut()
            .downcast_mut::<Column<T>>()
            .map(Column::as_mut_slice)
    }

    /// Get a reference to the component of type `T` at `row`.
    #[must_use]
    pub fn get<T: 'static>(&self, type_id: ComponentTypeId, row: usize) -> Option<&T> {
        self.column::<T>(type_id)?.get(row)
    }

    /// Get a mutable reference to the component of type `T` at `row`.
    #[must_use]
    pub fn get_mut<T: 'static>(&mut self, type_id: ComponentTypeId, row: usize) -> Option<&mut T> {
        self.column_mut::<T>(type_id)?.get_mut(row)
    }

    /// Make room for one more row, doubling capacity if the table is full.
    ///
    /// Every column and the entity list grow together, before any cell of the
    /// new row is written.
    pub fn reserve_row(&mut self) {
        if self.entities.len() < self.capacity {
            return;
        }

        let new_capacity = if self.capacity == 0 {
            self.initial_capacity
        } else {
            self.capacity * 2
        };
        let additional = new_capacity - self.entities.len();
        self.entities.reserve_exact(additional);
        for (_, column) in &mut self.columns {
            column.reserve_exact(additional);
        }
        self.capacity = new_capacity;
        trace!(archetype = self.id.0, capacity = new_capacity, "grew archetype table");
    }

    /// Append one cell to the column for `type_id`.
    ///
    /// Only valid while a row is being assembled (see [`Self::append_row`]).
    ///
    /// # Panics
    ///
    /// Panics if the table has no column of type `T` for `type_id`.
    pub fn push_cell<T: 'static>(&mut self, type_id: ComponentTypeId, value: T) {
        let Some(index) = self.column_index(type_id) else {
            panic!("archetype {:?} has no column for {type_id}", self.id);
        };
        match self.columns[index].1.as_any_mut().downcast_mut::<Column<T>>() {
            Some(column) => column.push(value),
            None => panic!(
                "archetype {:?} has no `{}` column for {type_id}",
                self.id,
                std::any::type_name::<T>()
            ),
        }
    }

    /// Append a full row: reserve capacity, let `write` push exactly one cell
    /// into every column, then record `entity`. Returns the new row index.
    pub fn append_row(&mut self, entity: Entity, write: impl FnOnce(&mut Self)) -> usize {
        self.reserve_row();
        write(self);
        self.push_entity(entity)
    }

    /// Swap-remove `row`, dropping its cells.
    ///
    /// Returns the entity that now occupies `row`, or `None` if `row` was the
    /// last row.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of range.
    pub fn swap_remove_row(&mut self, row: usize) -> Option<Entity> {
        self.retire_row(row, None)
    }

    /// Swap-remove `row`, handing the cell of `type_id` to `slot` (an
    /// `Option<T>` for the column's `T`) and dropping the rest.
    ///
    /// Returns the displaced entity like [`Self::swap_remove_row`].
    pub fn take_row(&mut self, row: usize, type_id: ComponentTypeId, slot: &mut dyn Any) -> Option<Entity> {
        self.retire_row(row, Some((type_id, slot)))
    }

    /// Move `row` into `dst`.
    ///
    /// Cells whose component also exists in `dst` move there. The cell of the
    /// component named by `removed` (if any) goes into its slot. Every other
    /// cell is dropped. Any column `dst` has that this table lacks must
    /// already hold its cell for the new row.
    ///
    /// Destination capacity is reserved before the first cell moves.
    pub fn migrate_row(
        &mut self,
        row: usize,
        dst: &mut ArchetypeTable,
        mut removed: Option<(ComponentTypeId, &mut dyn Any)>,
    ) -> MovedRow {
        debug_assert!(row < self.entities.len(), "row {row} out of range in {:?}", self.id);
        dst.reserve_row();
        let entity = self.entities[row];

        for (type_id, column) in &mut self.columns {
            match dst.column_index(*type_id) {
                Some(index) => column.move_cell(row, dst.columns[index].1.as_mut()),
                None => match &mut removed {
                    Some((removed_id, slot)) if *removed_id == *type_id => {
                        column.take_cell(row, &mut **slot);
                    }
                    _ => column.drop_cell(row),
                },
            }
        }

        let new_row = dst.push_entity(entity);
        self.entities.swap_remove(row);
        trace!(
            entity = entity.0,
            from = self.id.0,
            to = dst.id.0,
            row = new_row,
            "moved row between archetypes"
        );
        MovedRow {
            row: new_row,
            displaced: self.entities.get(row).copied(),
        }
    }

    /// Split the table into its entity list and individually borrowable
    /// columns, for iteration that needs several columns at once.
    pub fn split_columns_mut(&mut self) -> TableColumns<'_> {
        TableColumns {
            entities: &self.entities,
            slots: self
                .columns
                .iter_mut()
                .map(|(type_id, column)| (*type_id, Some(column)))
                .collect(),
        }
    }

    fn retire_row(
        &mut self,
        row: usize,
        mut removed: Option<(ComponentTypeId, &mut dyn Any)>,
    ) -> Option<Entity> {
        debug_assert!(row < self.entities.len(), "row {row} out of range in {:?}", self.id);
        for (type_id, column) in &mut self.columns {
            match &mut removed {
                Some((removed_id, slot)) if *removed_id == *type_id => {
                    column.take_cell(row, &mut **slot);
                }
                _ => column.drop_cell(row),
            }
        }
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }

    fn push_entity(&mut self, entity: Entity) -> usize {
        let row = self.entities.len();
        self.entities.push(entity);
        debug_assert!(
            self.columns.iter().all(|(_, column)| column.len() == self.entities.len()),
            "columns of archetype {:?} out of step with its entity list",
            self.id
        );
        row
    }
}

/// An archetype table split into its entity list and columns that can be
/// borrowed independently of each other.
#[derive(Debug)]
pub struct TableColumns<'t> {
    entities: &'t [Entity],
    slots: Vec<(ComponentTypeId, Option<&'t mut Box<dyn ErasedColumn>>)>,
}

impl<'t> TableColumns<'t> {
    /// Entity ids in row order.
    #[must_use]
    pub fn entities(&self) -> &'t [Entity] {
        self.entities
    }

    /// Take the column for `type_id` as a typed slice.
    ///
    /// Returns `None` if the table has no such column, if `T` is the wrong
    /// type, or if the column was already taken.
    pub fn take<T: 'static>(&mut self, type_id: ComponentTypeId) -> Option<&'t mut [T]> {
        let index = self
            .slots
            .binary_search_by_key(&type_id, |(column_type, _)| *column_type)
            .ok()?;
        let column = self.slots[index].1.take()?;
        column
            .as_any_mut()
            .downcast_mut::<Column<T>>()
            .map(Column::as_mut_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POS: ComponentTypeId = ComponentTypeId(0);
    const VEL: ComponentTypeId = ComponentTypeId(1);
    const TAG: ComponentTypeId = ComponentTypeId(2);

    fn column<T: 'static>(type_id: ComponentTypeId) -> (ComponentTypeId, Box<dyn ErasedColumn>) {
        (type_id, Box::new(Column::<T>::new()))
    }

    fn pos_table(id: u32) -> ArchetypeTable {
        ArchetypeTable::new(
            ArchetypeId(id),
            Signature::from_ids([POS]),
            vec![column::<f32>(POS)],
            4,
        )
    }

    fn pos_vel_table(id: u32) -> ArchetypeTable {
        ArchetypeTable::new(
            ArchetypeId(id),
            Signature::from_ids([VEL, POS]),
            vec![column::<u64>(VEL), column::<f32>(POS)],
            4,
        )
    }

    fn push_pos(table: &mut ArchetypeTable, entity: u32, x: f32) -> usize {
        table.append_row(Entity(entity), |t| t.push_cell(POS, x))
    }

    #[test]
    fn test_archetype_table_creation() {
        let table = pos_vel_table(0);
        assert!(table.is_empty());
        assert_eq!(table.capacity(), 0);
        assert_eq!(table.column_index(POS), Some(0));
        assert_eq!(table.column_index(VEL), Some(1));
        assert_eq!(table.column_index(TAG), None);
        assert!(table.has_component(VEL));
    }

    #[test]
    fn test_append_row_returns_row_index() {
        let mut table = pos_table(0);
        assert_eq!(push_pos(&mut table, 7, 1.0), 0);
        assert_eq!(push_pos(&mut table, 8, 2.0), 1);
        assert_eq!(table.entities(), &[Entity(7), Entity(8)]);
        assert_eq!(table.column::<f32>(POS), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_capacity_doubles_from_initial() {
        let mut table = pos_table(0);
        push_pos(&mut table, 0, 0.0);
        assert_eq!(table.capacity(), 4);
        for i in 1..5 {
            push_pos(&mut table, i, i as f32);
        }
        assert_eq!(table.capacity(), 8);
        for i in 5..9 {
            push_pos(&mut table, i, i as f32);
        }
        assert_eq!(table.capacity(), 16);
        let xs: Vec<f32> = (0..9).map(|i| i as f32).collect();
        assert_eq!(table.column::<f32>(POS), Some(&xs[..]));
    }

    #[test]
    fn test_swap_remove_first_row() {
        let mut table = pos_table(0);
        push_pos(&mut table, 0, 0.0);
        push_pos(&mut table, 1, 1.0);
        push_pos(&mut table, 2, 2.0);

        let displaced = table.swap_remove_row(0);
        assert_eq!(displaced, Some(Entity(2)));
        assert_eq!(table.len(), 2);
        assert_eq!(table.entities(), &[Entity(2), Entity(1)]);
        assert_eq!(table.get::<f32>(POS, 0), Some(&2.0));
    }

    #[test]
    fn test_swap_remove_last_row_displaces_nothing() {
        let mut table = pos_table(0);
        push_pos(&mut table, 0, 0.0);
        push_pos(&mut table, 1, 1.0);
        assert_eq!(table.swap_remove_row(1), None);
        assert_eq!(table.entities(), &[Entity(0)]);
    }

    #[test]
    fn test_take_row_returns_cell() {
        let mut table = pos_table(0);
        push_pos(&mut table, 0, 5.0);
        push_pos(&mut table, 1, 6.0);
        let mut slot: Option<f32> = None;
        let displaced = table.take_row(0, POS, &mut slot);
        assert_eq!(slot, Some(5.0));
        assert_eq!(displaced, Some(Entity(1)));
    }

    #[test]
    fn test_migrate_row_adding_a_column() {
        let mut src = pos_table(0);
        let mut dst = pos_vel_table(1);
        push_pos(&mut src, 0, 1.5);
        push_pos(&mut src, 1, 2.5);

        dst.reserve_row();
        dst.push_cell(VEL, 99_u64);
        let moved = src.migrate_row(0, &mut dst, None);

        assert_eq!(moved, MovedRow { row: 0, displaced: Some(Entity(1)) });
        assert_eq!(dst.entities(), &[Entity(0)]);
        assert_eq!(dst.get::<f32>(POS, 0), Some(&1.5));
        assert_eq!(dst.get::<u64>(VEL, 0), Some(&99));
        assert_eq!(src.entities(), &[Entity(1)]);
        assert_eq!(src.get::<f32>(POS, 0), Some(&2.5));
    }

    #[test]
    fn test_migrate_row_removing_a_column() {
        let mut src = pos_vel_table(0);
        let mut dst = pos_table(1);
        src.append_row(Entity(3), |t| {
            t.push_cell(POS, 4.0_f32);
            t.push_cell(VEL, 8_u64);
        });

        let mut slot: Option<u64> = None;
        let moved = src.migrate_row(0, &mut dst, Some((VEL, &mut slot as &mut dyn Any)));
        assert_eq!(moved, MovedRow { row: 0, displaced: None });
        assert_eq!(slot, Some(8));
        assert!(src.is_empty());
        assert_eq!(dst.get::<f32>(POS, 0), Some(&4.0));
    }

    #[test]
    fn test_typed_access_with_wrong_type_is_none() {
        let mut table = pos_table(0);
        push_pos(&mut table, 0, 1.0);
        assert!(table.get::<u64>(POS, 0).is_none());
        assert!(table.get::<f32>(POS, 1).is_none());
        assert!(table.get::<f32>(VEL, 0).is_none());
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn test_push_cell_into_missing_column_panics() {
        let mut table = pos_table(0);
        table.push_cell(VEL, 1_u64);
    }

    #[test]
    fn test_split_columns_take_each_once() {
        let mut table = pos_vel_table(0);
        table.append_row(Entity(0), |t| {
            t.push_cell(POS, 1.0_f32);
            t.push_cell(VEL, 2_u64);
        });

        let mut columns = table.split_columns_mut();
        assert_eq!(columns.entities(), &[Entity(0)]);
        let pos = columns.take::<f32>(POS).unwrap();
        let vel = columns.take::<u64>(VEL).unwrap();
        pos[0] += 1.0;
        vel[0] *= 3;
        assert!(columns.take::<f32>(POS).is_none());
        assert!(columns.take::<f32>(TAG).is_none());

        assert_eq!(table.get::<f32>(POS, 0), Some(&2.0));
        assert_eq!(table.get::<u64>(VEL, 0), Some(&6));
    }
}
