//! Typed and type-erased component columns.
//!
//! A [`Column<T>`] is a dense `Vec<T>` holding one component type's values for
//! every row of an archetype. Archetypes hold their columns behind
//! [`ErasedColumn`] so tables with different component sets share one type;
//! typed access goes through [`ErasedColumn::as_any`] downcasts.
//!
//! All row-removing operations are swap-removes: the last cell moves into the
//! vacated row. Callers keep every column of a table in lockstep by applying
//! the same row operation to each.

use std::any::Any;
use std::fmt;

/// Object-safe view of a [`Column<T>`].
pub trait ErasedColumn: Any {
    /// Number of cells stored.
    fn len(&self) -> usize;

    /// Returns `true` if the column holds no cells.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocated cell capacity.
    fn capacity(&self) -> usize;

    /// Reserve room for exactly `additional` more cells.
    fn reserve_exact(&mut self, additional: usize);

    /// Swap-remove the cell at `row` and drop it.
    fn drop_cell(&mut self, row: usize);

    /// Swap-remove the cell at `row` and push it onto `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `dst` stores a different component type, or `row` is out of
    /// range.
    fn move_cell(&mut self, row: usize, dst: &mut dyn ErasedColumn);

    /// Swap-remove the cell at `row` into `slot`, which must be an
    /// `Option<T>` for this column's `T`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not an `Option<T>`, or `row` is out of range.
    fn take_cell(&mut self, row: usize, slot: &mut dyn Any);

    /// Name of the stored component type.
    fn type_name(&self) -> &'static str;

    /// Upcast for typed downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl fmt::Debug for dyn ErasedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedColumn")
            .field("type", &self.type_name())
            .field("len", &self.len())
            .finish()
    }
}

/// A dense column of `T` values.
#[derive(Debug, Clone)]
pub struct Column<T> {
    data: Vec<T>,
}

impl<T> Column<T> {
    /// Create an empty column without allocating.
    #[must_use]
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Append a value.
    pub fn push(&mut self, value: T) {
        self.data.push(value);
    }

    /// Swap-remove and return the value at `row`.
    pub fn swap_remove(&mut self, row: usize) -> T {
        self.data.swap_remove(row)
    }

    /// Returns the cells as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the cells as a mutable slice.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Number of cells stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the column holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T> Default for Column<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ErasedColumn for Column<T> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn capacity(&self) -> usize {
        self.data.capacity()
    }

    fn reserve_exact(&mut self, additional: usize) {
        self.data.reserve_exact(additional);
    }

    fn drop_cell(&mut self, row: usize) {
        self.data.swap_remove(row);
    }

    fn move_cell(&mut self, row: usize, dst: &mut dyn ErasedColumn) {
        let dst_type = dst.type_name();
        let Some(dst) = dst.as_any_mut().downcast_mut::<Column<T>>() else {
            panic!(
                "cannot move a `{}` cell into a `{}` column",
                std::any::type_name::<T>(),
                dst_type
            );
        };
        dst.data.push(self.data.swap_remove(row));
    }

    fn take_cell(&mut self, row: usize, slot: &mut dyn Any) {
        let Some(slot) = slot.downcast_mut::<Option<T>>() else {
            panic!(
                "slot for a `{}` cell has the wrong type",
                std::any::type_name::<T>()
            );
        };
        *slot = Some(self.data.swap_remove(row));
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
