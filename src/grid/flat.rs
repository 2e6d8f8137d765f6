//! Row/column/cell edits on a flat child list viewed as a grid.
//!
//! A nested grid container and a row-shaped container both store their cells
//! as one child list. The cell at flat index `i` sits at
//! `(i / cols, i % cols)`. The primitives are generic over the item type so
//! arena children (`NodeId`) and detached cell specs share them.

use crate::{
    error::{Direction, EditError},
    project::LayoutType,
    tree::count_value,
    widget::PropMap,
};

/// Display width used when editing a row-shaped container as a grid.
pub const ROW_EDITOR_COLUMNS: usize = 4;

/// Default `columns` of a grid container.
pub const DEFAULT_GRID_COLUMNS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlatOp {
    InsertCell,
    InsertRow,
    InsertColumn,
    DeleteCell,
    DeleteRow,
    DeleteColumn,
}

impl FlatOp {
    pub const ALL: [FlatOp; 6] = [
        FlatOp::InsertCell,
        FlatOp::InsertRow,
        FlatOp::InsertColumn,
        FlatOp::DeleteCell,
        FlatOp::DeleteRow,
        FlatOp::DeleteColumn,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            FlatOp::InsertCell => "Insert cell",
            FlatOp::InsertRow => "Insert row",
            FlatOp::InsertColumn => "Insert column",
            FlatOp::DeleteCell => "Delete cell",
            FlatOp::DeleteRow => "Delete row",
            FlatOp::DeleteColumn => "Delete column",
        }
    }
}

/// Grid geometry of a flat child list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlatShape {
    pub cols: usize,
    /// Explicit row count, if the container records one.
    pub rows: Option<usize>,
    /// Column inserts/deletes also change the container's `columns`.
    pub tracks_columns: bool,
}

impl FlatShape {
    pub fn row_editor() -> Self {
        Self {
            cols: ROW_EDITOR_COLUMNS,
            rows: None,
            tracks_columns: false,
        }
    }

    /// Shape of a container with the given layout and fields. Tab sets are
    /// not editable this way.
    pub fn for_container(layout: Option<&LayoutType>, fields: &PropMap) -> Option<Self> {
        match layout {
            Some(LayoutType::Tabs) => None,
            Some(LayoutType::Grid) => Some(Self {
                cols: fields
                    .get("columns")
                    .and_then(count_value)
                    .unwrap_or(DEFAULT_GRID_COLUMNS),
                rows: fields.get("rows").and_then(count_value),
                tracks_columns: true,
            }),
            _ => Some(Self::row_editor()),
        }
    }

    pub fn rows_for(&self, len: usize) -> usize {
        self.rows
            .unwrap_or_else(|| (len + 1).div_ceil(self.cols.max(1)))
            .max(1)
    }
}

/// Result of a flat edit.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatEdit<T> {
    pub selection: usize,
    pub removed: Vec<T>,
    /// New column count.
    pub cols: usize,
}

/// Applies `op` around the selected flat index. `placeholder` makes the
/// filler for inserted slots. Rejected edits leave `items` untouched.
pub fn apply<T>(
    items: &mut Vec<T>,
    shape: FlatShape,
    sel: usize,
    op: FlatOp,
    mut placeholder: impl FnMut() -> T,
) -> Result<FlatEdit<T>, EditError> {
    let cols = shape.cols.max(1);
    let n = items.len();
    let rows = shape.rows_for(n);
    let sel_row = sel / cols;
    let sel_col = sel % cols;
    let mut removed = Vec::new();
    let mut new_cols = cols;

    let selection = match op {
        FlatOp::InsertCell => {
            items.insert(sel.min(n), placeholder());
            sel + 1
        }
        FlatOp::InsertRow => {
            let at = (sel_row * cols).min(n);
            for _ in 0..cols {
                items.insert(at, placeholder());
            }
            sel + cols
        }
        FlatOp::InsertColumn => {
            for r in (0..rows).rev() {
                let at = r * cols + sel_col;
                if at <= items.len() {
                    items.insert(at, placeholder());
                }
            }
            if shape.tracks_columns {
                new_cols = cols + 1;
            }
            sel + 1
        }
        FlatOp::DeleteCell => {
            if sel >= n {
                return Err(EditError::OutOfRange { index: sel, len: n });
            }
            removed.push(items.remove(sel));
            sel
        }
        FlatOp::DeleteRow => {
            if rows <= 1 {
                return Err(EditError::LastRow);
            }
            let start = sel_row * cols;
            for _ in 0..cols {
                if start < items.len() {
                    removed.push(items.remove(start));
                }
            }
            sel.saturating_sub(cols).min(((rows - 1) * cols).saturating_sub(1))
        }
        FlatOp::DeleteColumn => {
            if cols <= 1 {
                return Err(EditError::LastColumn);
            }
            for r in (0..rows).rev() {
                let at = r * cols + sel_col;
                if at < items.len() {
                    removed.push(items.remove(at));
                }
            }
            if shape.tracks_columns {
                new_cols = cols - 1;
            }
            sel.saturating_sub(1).min((rows * (cols - 1)).saturating_sub(1))
        }
    };

    Ok(FlatEdit {
        selection: selection.min(items.len().saturating_sub(1)),
        removed,
        cols: new_cols,
    })
}

/// Swaps the selected item with its neighbour; returns the new selection.
pub fn swap<T>(items: &mut [T], cols: usize, sel: usize, dir: Direction) -> Result<usize, EditError> {
    let other = neighbour(cols, sel, dir, items.len()).ok_or(EditError::AtEdge(dir))?;
    if sel >= items.len() {
        return Err(EditError::OutOfRange {
            index: sel,
            len: items.len(),
        });
    }
    items.swap(sel, other);
    Ok(other)
}

/// Flat index of the neighbour in `dir`, if it exists within `len` items.
pub fn neighbour(cols: usize, sel: usize, dir: Direction, len: usize) -> Option<usize> {
    let cols = cols.max(1);
    let other = match dir {
        Direction::Up => sel.checked_sub(cols)?,
        Direction::Down => sel + cols,
        Direction::Left if sel % cols > 0 => sel - 1,
        Direction::Right if sel % cols < cols - 1 => sel + 1,
        _ => return None,
    };
    (other < len).then_some(other)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(cols: usize) -> FlatShape {
        FlatShape {
            cols,
            rows: None,
            tracks_columns: true,
        }
    }

    fn items(n: usize) -> Vec<i32> {
        (1..=n as i32).collect()
    }

    #[test]
    fn test_insert_cell() {
        let mut v = items(3);
        let edit = apply(&mut v, shape(2), 1, FlatOp::InsertCell, || 0).unwrap();
        assert_eq!(v, vec![1, 0, 2, 3]);
        assert_eq!(edit.selection, 2);
    }

    #[test]
    fn test_insert_row() {
        let mut v = items(4);
        let edit = apply(&mut v, shape(2), 3, FlatOp::InsertRow, || 0).unwrap();
        assert_eq!(v, vec![1, 2, 0, 0, 3, 4]);
        assert_eq!(edit.selection, 5);
    }

    #[test]
    fn test_insert_column_tracks_columns() {
        let mut v = items(4);
        let edit = apply(&mut v, shape(2), 0, FlatOp::InsertColumn, || 0).unwrap();
        // the trailing append row gets a slot as well
        assert_eq!(v, vec![0, 1, 2, 0, 3, 4, 0]);
        assert_eq!(edit.cols, 3);

        let mut v = items(4);
        let edit = apply(&mut v, FlatShape::row_editor(), 0, FlatOp::InsertColumn, || 0).unwrap();
        assert_eq!(edit.cols, ROW_EDITOR_COLUMNS);
        assert_eq!(v.len(), 6);
    }

    #[test]
    fn test_delete_cell() {
        let mut v = items(3);
        let edit = apply(&mut v, shape(2), 2, FlatOp::DeleteCell, || 0).unwrap();
        assert_eq!(v, vec![1, 2]);
        assert_eq!(edit.removed, vec![3]);
        assert_eq!(edit.selection, 1);
        let err = apply(&mut v, shape(2), 5, FlatOp::DeleteCell, || 0).unwrap_err();
        assert_eq!(err, EditError::OutOfRange { index: 5, len: 2 });
    }

    #[test]
    fn test_delete_row() {
        let mut v = items(4);
        let edit = apply(&mut v, shape(2), 2, FlatOp::DeleteRow, || 0).unwrap();
        assert_eq!(v, vec![1, 2]);
        assert_eq!(edit.removed, vec![3, 4]);
        assert_eq!(edit.selection, 0);

        let mut single = items(1);
        let err = apply(&mut single, shape(2), 0, FlatOp::DeleteRow, || 0).unwrap_err();
        assert_eq!(err, EditError::LastRow);
        assert_eq!(single, vec![1]);
    }

    #[test]
    fn test_delete_column() {
        let mut v = items(4);
        let edit = apply(&mut v, shape(2), 1, FlatOp::DeleteColumn, || 0).unwrap();
        assert_eq!(v, vec![1, 3]);
        assert_eq!(edit.cols, 1);
        let err = apply(&mut v, shape(1), 0, FlatOp::DeleteColumn, || 0).unwrap_err();
        assert_eq!(err, EditError::LastColumn);
    }

    #[test]
    fn test_swap_and_edges() {
        let mut v = items(4);
        assert_eq!(swap(&mut v, 2, 0, Direction::Down), Ok(2));
        assert_eq!(v, vec![3, 2, 1, 4]);
        assert_eq!(
            swap(&mut v, 2, 1, Direction::Right),
            Err(EditError::AtEdge(Direction::Right))
        );
        assert_eq!(
            swap(&mut v, 2, 0, Direction::Up),
            Err(EditError::AtEdge(Direction::Up))
        );
        assert_eq!(neighbour(2, 3, Direction::Down, 4), None);
    }

    #[test]
    fn test_shape_for_container() {
        let mut fields = PropMap::new();
        fields.insert("columns".into(), serde_json::json!(3));
        let s = FlatShape::for_container(Some(&LayoutType::Grid), &fields).unwrap();
        assert_eq!(s.cols, 3);
        assert_eq!(s.rows_for(5), 2);
        assert_eq!(s.rows_for(0), 1);
        assert!(FlatShape::for_container(Some(&LayoutType::Tabs), &fields).is_none());
        assert_eq!(
            FlatShape::for_container(None, &fields),
            Some(FlatShape::row_editor())
        );
    }
}
