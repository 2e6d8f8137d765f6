//! Grid projection: a rectangular cell matrix viewed as a tree of flow rows.

pub mod flat;

pub use flat::{FlatEdit, FlatOp, FlatShape};

use crate::{
    error::{Direction, EditError, GridError},
    project::{ContainerSpec, LayoutType, NodeSpec},
    tree::{IdentifierMinter, InsertKind, LayoutTree, NodeId, NodeKind},
    widget::value_to_string,
};
use serde_json::{Value, json};
use std::fmt;

pub const DEFAULT_ROWS: usize = 4;
pub const DEFAULT_COLS: usize = 6;

/// A cell is empty or holds a widget, container or group.
pub type Cell = Option<NodeSpec>;

/// Cross-axis alignment of a grid row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RowAlign {
    Start,
    #[default]
    Center,
    End,
    Stretch,
}

impl RowAlign {
    pub const ALL: [RowAlign; 4] = [
        RowAlign::Start,
        RowAlign::Center,
        RowAlign::End,
        RowAlign::Stretch,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            RowAlign::Start => "start",
            RowAlign::Center => "center",
            RowAlign::End => "end",
            RowAlign::Stretch => "stretch",
        }
    }

    /// Anything that is not one of the four names becomes `Center`.
    pub fn coerce(v: Option<&Value>) -> Self {
        let raw = v.and_then(value_to_string).unwrap_or_default();
        match raw.trim().to_ascii_lowercase().as_str() {
            "start" => RowAlign::Start,
            "end" => RowAlign::End,
            "stretch" => RowAlign::Stretch,
            _ => RowAlign::Center,
        }
    }
}

impl fmt::Display for RowAlign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `rows × cols` matrix of optional cells plus one alignment per row.
#[derive(Clone, Debug, PartialEq)]
pub struct GridState {
    cells: Vec<Vec<Cell>>,
    row_align: Vec<RowAlign>,
    cols: usize,
}

impl Default for GridState {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS, DEFAULT_COLS)
    }
}

impl GridState {
    /// Empty grid; both dimensions are clamped to at least one.
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            cells: vec![vec![None; cols]; rows],
            row_align: vec![RowAlign::default(); rows],
            cols,
        }
    }

    /// Builds a grid from rows of cells, right-padding short rows.
    pub fn from_rows(rows: Vec<Vec<Cell>>, row_align: Vec<RowAlign>) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let mut grid = Self {
            row_align,
            cells: rows,
            cols,
        };
        if grid.cells.is_empty() {
            grid.cells.push(Vec::new());
        }
        grid.row_align.resize(grid.cells.len(), RowAlign::default());
        grid.pad_rows();
        grid
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cells(&self) -> &[Vec<Cell>] {
        &self.cells
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&NodeSpec> {
        self.cells.get(row)?.get(col)?.as_ref()
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut NodeSpec> {
        self.cells.get_mut(row)?.get_mut(col)?.as_mut()
    }

    /// Places `cell` at `(row, col)`; placeholders are stored as empty.
    pub fn set_cell(&mut self, row: usize, col: usize, cell: Cell) -> Result<Cell, EditError> {
        let rows = self.rows();
        let cols = self.cols;
        let slot = self
            .cells
            .get_mut(row)
            .ok_or(EditError::OutOfRange { index: row, len: rows })?
            .get_mut(col)
            .ok_or(EditError::OutOfRange { index: col, len: cols })?;
        let cell = cell.filter(|c| !c.is_placeholder());
        Ok(std::mem::replace(slot, cell))
    }

    pub fn row_align(&self, row: usize) -> RowAlign {
        self.row_align.get(row).copied().unwrap_or_default()
    }

    pub fn set_row_align(&mut self, row: usize, align: RowAlign) {
        if let Some(a) = self.row_align.get_mut(row) {
            *a = align;
        }
    }

    /// Identifiers used anywhere in the grid, nested children included.
    pub fn identifiers(&self) -> Vec<String> {
        fn collect(spec: &NodeSpec, out: &mut Vec<String>) {
            if !spec.id().is_empty() {
                out.push(spec.id().to_owned());
            }
            for c in spec.children() {
                collect(c, out);
            }
        }
        let mut out = Vec::new();
        for cell in self.cells.iter().flatten().flatten() {
            collect(cell, &mut out);
        }
        out
    }

    /// Clamps a selection into the matrix.
    pub fn clamp(&self, (row, col): (usize, usize)) -> (usize, usize) {
        (row.min(self.rows() - 1), col.min(self.cols - 1))
    }

    fn pad_rows(&mut self) {
        for row in &mut self.cells {
            row.resize(self.cols, None);
        }
    }

    fn check_row(&self, row: usize) -> Result<(), EditError> {
        if row < self.rows() {
            Ok(())
        } else {
            Err(EditError::OutOfRange {
                index: row,
                len: self.rows(),
            })
        }
    }

    fn check_col(&self, col: usize) -> Result<(), EditError> {
        if col < self.cols {
            Ok(())
        } else {
            Err(EditError::OutOfRange {
                index: col,
                len: self.cols,
            })
        }
    }

    /// Inserts an empty cell at `(row, col)`, shifting the rest of that row
    /// right.
    ///
    /// When the row ends in an empty slot, that slot absorbs the shift and the
    /// grid keeps its width. Only a row that is full to the last column widens
    /// the grid by one, padding the other rows.
    pub fn insert_cell(&mut self, row: usize, col: usize) -> Result<(), EditError> {
        self.check_row(row)?;
        let r = &mut self.cells[row];
        let at = col.min(r.len());
        r.insert(at, None);
        // a trailing empty slot takes the shift; the grid does not widen
        if r.len() > self.cols && r.last().is_some_and(Option::is_none) {
            r.pop();
        }
        self.cols = self.cols.max(self.cells[row].len());
        self.pad_rows();
        Ok(())
    }

    pub fn insert_row(&mut self, at: usize) {
        let at = at.min(self.rows());
        self.cells.insert(at, vec![None; self.cols]);
        self.row_align.insert(at, RowAlign::default());
    }

    pub fn insert_column(&mut self, at: usize) {
        let at = at.min(self.cols);
        for row in &mut self.cells {
            row.insert(at, None);
        }
        self.cols += 1;
    }

    /// Removes the cell at `(row, col)`; the rest of the row shifts left.
    pub fn delete_cell(&mut self, row: usize, col: usize) -> Result<Cell, EditError> {
        if self.cols <= 1 {
            return Err(EditError::LastCell);
        }
        self.check_row(row)?;
        self.check_col(col)?;
        let removed = self.cells[row].remove(col);
        self.cols = self.cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
        self.pad_rows();
        Ok(removed)
    }

    pub fn delete_row(&mut self, row: usize) -> Result<Vec<Cell>, EditError> {
        if self.rows() <= 1 {
            return Err(EditError::LastRow);
        }
        self.check_row(row)?;
        self.row_align.remove(row);
        Ok(self.cells.remove(row))
    }

    pub fn delete_column(&mut self, col: usize) -> Result<Vec<Cell>, EditError> {
        if self.cols <= 1 {
            return Err(EditError::LastColumn);
        }
        self.check_col(col)?;
        let removed = self.cells.iter_mut().map(|row| row.remove(col)).collect();
        self.cols -= 1;
        Ok(removed)
    }

    /// Exchanges the cell at `(row, col)` with its neighbour; returns the
    /// neighbour's position.
    pub fn swap(&mut self, row: usize, col: usize, dir: Direction) -> Result<(usize, usize), EditError> {
        self.check_row(row)?;
        self.check_col(col)?;
        let (dr, dc) = dir.delta();
        let to_row = row
            .checked_add_signed(dr)
            .filter(|r| *r < self.rows())
            .ok_or(EditError::AtEdge(dir))?;
        let to_col = col
            .checked_add_signed(dc)
            .filter(|c| *c < self.cols)
            .ok_or(EditError::AtEdge(dir))?;
        if to_row == row {
            self.cells[row].swap(col, to_col);
        } else {
            let a = self.cells[row][col].take();
            let b = std::mem::replace(&mut self.cells[to_row][to_col], a);
            self.cells[row][col] = b;
        }
        Ok((to_row, to_col))
    }

    /// Resizes to at least `1 × 1`, truncating or padding with empty cells.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        let rows = rows.max(1);
        self.cols = cols.max(1);
        self.cells.resize_with(rows, Vec::new);
        self.row_align.resize(rows, RowAlign::default());
        for row in &mut self.cells {
            row.truncate(self.cols);
        }
        self.pad_rows();
    }

    /// Default instance of `kind` under an identifier unused in this grid.
    fn instance(&self, kind: &InsertKind) -> Result<NodeSpec, EditError> {
        let placeable = match kind {
            InsertKind::Container(layout) => cell_layout_allowed(layout),
            InsertKind::Tab => false,
            InsertKind::Group | InsertKind::Widget(_) => kind.is_known(),
        };
        if !placeable {
            return Err(EditError::NotPlaceable(kind.name().to_owned()));
        }
        let mut used = self.identifiers();
        used.push("dashboard".to_owned());
        used.extend((0..self.rows()).map(|r| format!("row_{r}")));
        let mut spec = kind.template();
        spec.set_id(IdentifierMinter::new(used).mint(kind.prefix()));
        Ok(spec)
    }

    /// Puts a default instance of `kind` into `(row, col)`, replacing what
    /// was there. Returns the new identifier.
    pub fn place(&mut self, row: usize, col: usize, kind: &InsertKind) -> Result<String, EditError> {
        self.check_row(row)?;
        self.check_col(col)?;
        let spec = self.instance(kind)?;
        let id = spec.id().to_owned();
        self.cells[row][col] = Some(spec);
        Ok(id)
    }

    /// Puts a default instance of `kind` at flat index `sel` of the container
    /// in cell `(row, col)`.
    pub fn place_nested(
        &mut self,
        row: usize,
        col: usize,
        sel: usize,
        kind: &InsertKind,
    ) -> Result<String, EditError> {
        let spec = self.instance(kind)?;
        let id = spec.id().to_owned();
        let children = self
            .cell_mut(row, col)
            .and_then(NodeSpec::children_mut)
            .ok_or(EditError::NotAContainer)?;
        let len = children.len();
        let slot = children
            .get_mut(sel)
            .ok_or(EditError::OutOfRange { index: sel, len })?;
        *slot = spec;
        Ok(id)
    }

    /// Swaps a child of the container in cell `(row, col)` with its flat
    /// neighbour.
    pub fn swap_nested(&mut self, row: usize, col: usize, sel: usize, dir: Direction) -> Result<usize, EditError> {
        let spec = self.cell_mut(row, col).ok_or(EditError::NotAContainer)?;
        let layout = match &*spec {
            NodeSpec::Container(c) => Some(c.layout_type.clone()),
            _ => None,
        };
        let shape = FlatShape::for_container(layout.as_ref(), spec.fields())
            .ok_or(EditError::NotAContainer)?;
        let children = spec.children_mut().ok_or(EditError::NotAContainer)?;
        flat::swap(children, shape.cols, sel, dir)
    }

    /// Applies a flat-list edit to the container in cell `(row, col)`.
    pub fn edit_nested(
        &mut self,
        row: usize,
        col: usize,
        sel: usize,
        op: FlatOp,
    ) -> Result<FlatEdit<NodeSpec>, EditError> {
        let spec = self.cell_mut(row, col).ok_or(EditError::NotAContainer)?;
        edit_spec(spec, sel, op)
    }

    /// Builds the row-per-container tree form of this grid.
    ///
    /// Each row becomes flow-row container `row_<r>`. Empty cells between
    /// occupied ones become placeholders; trailing empty cells are dropped.
    pub fn to_root(&self) -> ContainerSpec {
        let mut root = ContainerSpec::new("dashboard", LayoutType::Column);
        root.fields.insert("columns".into(), json!(self.cols));
        for (r, row) in self.cells.iter().enumerate() {
            let used = row.iter().rposition(Option::is_some).map_or(0, |p| p + 1);
            let mut container = ContainerSpec::new(format!("row_{r}"), LayoutType::RowsColumns);
            container
                .fields
                .insert("align_items".into(), json!(self.row_align(r).as_str()));
            container.children = row[..used]
                .iter()
                .map(|c| c.clone().unwrap_or_else(NodeSpec::placeholder))
                .collect();
            root.children.push(NodeSpec::Container(container));
        }
        root
    }

    /// Replaces the root of `tree` with this grid's projection. Appearance
    /// and document-level fields are kept.
    pub fn apply_to(&self, tree: &mut LayoutTree) {
        let mut doc = tree.to_document();
        doc.dashboard = self.to_root();
        *tree = LayoutTree::from_document(&doc);
    }

    pub fn to_tree(&self) -> LayoutTree {
        let mut tree = LayoutTree::default();
        self.apply_to(&mut tree);
        tree
    }

    /// Reads a tree whose root holds only flow-row containers.
    pub fn from_tree(tree: &LayoutTree) -> Result<Self, GridError> {
        let root = tree.root();
        let row_ids = tree.children(root);
        if row_ids.is_empty() {
            return Ok(Self::default());
        }
        let recorded_cols = tree
            .node(root)
            .and_then(|n| n.count_field("columns"))
            .unwrap_or(1);

        let mut rows = Vec::with_capacity(row_ids.len());
        let mut aligns = Vec::with_capacity(row_ids.len());
        for &row_id in row_ids {
            let row = tree
                .node(row_id)
                .ok_or_else(|| GridError::IncompatibleShape("dangling row".into()))?;
            if row.layout_type() != Some(&LayoutType::RowsColumns) {
                return Err(GridError::IncompatibleShape(format!(
                    "{} is not a flow row",
                    row.ident
                )));
            }
            aligns.push(RowAlign::coerce(row.fields.get("align_items")));
            let mut cells = Vec::with_capacity(row.children().len());
            for &child in row.children() {
                cells.push(cell_of(tree, child)?);
            }
            rows.push(cells);
        }

        let longest = rows.iter().map(Vec::len).max().unwrap_or(0);
        let cols = longest.max(recorded_cols).max(1);
        let mut grid = Self::from_rows(rows, aligns);
        if grid.cols < cols {
            grid.cols = cols;
            grid.pad_rows();
        }
        Ok(grid)
    }
}

fn cell_of(tree: &LayoutTree, id: NodeId) -> Result<Cell, GridError> {
    let node = tree
        .node(id)
        .ok_or_else(|| GridError::IncompatibleShape("dangling cell".into()))?;
    match &node.kind {
        NodeKind::Placeholder => Ok(None),
        NodeKind::Widget { .. } | NodeKind::Group => Ok(tree.to_spec(id)),
        NodeKind::Container { layout_type } if cell_layout_allowed(layout_type) => {
            Ok(tree.to_spec(id))
        }
        NodeKind::Container { layout_type } => Err(GridError::IncompatibleShape(format!(
            "{} container {} cannot sit in a grid cell",
            layout_type, node.ident
        ))),
        NodeKind::Tab => Err(GridError::IncompatibleShape(format!(
            "tab {} outside a tab set",
            node.ident
        ))),
    }
}

/// Every known layout except free-position can sit in a cell.
pub fn cell_layout_allowed(layout: &LayoutType) -> bool {
    !matches!(layout, LayoutType::Xy | LayoutType::Unknown(_))
}

/// Flat edit on a detached container spec.
pub fn edit_spec(spec: &mut NodeSpec, sel: usize, op: FlatOp) -> Result<FlatEdit<NodeSpec>, EditError> {
    let layout = match spec {
        NodeSpec::Container(c) => Some(c.layout_type.clone()),
        _ => None,
    };
    let shape = FlatShape::for_container(layout.as_ref(), spec.fields())
        .ok_or(EditError::NotAContainer)?;
    let children = spec.children_mut().ok_or(EditError::NotAContainer)?;
    let edit = flat::apply(children, shape, sel, op, NodeSpec::placeholder)?;
    if shape.tracks_columns {
        spec.fields_mut().insert("columns".into(), json!(edit.cols));
    }
    Ok(edit)
}

impl LayoutTree {
    /// Flat edit on the children of an arena container. Removed subtrees are
    /// freed; the returned ids are no longer live.
    pub fn edit_flat(&mut self, id: NodeId, sel: usize, op: FlatOp) -> Result<FlatEdit<NodeId>, EditError> {
        let node = self.node(id).ok_or(EditError::NotAContainer)?;
        if !node.is_branch() {
            return Err(EditError::NotAContainer);
        }
        let shape = FlatShape::for_container(node.layout_type(), &node.fields)
            .ok_or(EditError::NotAContainer)?;
        let mut children = node.children().to_vec();
        let edit = flat::apply(&mut children, shape, sel, op, || {
            self.alloc_spec(NodeSpec::placeholder(), Some(id))
        })?;
        self.set_children(id, children);
        if shape.tracks_columns {
            self.set_node_property(id, "columns", json!(edit.cols));
        }
        Ok(edit)
    }

    /// Swaps a child of an arena container with its flat-grid neighbour.
    pub fn swap_flat(&mut self, id: NodeId, sel: usize, dir: Direction) -> Result<usize, EditError> {
        let node = self.node(id).ok_or(EditError::NotAContainer)?;
        let shape = FlatShape::for_container(node.layout_type(), &node.fields)
            .ok_or(EditError::NotAContainer)?;
        let mut children = node.children().to_vec();
        let other = flat::swap(&mut children, shape.cols, sel, dir)?;
        self.set_children(id, children);
        Ok(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        project::{LayoutDocument, WidgetSpec},
        widget::WidgetType,
    };

    fn widget(id: &str) -> Cell {
        Some(NodeSpec::Widget(WidgetSpec::new(id, WidgetType::Button)))
    }

    fn sample() -> GridState {
        GridState::from_rows(
            vec![
                vec![widget("a"), None, widget("b"), None],
                vec![None, None, None, None],
                vec![widget("c")],
            ],
            vec![RowAlign::End, RowAlign::Center, RowAlign::Stretch],
        )
    }

    fn assert_rectangular(g: &GridState) {
        for row in g.cells() {
            assert_eq!(row.len(), g.cols());
        }
    }

    #[test]
    fn test_roundtrip() {
        let g = sample();
        assert_eq!(g.cols(), 4);
        let back = GridState::from_tree(&g.to_tree()).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn test_gaps_become_placeholders() {
        let root = sample().to_root();
        let row0 = &root.children[0];
        let kids = row0.children();
        assert_eq!(kids.len(), 3);
        assert!(kids[1].is_placeholder());
        assert!(root.children[1].children().is_empty());
        assert_eq!(root.fields.get("columns"), Some(&json!(4)));
        assert_eq!(row0.fields().get("align_items"), Some(&json!("end")));
    }

    #[test]
    fn test_empty_root_gives_default_grid() {
        let g = GridState::from_tree(&LayoutTree::default()).unwrap();
        assert_eq!((g.rows(), g.cols()), (DEFAULT_ROWS, DEFAULT_COLS));
    }

    #[test]
    fn test_incompatible_shapes() {
        let doc: LayoutDocument = serde_json::from_value(json!({
            "dashboard": { "id": "dashboard", "layout_type": "column", "children": [
                { "type": "widget", "id": "w", "widget_type": "button" }
            ]}
        }))
        .unwrap();
        let err = GridState::from_tree(&LayoutTree::from_document(&doc)).unwrap_err();
        assert!(matches!(err, GridError::IncompatibleShape(_)));

        let doc: LayoutDocument = serde_json::from_value(json!({
            "dashboard": { "id": "dashboard", "children": [
                { "type": "container", "id": "row_0", "layout_type": "rows_columns", "children": [
                    { "type": "container", "id": "free", "layout_type": "xy", "children": [] }
                ]}
            ]}
        }))
        .unwrap();
        assert!(GridState::from_tree(&LayoutTree::from_document(&doc)).is_err());
    }

    #[test]
    fn test_row_align_coercion() {
        assert_eq!(RowAlign::coerce(Some(&json!(" END "))), RowAlign::End);
        assert_eq!(RowAlign::coerce(Some(&json!("baseline"))), RowAlign::Center);
        assert_eq!(RowAlign::coerce(None), RowAlign::Center);
    }

    #[test]
    fn test_insert_cell_shifts_within_row() {
        let mut g = sample();
        g.insert_cell(0, 0).unwrap();
        assert_rectangular(&g);
        assert_eq!(g.cols(), 4);
        assert_eq!(g.cell(0, 1).map(NodeSpec::id), Some("a"));
        assert_eq!(g.cell(0, 3).map(NodeSpec::id), Some("b"));

        // full row widens the grid and pads the other rows
        let mut g = GridState::from_rows(
            vec![vec![widget("a"), widget("b")], vec![widget("c"), None]],
            vec![],
        );
        g.insert_cell(0, 1).unwrap();
        assert_eq!(g.cols(), 3);
        assert_rectangular(&g);
        assert!(g.cell(1, 2).is_none());
        assert_eq!(g.cell(0, 2).map(NodeSpec::id), Some("b"));
        assert!(g.insert_cell(3, 0).is_err());
    }

    #[test]
    fn test_insert_row_and_column() {
        let mut g = sample();
        g.insert_row(1);
        assert_eq!(g.rows(), 4);
        assert_eq!(g.row_align(0), RowAlign::End);
        assert_eq!(g.row_align(1), RowAlign::Center);
        assert_eq!(g.row_align(3), RowAlign::Stretch);
        g.insert_column(0);
        assert_eq!(g.cols(), 5);
        assert_rectangular(&g);
        assert_eq!(g.cell(0, 1).map(NodeSpec::id), Some("a"));
    }

    #[test]
    fn test_delete_rejections_leave_grid_unchanged() {
        let mut g = GridState::new(1, 1);
        assert_eq!(g.delete_row(0), Err(EditError::LastRow));
        assert_eq!(g.delete_column(0), Err(EditError::LastColumn));
        assert_eq!(g.delete_cell(0, 0), Err(EditError::LastCell));
        assert_eq!((g.rows(), g.cols()), (1, 1));
    }

    #[test]
    fn test_deletes_keep_rectangle() {
        let mut g = sample();
        g.delete_cell(0, 0).unwrap();
        assert_rectangular(&g);
        assert_eq!(g.cell(0, 1).map(NodeSpec::id), Some("b"));
        g.delete_column(0).unwrap();
        assert_eq!(g.cols(), 3);
        assert_rectangular(&g);
        g.delete_row(1).unwrap();
        assert_eq!(g.rows(), 2);
        assert_eq!(g.row_align(1), RowAlign::Stretch);
    }

    #[test]
    fn test_swap() {
        let mut g = sample();
        assert_eq!(g.swap(0, 0, Direction::Down), Ok((1, 0)));
        assert_eq!(g.cell(1, 0).map(NodeSpec::id), Some("a"));
        assert_eq!(g.swap(0, 0, Direction::Up), Err(EditError::AtEdge(Direction::Up)));
        assert_eq!(
            g.swap(0, 3, Direction::Right),
            Err(EditError::AtEdge(Direction::Right))
        );
    }

    #[test]
    fn test_resize_clamps() {
        let mut g = sample();
        g.resize(0, 0);
        assert_eq!((g.rows(), g.cols()), (1, 1));
        assert_eq!(g.cell(0, 0).map(NodeSpec::id), Some("a"));
        g.resize(2, 3);
        assert_rectangular(&g);
        assert_eq!(g.rows(), 2);
    }

    #[test]
    fn test_nested_grid_edit_updates_columns() {
        let mut nested = ContainerSpec::new("inner", LayoutType::Grid);
        nested.fields.insert("columns".into(), json!(2));
        nested.children = vec![widget("x").unwrap(), widget("y").unwrap()];
        let mut g = GridState::new(1, 1);
        g.set_cell(0, 0, Some(NodeSpec::Container(nested))).unwrap();
        let edit = g.edit_nested(0, 0, 1, FlatOp::InsertColumn).unwrap();
        assert_eq!(edit.cols, 3);
        let inner = g.cell(0, 0).unwrap();
        assert_eq!(inner.fields().get("columns"), Some(&json!(3)));
        assert!(inner.children()[1].is_placeholder());
    }

    #[test]
    fn test_place_mints_unique_ids() {
        let mut g = sample();
        let id = g.place(1, 0, &InsertKind::Widget(WidgetType::Slider)).unwrap();
        assert_eq!(id, "widget_1");
        let again = g.place(1, 1, &InsertKind::Widget(WidgetType::Slider)).unwrap();
        assert_eq!(again, "widget_2");
        assert_eq!(
            g.place(0, 0, &InsertKind::Tab),
            Err(EditError::NotPlaceable("tab".into()))
        );
        assert!(g.place(0, 0, &InsertKind::Container(LayoutType::Xy)).is_err());

        let grid_id = g.place(2, 0, &InsertKind::Container(LayoutType::Grid)).unwrap();
        g.edit_nested(2, 0, 0, FlatOp::InsertCell).unwrap();
        g.edit_nested(2, 0, 0, FlatOp::InsertCell).unwrap();
        let inner = g.place_nested(2, 0, 1, &InsertKind::Group).unwrap();
        assert_eq!(inner, "group_1");
        assert_eq!(g.swap_nested(2, 0, 1, Direction::Left), Ok(0));
        let cell = g.cell(2, 0).unwrap();
        assert_eq!(cell.id(), grid_id);
        assert_eq!(cell.children()[0].id(), "group_1");
    }

    #[test]
    fn test_arena_flat_edit() {
        let mut tree = sample().to_tree();
        let row0 = tree.get_node(&[0]).unwrap();
        let edit = tree.edit_flat(row0, 0, FlatOp::InsertCell).unwrap();
        assert_eq!(edit.selection, 1);
        let first = tree.children(row0)[0];
        assert_eq!(tree.node(first).unwrap().kind, NodeKind::Placeholder);

        let edit = tree.edit_flat(row0, 1, FlatOp::DeleteCell).unwrap();
        assert_eq!(edit.removed.len(), 1);
        assert!(tree.node(edit.removed[0]).is_none());
        assert!(!tree.identifiers().any(|i| i == "a"));

        let leaf = tree.children(row0)[1];
        assert_eq!(
            tree.edit_flat(leaf, 0, FlatOp::InsertCell),
            Err(EditError::NotAContainer)
        );
    }
}
