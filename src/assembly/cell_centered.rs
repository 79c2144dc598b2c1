//! Element-centred finite-volume stencil.
//!
//! Local dof 0 is the element itself, dofs `1..` are its face neighbours in
//! intersection order. Interior face `i` connects dof 0 with dof `i + 1`;
//! intersections without a neighbour become boundary faces attached to dof 0.

use crate::assembly::stencil::{Position, Stencil, SubControlVolume, SubControlVolumeFace};
use crate::fv_error::FvError;
use std::sync::Arc;

/// One face of a cell as seen by the grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Intersection {
    /// Cell on the other side, `None` on the domain boundary.
    pub neighbor: Option<usize>,
    /// Unit outer normal.
    pub normal: Position,
    pub area: f64,
    pub center: Position,
}

/// The grid queries an element-centred stencil needs.
pub trait CellGrid {
    fn num_cells(&self) -> usize;
    fn cell_center(&self, cell: usize) -> Position;
    fn cell_volume(&self, cell: usize) -> f64;
    fn intersections(&self, cell: usize) -> Vec<Intersection>;
}

impl<G: CellGrid + ?Sized> CellGrid for &G {
    fn num_cells(&self) -> usize {
        (**self).num_cells()
    }
    fn cell_center(&self, cell: usize) -> Position {
        (**self).cell_center(cell)
    }
    fn cell_volume(&self, cell: usize) -> f64 {
        (**self).cell_volume(cell)
    }
    fn intersections(&self, cell: usize) -> Vec<Intersection> {
        (**self).intersections(cell)
    }
}

impl<G: CellGrid + ?Sized> CellGrid for Arc<G> {
    fn num_cells(&self) -> usize {
        (**self).num_cells()
    }
    fn cell_center(&self, cell: usize) -> Position {
        (**self).cell_center(cell)
    }
    fn cell_volume(&self, cell: usize) -> f64 {
        (**self).cell_volume(cell)
    }
    fn intersections(&self, cell: usize) -> Vec<Intersection> {
        (**self).intersections(cell)
    }
}

/// Stencil over a grid handle `G` (a reference or an `Arc` to the grid).
#[derive(Clone, Debug)]
pub struct CellCenteredStencil<G> {
    grid: G,
    cells: Vec<usize>,
    scvs: Vec<SubControlVolume>,
    interior_faces: Vec<SubControlVolumeFace>,
    boundary_faces: Vec<SubControlVolumeFace>,
    /// Intersections of the bound element, kept for the geometry pass.
    intersections: Vec<Intersection>,
}

impl<G: CellGrid> CellCenteredStencil<G> {
    pub fn new(grid: G) -> Self {
        Self {
            grid,
            cells: Vec::new(),
            scvs: Vec::new(),
            interior_faces: Vec::new(),
            boundary_faces: Vec::new(),
            intersections: Vec::new(),
        }
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    /// Grid cell of local dof `dof_idx`.
    pub fn cell(&self, dof_idx: usize) -> usize {
        self.cells[dof_idx]
    }
}

impl<G: CellGrid + Send> Stencil for CellCenteredStencil<G> {
    type Element = usize;

    /// # Panics
    /// If `element` is not a cell of the grid.
    fn update_topology(&mut self, element: &usize) -> Result<(), FvError> {
        let cell = *element;
        assert!(
            cell < self.grid.num_cells(),
            "cell {cell} out of range for grid with {} cells",
            self.grid.num_cells()
        );
        self.intersections = self.grid.intersections(cell);
        self.cells.clear();
        self.cells.push(cell);
        self.interior_faces.clear();
        self.boundary_faces.clear();
        for is in &self.intersections {
            match is.neighbor {
                Some(nb) => {
                    self.interior_faces.push(SubControlVolumeFace {
                        interior_index: 0,
                        exterior_index: self.cells.len(),
                        ..Default::default()
                    });
                    self.cells.push(nb);
                }
                None => self.boundary_faces.push(SubControlVolumeFace::default()),
            }
        }
        self.scvs.clear();
        self.scvs.resize(self.cells.len(), SubControlVolume::default());
        Ok(())
    }

    fn update(&mut self, element: &usize) -> Result<(), FvError> {
        self.update_topology(element)?;
        for (scv, &cell) in self.scvs.iter_mut().zip(&self.cells) {
            scv.global_pos = self.grid.cell_center(cell);
            scv.volume = self.grid.cell_volume(cell);
        }
        let (mut interior, mut boundary) = (0, 0);
        for is in &self.intersections {
            let face = if is.neighbor.is_some() {
                interior += 1;
                &mut self.interior_faces[interior - 1]
            } else {
                boundary += 1;
                &mut self.boundary_faces[boundary - 1]
            };
            face.normal = is.normal;
            face.area = is.area;
            face.integration_pos = is.center;
        }
        Ok(())
    }

    fn update_center_gradients(&mut self) -> Result<(), FvError> {
        Err(FvError::UnsupportedStencilOperation(
            "center gradients of an element-centred stencil",
        ))
    }

    fn num_dof(&self) -> usize {
        self.cells.len()
    }

    fn num_primary_dof(&self) -> usize {
        1
    }

    fn num_interior_faces(&self) -> usize {
        self.interior_faces.len()
    }

    fn num_boundary_faces(&self) -> usize {
        self.boundary_faces.len()
    }

    fn global_space_index(&self, dof_idx: usize) -> usize {
        self.cells[dof_idx]
    }

    fn sub_control_volume(&self, dof_idx: usize) -> &SubControlVolume {
        &self.scvs[dof_idx]
    }

    fn interior_face(&self, face_idx: usize) -> &SubControlVolumeFace {
        &self.interior_faces[face_idx]
    }

    fn boundary_face(&self, face_idx: usize) -> &SubControlVolumeFace {
        &self.boundary_faces[face_idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three unit cells in a row.
    struct Row3;

    impl CellGrid for Row3 {
        fn num_cells(&self) -> usize {
            3
        }
        fn cell_center(&self, cell: usize) -> Position {
            [cell as f64 + 0.5, 0.5, 0.5]
        }
        fn cell_volume(&self, _cell: usize) -> f64 {
            1.0
        }
        fn intersections(&self, cell: usize) -> Vec<Intersection> {
            let x = cell as f64;
            vec![
                Intersection {
                    neighbor: cell.checked_sub(1),
                    normal: [-1.0, 0.0, 0.0],
                    area: 1.0,
                    center: [x, 0.5, 0.5],
                },
                Intersection {
                    neighbor: (cell + 1 < 3).then_some(cell + 1),
                    normal: [1.0, 0.0, 0.0],
                    area: 1.0,
                    center: [x + 1.0, 0.5, 0.5],
                },
            ]
        }
    }

    #[test]
    fn middle_cell_has_two_neighbours() {
        let mut s = CellCenteredStencil::new(&Row3);
        s.update(&1).unwrap();
        assert_eq!(s.num_dof(), 3);
        assert_eq!(s.num_interior_faces(), 2);
        assert_eq!(s.num_boundary_faces(), 0);
        assert_eq!(s.global_space_index(1), 0);
        assert_eq!(s.global_space_index(2), 2);
        assert_eq!(s.interior_face(1).exterior_index, 2);
        assert_eq!(s.interior_face(1).normal, [1.0, 0.0, 0.0]);
        assert_eq!(s.sub_control_volume(0).global_pos, [1.5, 0.5, 0.5]);
    }

    #[test]
    fn end_cell_gets_boundary_face() {
        let mut s = CellCenteredStencil::new(Arc::new(Row3));
        s.update(&0).unwrap();
        assert_eq!(s.num_dof(), 2);
        assert_eq!(s.num_boundary_faces(), 1);
        let face = s.boundary_face(0);
        assert_eq!((face.interior_index, face.exterior_index), (0, 0));
        assert_eq!(face.integration_pos, [0.0, 0.5, 0.5]);
    }

    #[test]
    fn center_gradients_are_unsupported() {
        let mut s = CellCenteredStencil::new(&Row3);
        assert!(matches!(
            s.update_center_gradients(),
            Err(FvError::UnsupportedStencilOperation(_))
        ));
    }
}
