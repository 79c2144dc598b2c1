//! The stencil contract: which dofs and faces belong to an element.

use crate::fv_error::FvError;
use std::fmt::Debug;

/// A point in physical space.
pub type Position = [f64; 3];

/// Geometry of the control volume around one dof.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SubControlVolume {
    pub global_pos: Position,
    pub volume: f64,
}

/// A face between two sub-control volumes, or between one and the domain
/// boundary.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SubControlVolumeFace {
    /// Local dof on the side the normal points away from.
    pub interior_index: usize,
    /// Local dof on the side the normal points to. Equals `interior_index`
    /// on boundary faces.
    pub exterior_index: usize,
    /// Unit outer normal.
    pub normal: Position,
    pub area: f64,
    pub integration_pos: Position,
}

/// Local view of one element of the discretisation.
pub trait Stencil: Send {
    type Element: Clone + Debug + Send + Sync;

    /// Bind to `element` and compute its full geometry.
    fn update(&mut self, element: &Self::Element) -> Result<(), FvError>;

    /// Bind to `element`, computing only the dof and face connectivity.
    fn update_topology(&mut self, element: &Self::Element) -> Result<(), FvError>;

    /// Gradients of the basis functions at the sub-control-volume centers.
    fn update_center_gradients(&mut self) -> Result<(), FvError>;

    /// Dofs of the element including its neighbours.
    fn num_dof(&self) -> usize;
    /// Dofs whose equations the element owns.
    fn num_primary_dof(&self) -> usize;
    fn num_interior_faces(&self) -> usize;
    fn num_boundary_faces(&self) -> usize;

    fn global_space_index(&self, dof_idx: usize) -> usize;
    fn sub_control_volume(&self, dof_idx: usize) -> &SubControlVolume;
    fn interior_face(&self, face_idx: usize) -> &SubControlVolumeFace;
    fn boundary_face(&self, face_idx: usize) -> &SubControlVolumeFace;
}
