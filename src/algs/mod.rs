//! Message passing and wire formats.

pub mod communicator;
pub mod wire;

pub use communicator::{CommTag, Communicator, NoComm, RayonComm, VectorCommTags, Wait};
#[cfg(feature = "mpi-support")]
pub use communicator::MpiComm;
