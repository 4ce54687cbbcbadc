//! Local-to-remote tree transfer: the POSIX path policy, the
//! source/destination decision table and the recursive copy walk.

pub mod path;
pub mod plan;

mod copy;
