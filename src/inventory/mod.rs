//! Backup inventory: artifact model, directory scanner, size walk, tree layout.

pub mod artifact;
pub mod layout;
pub mod scanner;
pub mod size;
