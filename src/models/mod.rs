//! Domain model module declarations.

pub mod inspection;
pub mod invoice;
pub mod part;
pub mod task;
