pub mod record;
pub mod viewer;
