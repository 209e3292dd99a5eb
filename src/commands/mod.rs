pub mod align;
pub mod convert;
pub mod create;
