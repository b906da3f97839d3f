pub mod check;
pub mod extract;
pub mod info;
pub mod render;
