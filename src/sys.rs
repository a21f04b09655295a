pub mod animation;
pub mod geometry;
pub mod pointer;
pub mod surface;
pub mod timer;
