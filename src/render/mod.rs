pub mod line;
pub mod projection;
pub mod surface;
pub mod terrain;
