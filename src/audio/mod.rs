pub mod capture;
pub mod clock;
pub mod decode;
pub mod ring;
