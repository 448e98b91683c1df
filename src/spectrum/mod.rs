pub mod bands;
pub mod energy;
pub mod fft;
