pub mod capture;
pub mod controller;
pub mod voice;
