pub use trestle_core::*;
