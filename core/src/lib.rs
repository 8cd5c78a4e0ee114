pub mod client;
pub mod curve;
pub mod geometry;
pub mod mesh;
pub mod protocol;
pub mod state;
pub mod trace;

pub fn version() -> &'static str {
    "0.1.0"
}
