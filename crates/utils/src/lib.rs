pub mod assets;
pub mod ids;
pub mod response;
