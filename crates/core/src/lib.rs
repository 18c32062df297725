pub mod detection;
pub mod export;
pub mod pipeline;
pub mod shared;
pub mod video;
