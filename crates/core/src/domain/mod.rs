pub mod cluster;
pub mod embedding;
pub mod interaction;
pub mod ranking;
pub mod recommendation;
