pub mod hitl;
pub mod pipeline;
pub mod sessions;
pub mod stream;
