pub mod batch;
pub mod bilateral;
pub mod channels;
pub mod clahe;
pub mod crop;
pub mod foreground;
pub mod pipeline;
pub mod region;
