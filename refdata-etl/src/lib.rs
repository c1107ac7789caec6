pub mod extract;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod report;
