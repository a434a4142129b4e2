pub(crate) mod launcher;
pub(crate) mod orchestrator;
pub(crate) mod pipeline;
