pub mod encounter;
pub mod lifecycle;

pub use encounter::EncounterService;
pub use lifecycle::EncounterLifecycleService;
