pub mod form;
pub mod job_ctx;
pub mod wizard;

pub use job_ctx::JobCtx;
pub use wizard::{ApplicationWizard, FailureReason, WizardOutcome};
