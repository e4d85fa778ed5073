pub mod autofill;
pub mod field;
pub mod filters;
pub mod listing;

pub use autofill::{AutofillDocument, ChoiceOption, ChoiceRecord};
pub use field::{FieldDescriptor, FieldKind};
pub use filters::FilterConfig;
pub use listing::JobListing;
