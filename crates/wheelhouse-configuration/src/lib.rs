pub use binary_options::*;
pub use name_specifiers::*;
pub use selection_policy::*;
pub use target_overrides::*;

mod binary_options;
mod name_specifiers;
mod selection_policy;
mod target_overrides;
