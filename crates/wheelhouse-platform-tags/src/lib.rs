pub use platform::{
    compatible_platforms, darwin_binary_formats, mac_platforms, manylinux_platforms,
};
pub use tags::{IncompatibleTag, Tag, TagCompatibility, TagPriority, TagSpec, Tags, TagsError};

mod platform;
mod tags;
