pub use error::{Error, ErrorKind};
pub use file::{File, FileLocation, IndexEntry};
pub use flat_index::FlatIndex;
pub use html::{Error as HtmlError, HtmlFile, SimpleHtml};
pub use index::{FlatIndexLocation, IndexLocations, parse_index_url};
pub use registry_client::{Fetched, RegistryClient};

mod error;
mod file;
mod flat_index;
mod html;
mod index;
mod registry_client;
