//! Media retrieval: resolve a file reference, download the bytes, persist them
//! under the storage root.

mod pipeline;
mod store;
mod transport;

pub use pipeline::{MediaError, MediaPipeline};
pub use store::{MediaStore, PersistError};
pub use transport::{ByteStream, FetchError, FileTransport, ResolveError, ResolvedFile};
