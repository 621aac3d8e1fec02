pub use direct_url::*;
pub use hash::*;
pub use installed::*;
pub use interpreter::*;
pub use link::*;
pub use metadata::*;
pub use snapshot::*;
pub use traits::*;

mod direct_url;
mod hash;
mod installed;
mod interpreter;
mod link;
mod metadata;
mod snapshot;
mod traits;
