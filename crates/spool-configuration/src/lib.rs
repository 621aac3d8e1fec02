pub use package_options::*;
pub use settings::*;

mod package_options;
mod settings;
