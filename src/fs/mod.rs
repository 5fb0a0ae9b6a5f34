pub mod backend;
pub mod local;
pub mod path_utils;
pub mod remote;
pub mod types;

pub use backend::{BackendType, RemoteStore};
pub use local::LocalFs;
pub use remote::OpendalStore;
pub use types::*;
