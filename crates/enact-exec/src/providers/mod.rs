mod container;
mod local;
mod process;
mod remote;

pub use container::ContainerProvider;
pub use local::LocalProvider;
pub use remote::RemoteProvider;
