pub mod buffer;
pub mod context;
pub mod device;
pub mod kernels;

pub use buffer::{BufferArena, BufferHandle, BufferRole};
pub use context::{AcceleratorContext, MappedView};
pub use device::{ComputeDevice, EntryPoint, KernelLaunch, Program, SoftwareDevice};
