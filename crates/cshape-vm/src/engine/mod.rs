//! Typed value runtime.
//!
//! Values are typed regions of a [`MemoryProvider`]: allocated, read, written,
//! cast, compared and called according to a type table and the layout the
//! platform gives its types.

mod callback;
mod error;
mod marshal;
mod memory;
mod runtime;
mod value;


pub use callback::{Callback, NativeCaller};
pub use error::RuntimeError;
pub use memory::{Address, Heap, MemoryProvider};
pub(crate) use runtime::find_type;
pub use runtime::{Runtime, RuntimeBuilder, ValueKey};
pub use value::{CData, HostValue, NativeArg};
