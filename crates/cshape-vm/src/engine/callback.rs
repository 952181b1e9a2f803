//! Host callbacks and native call targets.
//!
//! A host closure registered as a callback is given a synthetic address in a
//! range the heap never hands out. Calling a function value first looks its
//! address up among the callbacks; anything else goes to the
//! [`NativeCaller`], if one is installed.
//!
//! A callback stays registered until it is released with
//! [`Runtime::release_callback`](super::Runtime::release_callback). Released
//! slots are handed out again, so a stale pointer may reach a newer callback.

use std::rc::Rc;

use cshape_table::{FunctionSig, TypeIndex};

use super::error::RuntimeError;
use super::memory::Address;
use super::value::{HostValue, NativeArg};

/// A host function callable through a C function pointer.
pub type Callback = Rc<dyn Fn(&[HostValue]) -> Result<HostValue, RuntimeError>>;

/// Performs calls to native code at an address.
pub trait NativeCaller {
    /// Arguments arrive encoded for their parameter types. The result is the
    /// encoded return value, empty for `void`.
    fn call(
        &self,
        address: Address,
        sig: &FunctionSig,
        args: &[NativeArg],
    ) -> Result<NativeArg, RuntimeError>;
}

pub(crate) struct CallbackRegistry {
    base: Address,
    entries: Vec<Option<(TypeIndex, Callback)>>,
    free: Vec<usize>,
}

impl CallbackRegistry {
    const STRIDE: u64 = 16;

    pub(crate) fn new(pointer_bits: u32) -> Self {
        let base = if pointer_bits <= 32 {
            0xF000_0000
        } else {
            0xF000_0000_0000
        };
        Self {
            base,
            entries: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Register `callback` for the function type `sig` and return its
    /// address.
    pub(crate) fn register(&mut self, sig: TypeIndex, callback: Callback) -> Address {
        let slot = match self.free.pop() {
            Some(slot) => {
                self.entries[slot] = Some((sig, callback));
                slot
            }
            None => {
                self.entries.push(Some((sig, callback)));
                self.entries.len() - 1
            }
        };
        let address = self.base + slot as u64 * Self::STRIDE;
        tracing::debug!(address, "callback registered");
        address
    }

    /// Drop the callback at `address`. Returns `false` if there is none.
    pub(crate) fn unregister(&mut self, address: Address) -> bool {
        let Some(slot) = self.slot(address) else {
            return false;
        };
        if self.entries[slot].take().is_none() {
            return false;
        }
        self.free.push(slot);
        tracing::debug!(address, "callback released");
        true
    }

    pub(crate) fn lookup(&self, address: Address) -> Option<(TypeIndex, Callback)> {
        let (sig, callback) = self.entries[self.slot(address)?].as_ref()?;
        Some((*sig, Rc::clone(callback)))
    }

    pub(crate) fn live(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    fn slot(&self, address: Address) -> Option<usize> {
        let offset = address.checked_sub(self.base)?;
        if offset % Self::STRIDE != 0 {
            return None;
        }
        let slot = usize::try_from(offset / Self::STRIDE).ok()?;
        (slot < self.entries.len()).then_some(slot)
    }
}
