//! Memory that typed values live in.
//!
//! The runtime never touches host memory directly. Every read and write goes
//! through a [`MemoryProvider`], so a table can be exercised against a
//! simulated heap, a foreign process image or real memory alike.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::error::RuntimeError;

/// An address in the memory a provider manages.
pub type Address = u64;

pub trait MemoryProvider {
    /// Reserve `size` zeroed bytes aligned to `align`.
    fn allocate(&mut self, size: u64, align: u64) -> Result<Address, RuntimeError>;

    /// Return an allocation made by [`MemoryProvider::allocate`].
    fn release(&mut self, address: Address) -> Result<(), RuntimeError>;

    fn read(&self, address: Address, out: &mut [u8]) -> Result<(), RuntimeError>;

    fn write(&mut self, address: Address, data: &[u8]) -> Result<(), RuntimeError>;

    /// Bytes from `address` up to, not including, the first NUL.
    fn read_c_string(&self, address: Address) -> Result<Vec<u8>, RuntimeError> {
        let mut out = Vec::new();
        let mut byte = [0u8];
        let mut at = address;
        loop {
            self.read(at, &mut byte)?;
            if byte[0] == 0 {
                return Ok(out);
            }
            out.push(byte[0]);
            at = at
                .checked_add(1)
                .ok_or(RuntimeError::InvalidAddress { address: at, len: 1 })?;
        }
    }
}

/// A simulated heap of separate blocks.
///
/// Blocks are handed out bump-style from [`Heap::BASE`] with a gap between
/// neighbours, so an access that runs off the end of one block never lands in
/// the next.
pub struct Heap {
    blocks: BTreeMap<Address, Vec<u8>>,
    next: Address,
    limit: Option<u64>,
    in_use: u64,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub const BASE: Address = 0x1_0000;
    const GAP: u64 = 16;

    pub fn new() -> Self {
        Self {
            blocks: BTreeMap::new(),
            next: Self::BASE,
            limit: None,
            in_use: 0,
        }
    }

    /// A heap that refuses to hold more than `limit` bytes at once.
    pub fn with_limit(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Bytes held by live blocks.
    pub fn in_use(&self) -> u64 {
        self.in_use
    }

    pub fn live_blocks(&self) -> usize {
        self.blocks.len()
    }

    fn locate(&self, address: Address, len: usize) -> Result<(Address, usize), RuntimeError> {
        let invalid = RuntimeError::InvalidAddress {
            address,
            len: len as u64,
        };
        let Some((&start, block)) = self.blocks.range(..=address).next_back() else {
            return Err(invalid);
        };
        let offset = (address - start) as usize;
        match offset.checked_add(len) {
            Some(end) if end <= block.len() => Ok((start, offset)),
            _ => Err(invalid),
        }
    }
}

impl MemoryProvider for Heap {
    fn allocate(&mut self, size: u64, align: u64) -> Result<Address, RuntimeError> {
        let reserved = size.max(1);
        if self
            .limit
            .is_some_and(|limit| self.in_use.saturating_add(reserved) > limit)
        {
            return Err(RuntimeError::OutOfMemory(size));
        }
        let out_of_memory = || RuntimeError::OutOfMemory(size);
        let len = usize::try_from(reserved).map_err(|_| out_of_memory())?;
        let align = align.max(1);
        let address = self
            .next
            .div_ceil(align)
            .checked_mul(align)
            .ok_or_else(out_of_memory)?;
        let next = reserved
            .checked_add(Self::GAP)
            .and_then(|span| address.checked_add(span))
            .ok_or_else(out_of_memory)?;

        let mut block = Vec::new();
        block.try_reserve_exact(len).map_err(|_| out_of_memory())?;
        block.resize(len, 0);

        self.next = next;
        self.blocks.insert(address, block);
        self.in_use += reserved;
        tracing::trace!(address, size, "heap block allocated");
        Ok(address)
    }

    fn release(&mut self, address: Address) -> Result<(), RuntimeError> {
        let block = self
            .blocks
            .remove(&address)
            .ok_or(RuntimeError::InvalidAddress { address, len: 0 })?;
        self.in_use = self.in_use.saturating_sub(block.len() as u64);
        Ok(())
    }

    fn read(&self, address: Address, out: &mut [u8]) -> Result<(), RuntimeError> {
        if out.is_empty() {
            return Ok(());
        }
        let (start, offset) = self.locate(address, out.len())?;
        let block = &self.blocks[&start];
        out.copy_from_slice(&block[offset..offset + out.len()]);
        Ok(())
    }

    fn write(&mut self, address: Address, data: &[u8]) -> Result<(), RuntimeError> {
        if data.is_empty() {
            return Ok(());
        }
        let (start, offset) = self.locate(address, data.len())?;
        if let Some(block) = self.blocks.get_mut(&start) {
            block[offset..offset + data.len()].copy_from_slice(data);
        }
        Ok(())
    }
}

pub(crate) type SharedMemory = Rc<RefCell<Box<dyn MemoryProvider>>>;

/// One live allocation, released when the last handle to it drops.
pub(crate) struct Resource {
    memory: SharedMemory,
    address: Address,
    size: u64,
    /// Allocations that pointers stored in this one point into.
    keep: RefCell<Vec<Rc<Resource>>>,
}

impl Resource {
    pub(crate) fn new(memory: SharedMemory, address: Address, size: u64) -> Self {
        Self {
            memory,
            address,
            size,
            keep: RefCell::new(Vec::new()),
        }
    }

    /// Keep `other` alive for as long as this allocation lives.
    pub(crate) fn keep_alive(self: &Rc<Self>, other: &Rc<Resource>) {
        if Rc::ptr_eq(self, other) {
            return;
        }
        let mut keep = self.keep.borrow_mut();
        if !keep.iter().any(|k| Rc::ptr_eq(k, other)) {
            keep.push(Rc::clone(other));
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("address", &format_args!("{:#x}", self.address))
            .field("size", &self.size)
            .finish()
    }
}

impl Drop for Resource {
    fn drop(&mut self) {
        let Ok(mut memory) = self.memory.try_borrow_mut() else {
            tracing::warn!(address = self.address, "memory busy, allocation leaked");
            return;
        };
        match memory.release(self.address) {
            Ok(()) => tracing::trace!(
                address = self.address,
                size = self.size,
                "allocation released"
            ),
            Err(e) => tracing::warn!(error = %e, "failed to release allocation"),
        }
    }
}
