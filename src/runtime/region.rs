//! Named containers, their per-partition split, and the shared pull buffer.
//!
//! A [`LogicalArray`] is allocated for the whole problem before any partition
//! exists. Splitting it hands each partition an owned [`PhysicalArray`], so
//! exclusive read/write access is enforced by ownership rather than by
//! convention. The only storage shared across partitions is the
//! [`PullBuffer`], which neighbors can read through a [`PullCapability`].

use std::ops::{Deref, DerefMut, Range};
use std::sync::Arc;

use log::trace;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::Access;
use crate::error::DistError;

enum RegionState<T> {
    Allocated(Vec<T>),
    Partitioned(Vec<Option<Vec<T>>>),
}

/// A named container sized for the global problem.
pub struct LogicalArray<T> {
    name: &'static str,
    len: usize,
    access: Access,
    state: RegionState<T>,
}

impl<T: Clone> LogicalArray<T> {
    /// Allocate `len` elements, each initialised to `fill`.
    pub fn allocate(name: &'static str, len: usize, fill: T, access: Access) -> Self {
        trace!("allocate `{name}`: {len} elements");
        Self { name, len, access, state: RegionState::Allocated(vec![fill; len]) }
    }
}

impl<T> LogicalArray<T> {
    pub fn name(&self) -> &'static str { self.name }
    pub fn len(&self) -> usize { self.len }
    pub fn is_empty(&self) -> bool { self.len == 0 }
    pub fn access(&self) -> Access { self.access }

    /// Bytes of storage the container was declared with.
    pub fn bytes(&self) -> usize { self.len * std::mem::size_of::<T>() }

    pub fn is_partitioned(&self) -> bool {
        matches!(self.state, RegionState::Partitioned(_))
    }

    /// Number of parts, once split.
    pub fn n_parts(&self) -> Option<usize> {
        match &self.state {
            RegionState::Partitioned(parts) => Some(parts.len()),
            RegionState::Allocated(_) => None,
        }
    }

    /// Split into `n_parts` disjoint, equally sized, contiguous ranges.
    pub fn partition(&mut self, n_parts: usize) -> Result<(), DistError> {
        if n_parts == 0 || self.len % n_parts != 0 {
            return Err(DistError::UnevenSplit { name: self.name, len: self.len, parts: n_parts });
        }
        let data = match std::mem::replace(&mut self.state, RegionState::Partitioned(Vec::new())) {
            RegionState::Allocated(data) => data,
            partitioned @ RegionState::Partitioned(_) => {
                self.state = partitioned;
                return Err(DistError::AlreadyBound(self.name));
            }
        };
        let chunk = self.len / n_parts;
        let mut parts = Vec::with_capacity(n_parts);
        let mut rest = data;
        for _ in 0..n_parts {
            let tail = rest.split_off(chunk);
            parts.push(Some(rest));
            rest = tail;
        }
        self.state = RegionState::Partitioned(parts);
        Ok(())
    }

    /// Index range of part `part` within the original container.
    pub fn part_range(&self, part: usize) -> Option<Range<usize>> {
        let n = self.n_parts()?;
        let chunk = self.len / n;
        (part < n).then(|| part * chunk..(part + 1) * chunk)
    }

    /// Mutable access to a part that has not been handed out yet.
    pub fn part_mut(&mut self, part: usize) -> Option<&mut Vec<T>> {
        match &mut self.state {
            RegionState::Partitioned(parts) => parts.get_mut(part)?.as_mut(),
            RegionState::Allocated(_) => None,
        }
    }

    /// Hand part `part` to its partition. Each part can be taken once.
    pub fn take(&mut self, part: usize) -> Result<PhysicalArray<T>, DistError> {
        let name = self.name;
        let access = self.access;
        let parts = match &mut self.state {
            RegionState::Partitioned(parts) => parts,
            RegionState::Allocated(_) => return Err(DistError::NotBound("unpacking a partition")),
        };
        match parts.get_mut(part).and_then(Option::take) {
            Some(data) if !data.is_empty() => Ok(PhysicalArray { name, part, access, data }),
            _ => Err(DistError::MissingContainer(name)),
        }
    }
}

/// One partition's exclusively owned slice of a [`LogicalArray`].
#[derive(Debug, Clone)]
pub struct PhysicalArray<T> {
    name: &'static str,
    part: usize,
    access: Access,
    data: Vec<T>,
}

impl<T> PhysicalArray<T> {
    pub fn name(&self) -> &'static str { self.name }
    pub fn part(&self) -> usize { self.part }
    pub fn access(&self) -> Access { self.access }

    /// The single element of a one-per-partition container.
    pub fn item(&self) -> &T {
        debug_assert_eq!(self.data.len(), 1, "`{}` is not a single item", self.name);
        &self.data[0]
    }

    pub fn item_mut(&mut self) -> &mut T {
        debug_assert_eq!(self.data.len(), 1, "`{}` is not a single item", self.name);
        &mut self.data[0]
    }

    pub fn into_inner(self) -> Vec<T> { self.data }
}

impl<T> Deref for PhysicalArray<T> {
    type Target = Vec<T>;
    fn deref(&self) -> &Vec<T> { &self.data }
}

impl<T> DerefMut for PhysicalArray<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        debug_assert!(self.access.contains(Access::WRITE), "`{}` is not writable", self.name);
        &mut self.data
    }
}

/// The one piece of storage a partition exposes to its neighbors.
///
/// The owner writes it between generations; neighbors only ever see it
/// through a read-only [`PullCapability`].
#[derive(Debug)]
pub struct PullBuffer {
    part: usize,
    data: Arc<RwLock<Vec<f64>>>,
}

impl PullBuffer {
    pub fn new(part: usize, data: Vec<f64>) -> Self {
        Self { part, data: Arc::new(RwLock::new(data)) }
    }

    pub fn part(&self) -> usize { self.part }

    pub fn len(&self) -> usize { self.data.read().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Owner-side write window.
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<f64>> {
        self.data.write()
    }

    /// Grant read-only access to `range` of this buffer.
    pub fn grant(&self, range: Range<usize>) -> PullCapability {
        PullCapability { owner: self.part, range, data: Arc::clone(&self.data) }
    }
}

/// Read-only, shared access to a contiguous range of a neighbor's pull buffer.
#[derive(Debug, Clone)]
pub struct PullCapability {
    owner: usize,
    range: Range<usize>,
    data: Arc<RwLock<Vec<f64>>>,
}

impl PullCapability {
    pub fn owner(&self) -> usize { self.owner }
    pub fn range(&self) -> Range<usize> { self.range.clone() }
    pub fn access(&self) -> Access { Access::RO_S }

    /// Map the granted range for reading; dropping the guard unmaps it.
    pub fn acquire(&self) -> MappedRwLockReadGuard<'_, [f64]> {
        let range = self.range.clone();
        RwLockReadGuard::map(self.data.read(), move |v| &v[range])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_disjoint_and_ordered() {
        let mut arr = LogicalArray::allocate("vals", 6, 0usize, Access::RW_E);
        arr.partition(3).unwrap();
        for p in 0..3 {
            let r = arr.part_range(p).unwrap();
            for (k, v) in arr.part_mut(p).unwrap().iter_mut().enumerate() {
                *v = r.start + k;
            }
        }
        let p1 = arr.take(1).unwrap();
        assert_eq!(p1.as_slice(), &[2, 3]);
        assert_eq!(arr.take(1).unwrap_err(), DistError::MissingContainer("vals"));
    }

    #[test]
    fn uneven_split_and_rebind_fail() {
        let mut arr = LogicalArray::allocate("vals", 5, 0u8, Access::RW_E);
        assert!(matches!(arr.partition(2), Err(DistError::UnevenSplit { .. })));
        arr.partition(5).unwrap();
        assert_eq!(arr.partition(5), Err(DistError::AlreadyBound("vals")));
    }

    #[test]
    fn capability_reads_granted_range_only() {
        let buf = PullBuffer::new(0, vec![0.0; 4]);
        buf.write().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let cap = buf.grant(1..3);
        assert_eq!(&*cap.acquire(), &[2.0, 3.0]);
        assert_eq!(cap.access(), Access::RO_S);
    }
}
