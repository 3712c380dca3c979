//! MPI process groups.

use crate::error::{Error, Result};
use crate::ffi;
use std::marker::PhantomData;

/// An MPI group (`MPI_Group`), freed on drop.
///
/// Obtained from [`Communicator::group()`](crate::Communicator::group) and
/// narrowed with [`incl()`](Self::incl); used to build communicators with
/// [`Communicator::create()`](crate::Communicator::create).
pub struct Group {
    handle: i32,
    _marker: PhantomData<*mut ()>,
}

impl Group {
    pub(crate) fn from_handle(handle: i32) -> Self {
        Group {
            handle,
            _marker: PhantomData,
        }
    }

    /// Get the raw group handle (for advanced use).
    pub fn raw_handle(&self) -> i32 {
        self.handle
    }

    /// Build a new group from the listed ranks of this group (`MPI_Group_incl`).
    pub fn incl(&self, ranks: &[i32]) -> Result<Group> {
        let size = self.size()?;
        if let Some(&bad) = ranks.iter().find(|&&r| r < 0 || r >= size) {
            return Err(Error::InvalidRank(bad));
        }
        let mut new_handle: i32 = -1;
        let ret = unsafe {
            ffi::mpitrace_group_incl(
                self.handle,
                ranks.len() as i32,
                ranks.as_ptr(),
                &mut new_handle,
            )
        };
        Error::check(ret)?;
        Ok(Group::from_handle(new_handle))
    }

    /// Number of processes in the group.
    pub fn size(&self) -> Result<i32> {
        let mut size: i32 = 0;
        let ret = unsafe { ffi::mpitrace_group_size(self.handle, &mut size) };
        Error::check(ret)?;
        Ok(size)
    }

    /// Rank of the calling process in the group, or `None` if it is not a member.
    pub fn rank(&self) -> Result<Option<i32>> {
        let mut rank: i32 = -1;
        let ret = unsafe { ffi::mpitrace_group_rank(self.handle, &mut rank) };
        Error::check(ret)?;
        Ok((rank >= 0).then_some(rank))
    }
}

impl Drop for Group {
    fn drop(&mut self) {
        unsafe { ffi::mpitrace_group_free(self.handle) };
    }
}
