//! Reserve / commit / decommit / free / protect large address ranges.
//!
//! This is the only module in the crate that talks to the OS directly; every
//! other module works in terms of [`Arena`](crate::Arena) and never touches
//! a raw pointer returned from here except through it.
//!
//! Grounded on `examples/original_source/lib/core/LinuxVm.cpp` and
//! `Win32Vm.cpp` (the `PagePermissionFlags`/`vm_protect` split that
//! `PagePermission`/`protect` follow here), plus the `vm_allocate`/
//! `vm_commit`/`vm_free` declarations in
//! `examples/original_source/include/ren/core/Vm.hpp`.

use std::ptr::NonNull;

/// Page protection requested for a committed range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PagePermission {
    /// No access; used for the guard pages around job stacks.
    None,
    ReadWrite,
}

/// Returns the OS page size, queried once and cached.
pub fn page_size() -> usize {
    static PAGE_SIZE: std::sync::OnceLock<usize> = std::sync::OnceLock::new();
    *PAGE_SIZE.get_or_init(query_page_size)
}

/// Rounds `size` up to the next multiple of the page size.
pub fn round_up_to_page(size: usize) -> usize {
    let page = page_size();
    (size + page - 1) & !(page - 1)
}

#[cfg(unix)]
mod sys {
    use super::PagePermission;

    pub fn query_page_size() -> usize {
        unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
    }

    /// Reserves `size` bytes of address space with no physical backing.
    pub fn reserve(size: usize) -> Option<*mut u8> {
        unsafe {
            let ptr = libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            );
            if ptr == libc::MAP_FAILED {
                None
            } else {
                Some(ptr as *mut u8)
            }
        }
    }

    pub fn commit(ptr: *mut u8, size: usize) -> bool {
        unsafe { libc::mprotect(ptr as *mut _, size, libc::PROT_READ | libc::PROT_WRITE) == 0 }
    }

    pub fn decommit(ptr: *mut u8, size: usize) -> bool {
        unsafe {
            // MADV_DONTNEED releases the physical pages back to the OS while
            // keeping the mapping reserved.
            libc::madvise(ptr as *mut _, size, libc::MADV_DONTNEED);
            libc::mprotect(ptr as *mut _, size, libc::PROT_NONE) == 0
        }
    }

    pub fn protect(ptr: *mut u8, size: usize, perm: PagePermission) -> bool {
        let prot = match perm {
            PagePermission::None => libc::PROT_NONE,
            PagePermission::ReadWrite => libc::PROT_READ | libc::PROT_WRITE,
        };
        unsafe { libc::mprotect(ptr as *mut _, size, prot) == 0 }
    }

    pub fn free(ptr: *mut u8, size: usize) {
        unsafe {
            libc::munmap(ptr as *mut _, size);
        }
    }
}

#[cfg(windows)]
mod sys {
    use super::PagePermission;
    use windows_sys::Win32::System::Memory::{
        VirtualAlloc, VirtualFree, VirtualProtect, MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE,
        MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE,
    };
    use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

    pub fn query_page_size() -> usize {
        unsafe {
            let mut info: SYSTEM_INFO = std::mem::zeroed();
            GetSystemInfo(&mut info);
            info.dwPageSize as usize
        }
    }

    pub fn reserve(size: usize) -> Option<*mut u8> {
        unsafe {
            let ptr = VirtualAlloc(std::ptr::null(), size, MEM_RESERVE, PAGE_NOACCESS);
            if ptr.is_null() {
                None
            } else {
                Some(ptr as *mut u8)
            }
        }
    }

    pub fn commit(ptr: *mut u8, size: usize) -> bool {
        unsafe { !VirtualAlloc(ptr as *const _, size, MEM_COMMIT, PAGE_READWRITE).is_null() }
    }

    pub fn decommit(ptr: *mut u8, size: usize) -> bool {
        unsafe { VirtualFree(ptr as *mut _, size, MEM_DECOMMIT) != 0 }
    }

    pub fn protect(ptr: *mut u8, size: usize, perm: PagePermission) -> bool {
        let new_prot = match perm {
            PagePermission::None => PAGE_NOACCESS,
            PagePermission::ReadWrite => PAGE_READWRITE,
        };
        let mut old_prot = 0u32;
        unsafe { VirtualProtect(ptr as *const _, size, new_prot, &mut old_prot) != 0 }
    }

    pub fn free(ptr: *mut u8, size: usize) {
        let _ = size;
        unsafe {
            VirtualFree(ptr as *mut _, 0, MEM_RELEASE);
        }
    }
}

use sys::query_page_size;

/// Reserves `size` bytes of address space without committing any of it.
///
/// Returns `None` on failure; callers (see [`Arena::with_max_size`]) are
/// expected to halve the request and retry rather than treat this as fatal.
pub fn reserve(size: usize) -> Option<NonNull<u8>> {
    sys::reserve(size).and_then(NonNull::new)
}

/// Commits `size` bytes starting at `ptr`, which must lie within a prior
/// [`reserve`] call. `size` should be page-aligned; use [`round_up_to_page`].
pub fn commit(ptr: NonNull<u8>, size: usize) -> bool {
    sys::commit(ptr.as_ptr(), size)
}

/// Returns committed pages to the OS without releasing the reservation.
pub fn decommit(ptr: NonNull<u8>, size: usize) -> bool {
    sys::decommit(ptr.as_ptr(), size)
}

/// Changes the protection of a committed range, e.g. to lay down no-access
/// guard pages around a manually managed stack.
pub fn protect(ptr: NonNull<u8>, size: usize, perm: PagePermission) -> bool {
    sys::protect(ptr.as_ptr(), size, perm)
}

/// Releases an entire reservation obtained from [`reserve`].
pub fn free(ptr: NonNull<u8>, size: usize) {
    sys::free(ptr.as_ptr(), size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_commit_roundtrip() {
        let size = round_up_to_page(64 * 1024);
        let ptr = reserve(size).expect("reservation should succeed");
        assert!(commit(ptr, page_size()));
        unsafe {
            ptr.as_ptr().write(0xAB);
            assert_eq!(ptr.as_ptr().read(), 0xAB);
        }
        free(ptr, size);
    }

    #[test]
    fn page_size_is_power_of_two() {
        let size = page_size();
        assert!(size > 0 && size & (size - 1) == 0);
    }
}
