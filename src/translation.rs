use std::fmt;

use crate::memory::FrameIndex;

/// A virtual address split into page number and in-page offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub va: u64,
    pub page: u64,
    pub offset: u64,
}

impl VirtualAddress {
    /// Decompose a raw VA for the given page size (must be non-zero)
    pub fn from_raw(va: u64, page_size: u32) -> Self {
        let page_size = u64::from(page_size);
        VirtualAddress {
            va,
            page: va / page_size,
            offset: va % page_size,
        }
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA {} (page {}, offset {})", self.va, self.page, self.offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysicalAddress(pub u64);

impl PhysicalAddress {
    /// Address of `offset` inside `frame`
    pub fn from_frame(frame: FrameIndex, page_size: u32, offset: u64) -> Self {
        PhysicalAddress(frame as u64 * u64::from(page_size) + offset)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub fn frame(self, page_size: u32) -> FrameIndex {
        (self.0 / u64::from(page_size)) as FrameIndex
    }

    pub fn offset(self, page_size: u32) -> u64 {
        self.0 % u64::from(page_size)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<PhysicalAddress> for u64 {
    fn from(pa: PhysicalAddress) -> Self {
        pa.0
    }
}

/// How a translation was served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Page was already resident
    Hit,
    /// Page had never been touched and was given a fresh frame
    FirstTouch,
    /// Page was loaded back from swap
    SwapIn,
}

impl AccessKind {
    pub fn is_fault(self) -> bool {
        !matches!(self, AccessKind::Hit)
    }
}

/// Result of a successful translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub virtual_address: VirtualAddress,
    pub physical: PhysicalAddress,
    pub frame: FrameIndex,
    pub kind: AccessKind,
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fault_info = match self.kind {
            AccessKind::Hit => "",
            AccessKind::FirstTouch => " [page fault]",
            AccessKind::SwapIn => " [page fault, swap in]",
        };
        write!(
            f,
            "{} -> PA {} (frame {}){}",
            self.virtual_address, self.physical, self.frame, fault_info
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_va_decomposition() {
        let va = VirtualAddress::from_raw(5, 4);
        assert_eq!(va.page, 1);
        assert_eq!(va.offset, 1);

        let va = VirtualAddress::from_raw(8191, 4096);
        assert_eq!(va.page, 1);
        assert_eq!(va.offset, 4095);
    }

    #[test]
    fn test_va_decomposition_edge_cases() {
        let va = VirtualAddress::from_raw(0, 4);
        assert_eq!(va.page, 0);
        assert_eq!(va.offset, 0);

        // Page boundary
        let va = VirtualAddress::from_raw(4096, 4096);
        assert_eq!(va.page, 1);
        assert_eq!(va.offset, 0);

        let va = VirtualAddress::from_raw(u64::MAX, 1);
        assert_eq!(va.page, u64::MAX);
        assert_eq!(va.offset, 0);
    }

    #[test]
    fn test_va_reconstruction() {
        for &(raw, page_size) in &[(0u64, 4u32), (5, 4), (100, 4), (12345, 4096), (4095, 4096)] {
            let va = VirtualAddress::from_raw(raw, page_size);
            assert_eq!(va.page * u64::from(page_size) + va.offset, raw, "failed for VA={}", raw);
        }
    }

    #[test]
    fn test_physical_address_from_frame() {
        let pa = PhysicalAddress::from_frame(3, 4, 1);
        assert_eq!(pa.as_u64(), 13);
        assert_eq!(pa.frame(4), 3);
        assert_eq!(pa.offset(4), 1);
        assert_eq!(u64::from(pa), 13);
    }

    #[test]
    fn test_display() {
        let t = Translation {
            virtual_address: VirtualAddress::from_raw(5, 4),
            physical: PhysicalAddress(13),
            frame: 3,
            kind: AccessKind::SwapIn,
        };
        let display = t.to_string();
        assert!(display.contains("VA 5"));
        assert!(display.contains("PA 13"));
        assert!(display.contains("frame 3"));
        assert!(display.contains("swap in"));
    }

    #[test]
    fn test_access_kind_is_fault() {
        assert!(!AccessKind::Hit.is_fault());
        assert!(AccessKind::FirstTouch.is_fault());
        assert!(AccessKind::SwapIn.is_fault());
    }
}
