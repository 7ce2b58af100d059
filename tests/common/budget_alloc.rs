use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Allocation figures for one measured closure.
#[derive(Clone, Copy, Debug)]
pub struct AllocStats {
    pub peak_bytes: usize,
    pub allocs: usize,
}

impl AllocStats {
    pub fn peak_kib(&self) -> f64 {
        self.peak_bytes as f64 / 1024.0
    }
}

/// Counting allocator; peak is tracked relative to the last [`BudgetAlloc::reset`].
pub struct BudgetAlloc {
    live: AtomicUsize,
    base: AtomicUsize,
    peak: AtomicUsize,
    count: AtomicUsize,
}

impl BudgetAlloc {
    pub const fn new() -> Self {
        Self {
            live: AtomicUsize::new(0),
            base: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
        }
    }

    pub fn reset(&self) {
        let live = self.live.load(Ordering::SeqCst);
        self.base.store(live, Ordering::SeqCst);
        self.peak.store(live, Ordering::SeqCst);
        self.count.store(0, Ordering::SeqCst);
    }

    /// Run `f` and report what it allocated on top of the live heap.
    pub fn measure<R>(&self, f: impl FnOnce() -> R) -> (R, AllocStats) {
        self.reset();
        let out = f();
        let stats = AllocStats {
            peak_bytes: self
                .peak
                .load(Ordering::SeqCst)
                .saturating_sub(self.base.load(Ordering::SeqCst)),
            allocs: self.count.load(Ordering::SeqCst),
        };
        (out, stats)
    }

    fn grow(&self, bytes: usize) {
        let live = self.live.fetch_add(bytes, Ordering::SeqCst) + bytes;
        self.peak.fetch_max(live, Ordering::SeqCst);
    }

    fn shrink(&self, bytes: usize) {
        let _ = self
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| {
                Some(live.saturating_sub(bytes))
            });
    }
}

unsafe impl GlobalAlloc for BudgetAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            self.grow(layout.size());
            self.count.fetch_add(1, Ordering::SeqCst);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        self.shrink(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            if new_size >= layout.size() {
                self.grow(new_size - layout.size());
            } else {
                self.shrink(layout.size() - new_size);
            }
            self.count.fetch_add(1, Ordering::SeqCst);
        }
        new_ptr
    }
}
