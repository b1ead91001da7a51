//! Instrumentation for the software library.
//!
//! The probe watches how callers enter the library: it notices when two
//! global-state calls overlap (which the global lock must prevent) and how
//! many blits run at the same time (which the global lock must not
//! prevent). Optional delays widen the windows so that races show up.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Counters and delay knobs shared by every call into a
/// [`SoftwareLibrary`](super::SoftwareLibrary).
#[derive(Debug, Default)]
pub struct Probe {
    global_in_flight: AtomicUsize,
    global_calls: AtomicUsize,
    global_overlaps: AtomicUsize,
    blits_in_flight: AtomicUsize,
    blits: AtomicUsize,
    max_concurrent_blits: AtomicUsize,
    display_blits: AtomicUsize,
    surfaces_freed: AtomicUsize,
    invalid_releases: AtomicUsize,
    blit_delay_us: AtomicU64,
    global_delay_us: AtomicU64,
}

/// Point-in-time copy of the probe counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbeStats {
    /// Calls that touched library-global state.
    pub global_calls: usize,
    /// Global-state calls that started while another was still running.
    pub global_overlaps: usize,
    /// Blits of any kind.
    pub blits: usize,
    /// Highest number of blits observed running at once.
    pub max_concurrent_blits: usize,
    /// Blits that read or wrote the display surface.
    pub display_blits: usize,
    /// Surfaces released by `free_surface`.
    pub surfaces_freed: usize,
    /// Frees/closes of pointers the library never handed out (or already
    /// released).
    pub invalid_releases: usize,
}

/// Marks a global-state call in progress.
pub(crate) struct GlobalSection<'a> {
    probe: &'a Probe,
}

impl Drop for GlobalSection<'_> {
    fn drop(&mut self) {
        self.probe.global_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Marks a blit in progress; display blits also hold a [`GlobalSection`].
pub(crate) struct BlitSection<'a> {
    probe: &'a Probe,
    _global: Option<GlobalSection<'a>>,
}

impl Drop for BlitSection<'_> {
    fn drop(&mut self) {
        self.probe.blits_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn pause(micros: u64) {
    if micros > 0 {
        thread::sleep(Duration::from_micros(micros));
    }
}

impl Probe {
    /// Delay applied inside every blit.
    pub fn set_blit_delay(&self, delay: Duration) {
        self.blit_delay_us
            .store(delay.as_micros() as u64, Ordering::SeqCst);
    }

    /// Delay applied inside every global-state call.
    pub fn set_global_delay(&self, delay: Duration) {
        self.global_delay_us
            .store(delay.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn stats(&self) -> ProbeStats {
        ProbeStats {
            global_calls: self.global_calls.load(Ordering::SeqCst),
            global_overlaps: self.global_overlaps.load(Ordering::SeqCst),
            blits: self.blits.load(Ordering::SeqCst),
            max_concurrent_blits: self.max_concurrent_blits.load(Ordering::SeqCst),
            display_blits: self.display_blits.load(Ordering::SeqCst),
            surfaces_freed: self.surfaces_freed.load(Ordering::SeqCst),
            invalid_releases: self.invalid_releases.load(Ordering::SeqCst),
        }
    }

    /// Zero every counter. Delays are kept.
    pub fn reset(&self) {
        for counter in [
            &self.global_calls,
            &self.global_overlaps,
            &self.blits,
            &self.max_concurrent_blits,
            &self.display_blits,
            &self.surfaces_freed,
            &self.invalid_releases,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    pub(crate) fn enter_global(&self) -> GlobalSection<'_> {
        self.global_calls.fetch_add(1, Ordering::SeqCst);
        if self.global_in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.global_overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let section = GlobalSection { probe: self };
        pause(self.global_delay_us.load(Ordering::SeqCst));
        section
    }

    pub(crate) fn enter_blit(&self, touches_display: bool) -> BlitSection<'_> {
        let global = if touches_display {
            self.display_blits.fetch_add(1, Ordering::SeqCst);
            Some(self.enter_global())
        } else {
            None
        };
        self.blits.fetch_add(1, Ordering::SeqCst);
        let running = self.blits_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_blits.fetch_max(running, Ordering::SeqCst);
        let section = BlitSection {
            probe: self,
            _global: global,
        };
        pause(self.blit_delay_us.load(Ordering::SeqCst));
        section
    }

    pub(crate) fn surface_freed(&self) {
        self.surfaces_freed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn invalid_release(&self) {
        self.invalid_releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_global_sections_count_as_overlap() {
        let probe = Probe::default();
        let outer = probe.enter_global();
        let inner = probe.enter_global();
        drop(inner);
        drop(outer);
        let stats = probe.stats();
        assert_eq!(stats.global_calls, 2);
        assert_eq!(stats.global_overlaps, 1);
    }

    #[test]
    fn test_blit_sections_track_concurrency() {
        let probe = Probe::default();
        {
            let _a = probe.enter_blit(false);
            let _b = probe.enter_blit(true);
        }
        let stats = probe.stats();
        assert_eq!(stats.blits, 2);
        assert_eq!(stats.max_concurrent_blits, 2);
        assert_eq!(stats.display_blits, 1);
        assert_eq!(stats.global_calls, 1);

        probe.reset();
        assert_eq!(probe.stats(), ProbeStats::default());
    }
}
