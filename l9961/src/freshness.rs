//! Measurement freshness tracking.
//!
//! The device signals the end of every conversion cycle on its RDY line.
//! The edge handler records the time of the edge; afterwards the measurement registers
//! stay stable for the validity window of the conversion configuration.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Instant with µs resolution.
pub type Instant = fugit::TimerInstantU32<1_000_000>;

/// Duration with µs resolution.
pub type Duration = fugit::TimerDurationU32<1_000_000>;

/// Elapsed times beyond this are edges recorded after the query time.
const EXPIRY_HORIZON: u32 = 1 << 31;

/// Monotonic time source.
pub trait Clock {
    /// Current time.
    fn now(&self) -> Instant;
}

/// Freshness window of the last conversion batch.
///
/// [`on_edge`](Self::on_edge) may be called from interrupt context.
/// It neither blocks nor locks, and it does not access the bus.
pub struct FreshnessTracker {
    last_edge: AtomicU32,
    edges: AtomicU32,
    seen: AtomicBool,
    window: Duration,
}

impl FreshnessTracker {
    /// Creates a tracker that has not yet seen an edge.
    pub const fn new(window: Duration) -> Self {
        Self { last_edge: AtomicU32::new(0), edges: AtomicU32::new(0), seen: AtomicBool::new(false), window }
    }

    /// Records a conversion complete edge.
    pub fn on_edge(&self, now: Instant) {
        self.last_edge.store(now.ticks(), Ordering::Relaxed);
        self.edges.fetch_add(1, Ordering::Release);
        self.seen.store(true, Ordering::Release);
    }

    /// Time of the last edge.
    pub fn last_edge(&self) -> Option<Instant> {
        if self.seen.load(Ordering::Acquire) {
            Some(Instant::from_ticks(self.last_edge.load(Ordering::Acquire)))
        } else {
            None
        }
    }

    /// Number of edges seen, wrapping.
    pub fn edges(&self) -> u32 {
        self.edges.load(Ordering::Acquire)
    }

    /// Validity window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether the last batch is still valid at `now`.
    ///
    /// False before the first edge.
    /// An expired edge is forgotten, so that it cannot become valid again when the
    /// 32-bit timer wraps. This requires a query at least every 2^31 µs while no edges arrive.
    pub fn is_valid(&self, now: Instant) -> bool {
        let edges = self.edges();
        let Some(edge) = self.last_edge() else { return false };

        let elapsed = now.ticks().wrapping_sub(edge.ticks());
        if elapsed < self.window.ticks() {
            return true;
        }

        // A query racing with the edge handler may see an edge after `now`.
        if elapsed < EXPIRY_HORIZON && self.edges() == edges {
            self.seen.store(false, Ordering::Release);
            // An edge that landed between the check and the store must stay visible.
            if self.edges() != edges {
                self.seen.store(true, Ordering::Release);
            }
        }
        false
    }
}

impl core::fmt::Debug for FreshnessTracker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FreshnessTracker")
            .field("last_edge", &self.last_edge().map(|i| i.ticks()))
            .field("window_us", &self.window.ticks())
            .finish()
    }
}
