use chrono::TimeDelta;

// ═══════════════════════════════════════════════════════════════
//  Random source
// ═══════════════════════════════════════════════════════════════

/// Uniform 64-bit randomness. Injected into `Jitter` so tests can pin it.
pub trait RandomSource: Send {
    fn next_u64(&mut self) -> u64;
}

/// xorshift64 PRNG.
pub struct Xorshift {
    state: u64,
}

impl Xorshift {
    /// `seed == 0` seeds from the current time.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos() as u64
                | 1 // ensure non-zero
        } else {
            seed
        };
        Self { state }
    }
}

impl RandomSource for Xorshift {
    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }
}

// ═══════════════════════════════════════════════════════════════
//  Jitter
// ═══════════════════════════════════════════════════════════════

/// Bounded symmetric timing perturbation.
///
/// Keeps repeated or concurrent playbacks from hitting the sink in lockstep.
pub struct Jitter {
    rng: Box<dyn RandomSource>,
}

impl Jitter {
    pub fn new(rng: impl RandomSource + 'static) -> Self {
        Self { rng: Box::new(rng) }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(Xorshift::new(seed))
    }

    /// Offset uniformly distributed over the open interval
    /// `(-max_ms, +max_ms)` milliseconds. `max_ms == 0` yields zero.
    pub fn sample(&mut self, max_ms: u64) -> TimeDelta {
        if max_ms == 0 {
            return TimeDelta::zero();
        }
        let span = max_ms.saturating_mul(1_000_000).min(i64::MAX as u64) as i64;
        let unit = open_unit(self.rng.next_u64()) * 2.0 - 1.0;
        // Rounding can land on the bound itself for large spans.
        let nanos = ((span as f64) * unit) as i64;
        TimeDelta::nanoseconds(nanos.clamp(-(span - 1), span - 1))
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::from_seed(0)
    }
}

/// Map 52 random bits onto the open interval (0, 1).
fn open_unit(bits: u64) -> f64 {
    ((bits >> 12) as f64 + 0.5) / ((1u64 << 52) as f64)
}

/// `base + offset`, saturating at zero.
pub fn jittered(base: std::time::Duration, offset: TimeDelta) -> std::time::Duration {
    match offset.to_std() {
        Ok(up) => base.saturating_add(up),
        Err(_) => base.saturating_sub((-offset).to_std().unwrap_or_default()),
    }
}
