/// Pure fairness step function: maps wait duration to a non-negative
/// integer boost with thresholds `{20, 60, 120, 300}` seconds →
/// `{0, 5, 10, 15, 20}`, hard-capped at `cap` (`Fmax`, default 20).
///
/// Shaped the same way a wait-duration-to-phase step function would be
/// elsewhere in this matching stack, but applied to a discrete priority
/// boost rather than phase-based filter relaxation — different mechanisms
/// serving the same "wait longer, get helped sooner" idea.
pub fn fairness_for_wait(wait_seconds: i64, cap: u32) -> u32 {
    let raw = match wait_seconds {
        w if w < 20 => 0,
        w if w < 60 => 5,
        w if w < 120 => 10,
        w if w < 300 => 15,
        _ => 20,
    };
    raw.min(cap)
}
