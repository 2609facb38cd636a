use crate::planner::SectionPlan;

/// Repairs proposed section lengths so they sum exactly to `total` with
/// every length at least 1 second, then reindexes 1..N. Total function:
/// any input list comes out valid.
///
/// The correction is last-biased: the final section absorbs the whole
/// difference first, and remaining overflow is pulled from the tail toward
/// the front, each section floored at 1 second. Early sections (hooks,
/// intros) keep their planned shape.
pub fn normalize_lengths(plans: &mut Vec<SectionPlan>, total: u32) {
    if plans.is_empty() {
        return;
    }

    let sum: u64 = plans.iter().map(|p| p.length_s as u64).sum();
    if sum == 0 {
        // Nothing usable came back; one full-length section.
        *plans = vec![SectionPlan::fallback(total)];
        return;
    }

    // Floor every proposed length before balancing.
    for p in plans.iter_mut() {
        p.length_s = p.length_s.max(1);
    }

    let sum: u64 = plans.iter().map(|p| p.length_s as u64).sum();
    let diff = total as i64 - sum as i64;
    if let Some(last) = plans.last_mut() {
        last.length_s = (last.length_s as i64 + diff).max(1) as u32;
    }

    // If the floor left us over target, walk the tail forward pulling the
    // overflow out of each section down to the 1-second floor.
    let mut i = plans.len();
    while i > 0 {
        let sum: u64 = plans.iter().map(|p| p.length_s as u64).sum();
        if sum <= total as u64 {
            break;
        }
        i -= 1;
        // Keep the arithmetic in u64: the residual overflow can exceed
        // u32::MAX when proposed lengths are absurdly large.
        let overflow = sum - total as u64;
        let take = overflow.min(plans[i].length_s.saturating_sub(1) as u64);
        plans[i].length_s -= take as u32;
    }

    for (i, p) in plans.iter_mut().enumerate() {
        p.index = (i + 1) as u32;
    }
}
