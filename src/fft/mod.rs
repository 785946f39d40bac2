pub mod radix2;
pub mod real;

use lazy_static::lazy_static;
use num_complex::Complex32;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub use real::RealFft;

/// Base interface for all DFT plans.
pub trait DftPlan: Send + Sync {
    /// Forward transform of exactly `size()` points, in place.
    fn xform_inplace(&self, buffer: &mut [Complex32]);

    fn name(&self) -> String;
    fn size(&self) -> usize;
}

lazy_static! {
    static ref PLAN_CACHE: Mutex<HashMap<usize, Arc<dyn DftPlan>>> = Mutex::new(HashMap::new());
}

/// Returns a DFT plan for size `n`, building it on first use.
///
/// Only power-of-two lengths are supported.
pub fn find_dft(n: usize) -> Arc<dyn DftPlan> {
    // Cached plan lookup.
    {
        let cache = PLAN_CACHE.lock();
        if let Some(plan) = cache.get(&n) {
            return plan.clone();
        }
    }

    let plan: Arc<dyn DftPlan> = Arc::new(radix2::DftRadix2::new(n));
    log::debug!("Built DFT plan {}", plan.name());

    // Cache the plan. A concurrent builder may have won the race; keep theirs.
    let mut cache = PLAN_CACHE.lock();
    cache.entry(n).or_insert(plan).clone()
}
