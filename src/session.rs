use log::{debug, trace};
use rayon::prelude::*;
use shrinkage_common::{compute, ScanDirection, SimulationParams, SimulationResults};
use std::collections::HashMap;

/// Bitwise identity of a parameter set, usable as a hash key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ParamsKey {
    width: u64,
    height: u64,
    has_bml: bool,
    scan_direction: ScanDirection,
    exaggeration: u64,
    correction_factor: u64,
}

impl From<&SimulationParams> for ParamsKey {
    fn from(params: &SimulationParams) -> Self {
        ParamsKey {
            width: params.width.to_bits(),
            height: params.height.to_bits(),
            has_bml: params.has_bml,
            scan_direction: params.scan_direction,
            exaggeration: params.exaggeration.to_bits(),
            correction_factor: params.correction_factor.to_bits(),
        }
    }
}

/// Memoizes calculator results by input equality.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<ParamsKey, SimulationResults>,
    hits: u64,
    misses: u64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached results for `params`, computing them on first use.
    pub fn get_or_compute(&mut self, params: &SimulationParams) -> &SimulationResults {
        let key = ParamsKey::from(params);
        if self.entries.contains_key(&key) {
            self.hits += 1;
            trace!("Cache hit for {:?}", params);
        } else {
            self.misses += 1;
        }
        self.entries.entry(key).or_insert_with(|| compute(params))
    }

    /// Computes results for a batch of inputs. Inputs not yet cached are
    /// deduplicated and evaluated in parallel.
    pub fn compute_all(&mut self, batch: &[SimulationParams]) -> Vec<SimulationResults> {
        let mut missing: Vec<(ParamsKey, SimulationParams)> = Vec::new();
        for params in batch {
            let key = ParamsKey::from(params);
            if self.entries.contains_key(&key) || missing.iter().any(|(k, _)| *k == key) {
                self.hits += 1;
            } else {
                self.misses += 1;
                missing.push((key, *params));
            }
        }

        debug!("Computing {} of {} parameter sets ({} cached or duplicate).",
            missing.len(), batch.len(), batch.len() - missing.len());

        let computed: Vec<(ParamsKey, SimulationResults)> = missing
            .par_iter()
            .map(|(key, params)| (*key, compute(params)))
            .collect();
        self.entries.extend(computed);

        batch
            .iter()
            .map(|params| self.get_cached(params).clone())
            .collect()
    }

    fn get_cached(&self, params: &SimulationParams) -> &SimulationResults {
        // Every batch entry was inserted above
        &self.entries[&ParamsKey::from(params)]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// Editable parameters plus the committed copy the calculator runs on.
///
/// Edits never reach the calculator until `commit` replaces the committed
/// copy wholesale.
#[derive(Debug)]
pub struct ParamsSession {
    editing: SimulationParams,
    committed: SimulationParams,
    cache: ResultCache,
}

impl ParamsSession {
    pub fn new(initial: SimulationParams) -> Self {
        ParamsSession {
            editing: initial,
            committed: initial,
            cache: ResultCache::new(),
        }
    }

    pub fn editing(&self) -> &SimulationParams {
        &self.editing
    }

    pub fn committed(&self) -> &SimulationParams {
        &self.committed
    }

    /// True when the editing copy differs from the committed one.
    pub fn is_dirty(&self) -> bool {
        self.editing != self.committed
    }

    /// Changes the editing copy only.
    pub fn edit<F: FnOnce(&mut SimulationParams)>(&mut self, f: F) {
        f(&mut self.editing);
    }

    /// Restores the editing copy to the defaults. The committed copy is kept
    /// until the next commit.
    pub fn reset(&mut self) {
        self.editing = SimulationParams::default();
    }

    /// Makes the editing copy the calculator input. Returns whether it changed.
    pub fn commit(&mut self) -> bool {
        let changed = self.is_dirty();
        self.committed = self.editing;
        if changed {
            debug!("Committed parameters: {:?}", self.committed);
        }
        changed
    }

    /// Results for the committed parameters.
    pub fn run(&mut self) -> &SimulationResults {
        self.cache.get_or_compute(&self.committed)
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResultCache {
        &mut self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edits_do_not_reach_committed_until_commit() {
        let mut session = ParamsSession::new(SimulationParams::default());
        let before = session.run().clone();

        session.edit(|p| p.has_bml = false);
        assert!(session.is_dirty());
        assert!(session.committed().has_bml);
        assert_eq!(session.run(), &before);

        assert!(session.commit());
        assert!(!session.is_dirty());
        assert!(!session.committed().has_bml);
        assert_eq!(session.run().shrinkage_width_ppm, 200);
    }

    #[test]
    fn test_commit_without_changes() {
        let mut session = ParamsSession::new(SimulationParams::default());
        assert!(!session.commit());
    }

    #[test]
    fn test_reset_restores_defaults_in_editing_copy() {
        let mut session = ParamsSession::new(SimulationParams {
            correction_factor: 1.5,
            scan_direction: ScanDirection::ShortAxis,
            ..SimulationParams::default()
        });
        session.reset();
        assert_eq!(session.editing(), &SimulationParams::default());
        assert_eq!(session.committed().correction_factor, 1.5);
        session.commit();
        assert_eq!(session.committed(), &SimulationParams::default());
    }

    #[test]
    fn test_run_is_memoized() {
        let mut session = ParamsSession::new(SimulationParams::default());
        session.run();
        session.run();
        assert_eq!(session.cache().misses(), 1);
        assert_eq!(session.cache().hits(), 1);

        session.edit(|p| p.correction_factor = 2.0);
        session.commit();
        session.run();
        assert_eq!(session.cache().misses(), 2);
        assert_eq!(session.cache().len(), 2);
    }

    #[test]
    fn test_compute_all_dedupes_and_keeps_order() {
        let base = SimulationParams::default();
        let no_bml = SimulationParams { has_bml: false, ..base };
        let mut cache = ResultCache::new();
        let results = cache.compute_all(&[base, no_bml, base]);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], results[2]);
        assert_eq!(results[0].shrinkage_width_ppm, 100);
        assert_eq!(results[1].shrinkage_width_ppm, 200);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.hits(), 1);
    }
}
