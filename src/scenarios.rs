use log::info;
use shrinkage_common::{RunReport, ScenarioConfig, ScenarioRecord, SimulationParams, BASELINE_NAME};

use crate::session::ResultCache;

/// The committed parameters as the baseline, followed by each configured variation.
pub fn build_scenarios(
    committed: &SimulationParams,
    configs: &[ScenarioConfig],
) -> Vec<(String, SimulationParams)> {
    let mut scenarios = Vec::with_capacity(configs.len() + 1);
    scenarios.push((BASELINE_NAME.to_string(), *committed));
    for config in configs {
        scenarios.push((config.name.clone(), config.apply(committed)));
    }
    scenarios
}

/// Evaluates every scenario through the cache and collects them into a report.
pub fn run_scenarios(cache: &mut ResultCache, scenarios: Vec<(String, SimulationParams)>) -> RunReport {
    let batch: Vec<SimulationParams> = scenarios.iter().map(|(_, params)| *params).collect();
    let results = cache.compute_all(&batch);
    info!("Evaluated {} scenario(s), {} distinct parameter set(s).", scenarios.len(), cache.len());

    RunReport {
        scenarios: scenarios
            .into_iter()
            .zip(results)
            .map(|((name, params), results)| ScenarioRecord { name, params, results })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrinkage_common::ScanDirection;

    #[test]
    fn test_baseline_comes_first() {
        let committed = SimulationParams::default();
        let configs = vec![
            ScenarioConfig { name: "no bml".into(), has_bml: Some(false), ..Default::default() },
            ScenarioConfig {
                name: "short scan".into(),
                scan_direction: Some(ScanDirection::ShortAxis),
                ..Default::default()
            },
        ];
        let scenarios = build_scenarios(&committed, &configs);
        let names: Vec<&str> = scenarios.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["baseline", "no bml", "short scan"]);
        assert_eq!(scenarios[0].1, committed);
        assert!(!scenarios[1].1.has_bml);
        assert_eq!(scenarios[2].1.scan_direction, ScanDirection::ShortAxis);
    }

    #[test]
    fn test_run_scenarios_pairs_names_with_results() {
        let committed = SimulationParams::default();
        let configs = vec![ScenarioConfig {
            name: "short scan".into(),
            scan_direction: Some(ScanDirection::ShortAxis),
            ..Default::default()
        }];
        let mut cache = ResultCache::new();
        let report = run_scenarios(&mut cache, build_scenarios(&committed, &configs));

        assert_eq!(report.scenarios.len(), 2);
        let baseline = &report.scenarios[0];
        let short = &report.scenarios[1];
        assert_eq!(baseline.results.shrinkage_height_ppm, 249);
        assert_eq!(short.name, "short scan");
        assert_eq!(short.results.shrinkage_width_ppm, 249);
        assert_eq!(short.results.shrinkage_height_ppm, 100);
    }
}
