use std::collections::HashMap;

use log::{debug, info, warn};

use crate::config::*;
use crate::resolve_codes_without_stop;

// Zeroed counts for the codes of one scheme, STOP excepted, in scheme order.
struct CodeCounter<'a> {
    positions: HashMap<&'a str, usize>,
    distribution: VariableDistribution,
}

impl<'a> CodeCounter<'a> {
    fn new(variable: &str, scheme: &'a CodeScheme) -> CodeCounter<'a> {
        let mut positions: HashMap<&'a str, usize> = HashMap::new();
        let mut counts: Vec<(String, u64)> = Vec::new();
        for code in scheme.codes_without_stop() {
            positions.insert(code.code_id.as_str(), counts.len());
            counts.push((code.string_value.clone(), 0));
        }
        CodeCounter {
            positions,
            distribution: VariableDistribution {
                variable: variable.to_string(),
                counts,
            },
        }
    }

    fn add(&mut self, codes: &[&Code]) {
        for code in codes {
            if let Some(idx) = self.positions.get(code.code_id.as_str()) {
                self.distribution.counts[*idx].1 += 1;
            }
        }
    }
}

fn count_individuals(
    individuals: &[&Record],
    configurations: &[(&CodingConfiguration, &str)],
    settings: &AnalysisSettings,
) -> Result<Vec<VariableDistribution>, AnalysisError> {
    let mut counters: Vec<CodeCounter> = configurations
        .iter()
        .map(|(cc, key)| CodeCounter::new(key, &cc.code_scheme))
        .collect();
    for ind in individuals.iter() {
        if ind.is_consent_withdrawn(&settings.consent_withdrawn_key) {
            continue;
        }
        for ((cc, _), counter) in configurations.iter().zip(counters.iter_mut()) {
            counter.add(&resolve_codes_without_stop(ind, cc)?);
        }
    }
    Ok(counters.into_iter().map(|c| c.distribution).collect())
}

/// Counts the opted-in individuals holding each code of every demographic
/// variable.
///
/// STOP codes are neither counted nor listed, so that a zero never reads as
/// "nobody opted out".
pub fn compute_demographic_distributions(
    individuals: &[&Record],
    demographic_plans: &[&CodingPlan],
    settings: &AnalysisSettings,
) -> Result<DemographicDistributions, AnalysisError> {
    let configurations: Vec<(&CodingConfiguration, &str)> = demographic_plans
        .iter()
        .flat_map(|p| p.analysis_configurations())
        .collect();
    let variables = count_individuals(individuals, &configurations, settings)?;
    info!("Computed the distributions of {} demographic variables", variables.len());
    Ok(DemographicDistributions { variables })
}

/// Counts the opted-in individuals holding each code of the analysed
/// variables of `plans` that are not demographics already.
pub fn compute_season_distributions(
    individuals: &[&Record],
    plans: &[&CodingPlan],
    demographics: &DemographicDistributions,
    settings: &AnalysisSettings,
) -> Result<Vec<VariableDistribution>, AnalysisError> {
    let configurations: Vec<(&CodingConfiguration, &str)> = plans
        .iter()
        .flat_map(|p| p.analysis_configurations())
        .filter(|(_, key)| demographics.get(key).is_none())
        .collect();
    for (cc, key) in configurations.iter() {
        debug!(
            "compute_season_distributions: {} ({} coding)",
            key, cc.coding_mode
        );
    }
    count_individuals(individuals, &configurations, settings)
}

/// The distributions that are small enough to be charted. The others are
/// still exported as tables.
pub fn chartable<'a>(
    distributions: &[&'a VariableDistribution],
    ceiling: usize,
) -> Vec<&'a VariableDistribution> {
    let mut res: Vec<&'a VariableDistribution> = Vec::new();
    for d in distributions.iter() {
        if d.counts.len() > ceiling {
            warn!(
                "Skipping the chart of {}: it has {} codes, the limit is {}",
                d.variable,
                d.counts.len(),
                ceiling
            );
        } else {
            res.push(*d);
        }
    }
    res
}
