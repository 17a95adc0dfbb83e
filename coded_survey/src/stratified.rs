use log::{debug, warn};

use crate::config::*;
use crate::themes::{ThemeCrossTab, TOTAL_RELEVANT_PARTICIPANTS};

fn stratifying_configuration<'a>(
    demographic_plans: &[&'a CodingPlan],
    settings: &AnalysisSettings,
) -> Result<&'a CodingConfiguration, AnalysisError> {
    demographic_plans
        .iter()
        .copied()
        .flat_map(|p| p.analysis_configurations())
        .find(|(_, key)| *key == settings.stratify_by)
        .map(|(cc, _)| cc)
        .ok_or_else(|| AnalysisError::MissingStratifyingVariable {
            variable: settings.stratify_by.clone(),
        })
}

/// The distribution of the stratifying variable, restricted to its normal codes.
pub fn stratifying_distribution(
    demographics: &DemographicDistributions,
    demographic_plans: &[&CodingPlan],
    settings: &AnalysisSettings,
) -> Result<VariableDistribution, AnalysisError> {
    let missing = || AnalysisError::MissingStratifyingVariable {
        variable: settings.stratify_by.clone(),
    };
    let cc = stratifying_configuration(demographic_plans, settings)?;
    let dist = demographics.get(&settings.stratify_by).ok_or_else(missing)?;
    let mut counts: Vec<(String, u64)> = Vec::new();
    for code in cc.code_scheme.codes().iter().filter(|c| c.is_normal()) {
        let count = dist.count_for(&code.string_value).ok_or_else(missing)?;
        counts.push((code.string_value.clone(), count));
    }
    Ok(VariableDistribution {
        variable: settings.stratify_by.clone(),
        counts,
    })
}

/// Splits the themes of each episode by the normal codes of the stratifying
/// variable.
///
/// Each record holds the number of participants with the theme in the
/// stratum, and their share of the relevant participants of that stratum.
/// Episodes without any theme left after removing the non-theme codes are
/// skipped.
pub fn stratify_themes(
    cross_tab: &ThemeCrossTab,
    rqa_plans: &[&CodingPlan],
    demographic_plans: &[&CodingPlan],
    settings: &AnalysisSettings,
) -> Result<Vec<StratifiedBreakdown>, AnalysisError> {
    let cc = stratifying_configuration(demographic_plans, settings)?;
    let strata: Vec<(String, usize)> = cc
        .code_scheme
        .codes()
        .iter()
        .filter(|c| c.is_normal())
        .map(|c| {
            let header = format!("{}:{}", settings.stratify_by, c.string_value);
            cross_tab
                .columns
                .position(&header)
                .map(|idx| (c.string_value.clone(), idx))
                .ok_or_else(|| AnalysisError::MissingStratifyingVariable {
                    variable: header,
                })
        })
        .collect::<Result<Vec<(String, usize)>, AnalysisError>>()?;

    let mut res: Vec<StratifiedBreakdown> = Vec::new();
    for plan in rqa_plans.iter() {
        let episode = match cross_tab.get(&plan.raw_field) {
            Some(e) => e,
            None => {
                warn!("Skipping {}: it was not cross-tabulated", plan.raw_field);
                continue;
            }
        };
        let themes: Vec<_> = episode
            .themes
            .iter()
            .filter(|t| !settings.non_theme_codes.contains(&t.theme))
            .collect();
        if themes.is_empty() {
            warn!(
                "Skipping the {} breakdown of {}: the scheme has no normal themes",
                settings.stratify_by, plan.raw_field
            );
            continue;
        }

        let mut records: Vec<StratifiedRecord> = Vec::new();
        for theme in themes {
            for (stratum, idx) in strata.iter() {
                let count = theme.row.counts[*idx];
                let relevant = episode.relevant.counts[*idx];
                records.push(StratifiedRecord {
                    theme: theme.theme.clone(),
                    stratum: stratum.clone(),
                    count,
                    fraction_of_stratum: if relevant == 0 {
                        None
                    } else {
                        Some(count as f64 / relevant as f64)
                    },
                });
            }
        }
        debug!(
            "stratify_themes: {}: {} records against the {} row",
            plan.raw_field,
            records.len(),
            TOTAL_RELEVANT_PARTICIPANTS
        );
        res.push(StratifiedBreakdown {
            episode: plan.raw_field.clone(),
            records,
        });
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{RecordBuilder, SchemeBuilder};
    use crate::distributions::compute_demographic_distributions;
    use crate::themes::cross_tabulate_themes;

    const CONSENT: &str = "consent_withdrawn";

    fn episode(n: u32, themes: &[&str]) -> CodingPlan {
        let mut b = SchemeBuilder::new(&format!("Scheme-e{}", n), "rqa");
        for t in themes {
            b = b.normal(&format!("code-{}", t), t, &[]);
        }
        let scheme = b.control("code-stop", "STOP", ControlCode::Stop).build_shared();
        let cc = CodingConfiguration::new(
            CodingMode::Multiple,
            scheme,
            &format!("rqa_e{}_coded", n),
            Some(format!("rqa_e{}_", n).as_str()),
            FoldStrategy::ListOfLabels,
        );
        CodingPlan::new(
            &format!("rqa_e{}_raw", n),
            &format!("e{}", n),
            vec![cc],
            FoldStrategy::Concatenate,
        )
    }

    fn gender_plan() -> CodingPlan {
        let scheme = SchemeBuilder::new("Scheme-gender", "gender")
            .normal("code-male", "male", &["male"])
            .normal("code-female", "female", &["female"])
            .control("code-nc", "NC", ControlCode::NotCoded)
            .control("code-stop", "STOP", ControlCode::Stop)
            .build_shared();
        let cc = CodingConfiguration::new(
            CodingMode::Single,
            scheme,
            "gender_coded",
            Some("gender"),
            FoldStrategy::AssertLabelIdsEqual,
        );
        CodingPlan::new("gender_raw", "gender", vec![cc], FoldStrategy::AssertEqual)
    }

    fn individual(gender: &str, e1: &[&str], e2: &[&str]) -> Record {
        RecordBuilder::new()
            .consent_withdrawn(CONSENT, false)
            .label("gender_coded", gender)
            .labels("rqa_e1_coded", e1)
            .labels("rqa_e2_coded", e2)
            .build()
    }

    #[test]
    fn breakdown_by_gender() {
        let _ = env_logger::builder().is_test(true).try_init();
        let e1 = episode(1, &["water", "knowledge"]);
        let e2 = episode(2, &["attitude"]);
        let gender = gender_plan();
        let individuals = vec![
            individual("code-male", &["code-water"], &["code-attitude"]),
            individual("code-male", &["code-knowledge"], &[]),
            individual("code-female", &["code-water"], &[]),
        ];
        let refs: Vec<&Record> = individuals.iter().collect();
        let settings = AnalysisSettings::default();
        let tab = cross_tabulate_themes(&refs, &[&e1, &e2], &[&gender], &settings).unwrap();

        let res = stratify_themes(&tab, &[&e1, &e2], &[&gender], &settings).unwrap();
        // e2 only holds a non-theme code.
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].episode, "rqa_e1_raw");
        assert_eq!(
            res[0].records,
            vec![
                StratifiedRecord {
                    theme: "water".to_string(),
                    stratum: "male".to_string(),
                    count: 1,
                    fraction_of_stratum: Some(0.5),
                },
                StratifiedRecord {
                    theme: "water".to_string(),
                    stratum: "female".to_string(),
                    count: 1,
                    fraction_of_stratum: Some(1.0),
                },
            ]
        );
    }

    #[test]
    fn empty_stratum_has_no_fraction() {
        let e1 = episode(1, &["water"]);
        let gender = gender_plan();
        let individuals = vec![individual("code-male", &["code-water"], &[])];
        let refs: Vec<&Record> = individuals.iter().collect();
        let settings = AnalysisSettings::default();
        let tab = cross_tabulate_themes(&refs, &[&e1], &[&gender], &settings).unwrap();

        let res = stratify_themes(&tab, &[&e1], &[&gender], &settings).unwrap();
        let female = res[0].records.iter().find(|r| r.stratum == "female").unwrap();
        assert_eq!(female.count, 0);
        assert_eq!(female.fraction_of_stratum, None);
    }

    #[test]
    fn normal_codes_of_the_stratifying_variable() {
        let gender = gender_plan();
        let individuals = vec![
            individual("code-male", &[], &[]),
            individual("code-nc", &[], &[]),
        ];
        let refs: Vec<&Record> = individuals.iter().collect();
        let settings = AnalysisSettings::default();
        let demographics = compute_demographic_distributions(&refs, &[&gender], &settings).unwrap();
        let dist = stratifying_distribution(&demographics, &[&gender], &settings).unwrap();
        assert_eq!(
            dist.counts,
            vec![("male".to_string(), 1), ("female".to_string(), 0)]
        );

        let settings = AnalysisSettings {
            stratify_by: "age".to_string(),
            ..AnalysisSettings::default()
        };
        assert_eq!(
            stratifying_distribution(&demographics, &[&gender], &settings),
            Err(AnalysisError::MissingStratifyingVariable {
                variable: "age".to_string()
            })
        );
    }
}
