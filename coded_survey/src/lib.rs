mod config;
mod distributions;
mod engagement;
mod sharing;
mod strategies;
mod stratified;
mod tables;
mod themes;

pub mod builder;
pub mod filters;
pub mod manual;

use log::info;

use std::collections::HashSet;

pub use crate::config::*;
pub use crate::distributions::{
    chartable, compute_demographic_distributions, compute_season_distributions,
};
pub use crate::engagement::{
    compute_engagement_counts, compute_repeat_participations, TOTAL_EPISODE,
};
pub use crate::sharing::safe_to_share;
pub use crate::stratified::{stratify_themes, stratifying_distribution};
pub use crate::tables::*;
pub use crate::themes::{
    cross_tabulate_themes, ColumnTemplate, CrossTabRow, DemographicColumn, EpisodeCrossTab,
    ThemeCrossTab, ThemeRow, TOTAL_PARTICIPANTS, TOTAL_RELEVANT_PARTICIPANTS,
};

/// Resolves a coded value into the codes of the scheme of `cc`, in label order.
///
/// A `Single` configuration expects exactly one label, a `Multiple` one a
/// list of labels. A code listed twice is only returned once.
pub(crate) fn resolve_value<'a>(
    value: &FieldValue,
    cc: &'a CodingConfiguration,
) -> Result<Vec<&'a Code>, AnalysisError> {
    let scheme = &cc.code_scheme;
    match (cc.coding_mode, value) {
        (CodingMode::Single, FieldValue::Label(label)) => {
            Ok(vec![scheme.get_code_with_code_id(&label.code_id)?])
        }
        (CodingMode::Multiple, FieldValue::Labels(labels)) => {
            let mut seen: HashSet<&str> = HashSet::new();
            let mut res: Vec<&'a Code> = Vec::new();
            for label in labels.iter() {
                let code = scheme.get_code_with_code_id(&label.code_id)?;
                if seen.insert(code.code_id.as_str()) {
                    res.push(code);
                }
            }
            Ok(res)
        }
        (mode, _) => Err(AnalysisError::MalformedLabel {
            field: cc.coded_field.clone(),
            mode,
        }),
    }
}

/// The codes attached to `record` under the coded field of `cc`.
///
/// The field must be present: every individual carries every coded field,
/// possibly with a control code.
pub fn resolve_codes<'a>(
    record: &Record,
    cc: &'a CodingConfiguration,
) -> Result<Vec<&'a Code>, AnalysisError> {
    let value = record
        .get(&cc.coded_field)
        .ok_or_else(|| AnalysisError::MissingCodedField {
            field: cc.coded_field.clone(),
        })?;
    resolve_value(value, cc)
}

/// Same as `resolve_codes`, without the STOP codes.
pub fn resolve_codes_without_stop<'a>(
    record: &Record,
    cc: &'a CodingConfiguration,
) -> Result<Vec<&'a Code>, AnalysisError> {
    Ok(resolve_codes(record, cc)?
        .into_iter()
        .filter(|c| !c.is_stop())
        .collect())
}

/// Everything an analysis run produces.
#[derive(PartialEq, Debug, Clone)]
pub struct AnalysisReport {
    pub engagement: Vec<EngagementCounts>,
    pub repeat_participations: Vec<ParticipationFrequency>,
    pub demographics: DemographicDistributions,
    /// The distributions of the variables that are not demographics.
    pub season_distributions: Vec<VariableDistribution>,
    pub themes: ThemeCrossTab,
    /// The normal codes of the stratifying variable.
    pub stratifying_distribution: VariableDistribution,
    pub stratified: Vec<StratifiedBreakdown>,
    pub safe_to_share: SafeToShare,
}

impl AnalysisReport {
    /// The tables exported by the analysis, with their file stems.
    pub fn tables(&self) -> Vec<(&'static str, Table)> {
        vec![
            ("engagement_counts", engagement_table(&self.engagement)),
            (
                "repeat_participations",
                repeat_participations_table(&self.repeat_participations),
            ),
            (
                "demographic_distributions",
                demographic_distributions_table(&self.demographics),
            ),
            ("theme_distributions", theme_distributions_table(&self.themes)),
            (
                "safe_to_share_messages",
                safe_to_share_table(&self.safe_to_share),
            ),
        ]
    }
}

/// Runs every aggregation over the messages and the individuals.
///
/// Arguments:
/// * `messages` one record per inbound message
/// * `individuals` one record per participant
/// * `plans` the coding plans of the pipeline
/// * `settings` the analysis keys and thresholds
pub fn run_analysis(
    messages: &[Record],
    individuals: &[Record],
    plans: &PlanSet,
    settings: &AnalysisSettings,
) -> Result<AnalysisReport, AnalysisError> {
    info!(
        "Analysing {} messages and {} individuals over {} episodes",
        messages.len(),
        individuals.len(),
        plans.rqa.len()
    );
    let messages: Vec<&Record> = messages.iter().collect();
    let individuals: Vec<&Record> = individuals.iter().collect();
    let rqa: Vec<&CodingPlan> = plans.rqa.iter().collect();
    let demographics: Vec<&CodingPlan> = plans.demographics.iter().collect();
    let follow_ups: Vec<&CodingPlan> = plans.follow_ups.iter().collect();

    info!("Computing the engagement counts...");
    let engagement = compute_engagement_counts(&messages, &individuals, &rqa, settings)?;

    info!("Computing the participation frequencies...");
    let repeat_participations = compute_repeat_participations(&individuals, &rqa, settings)?;

    info!("Computing the demographic distributions...");
    let demographic_distributions =
        compute_demographic_distributions(&individuals, &demographics, settings)?;

    let mut season_plans: Vec<&CodingPlan> = rqa.clone();
    season_plans.extend(plans.survey_plans());
    let season_distributions = compute_season_distributions(
        &individuals,
        &season_plans,
        &demographic_distributions,
        settings,
    )?;

    info!("Computing the theme distributions...");
    let themes = cross_tabulate_themes(
        &individuals,
        &plans.episode_plans(),
        &demographics,
        settings,
    )?;

    info!("Computing the themes by {}...", settings.stratify_by);
    let stratifying =
        stratifying_distribution(&demographic_distributions, &demographics, settings)?;
    let stratified = stratify_themes(&themes, &rqa, &demographics, settings)?;

    info!("Selecting the safe to share messages...");
    let mut sharing_plans: Vec<&CodingPlan> = rqa
        .iter()
        .skip(settings.safe_to_share_from_episode)
        .copied()
        .collect();
    sharing_plans.extend(follow_ups.iter().copied());
    let shared = safe_to_share(&messages, &sharing_plans, settings)?;

    Ok(AnalysisReport {
        engagement,
        repeat_participations,
        demographics: demographic_distributions,
        season_distributions,
        themes,
        stratifying_distribution: stratifying,
        stratified,
        safe_to_share: shared,
    })
}

#[cfg(test)]
mod tests {
    use super::builder::{RecordBuilder, SchemeBuilder};
    use super::*;

    const CONSENT: &str = "consent_withdrawn";

    fn plans() -> PlanSet {
        let rqa_scheme = SchemeBuilder::new("Scheme-rqa", "rqa")
            .normal("code-a", "A", &[])
            .normal("code-b", "B", &[])
            .control("code-stop", "STOP", ControlCode::Stop)
            .build_shared();
        let gender_scheme = SchemeBuilder::new("Scheme-gender", "gender")
            .normal("code-male", "male", &["male"])
            .normal("code-female", "female", &["female"])
            .control("code-stop", "STOP", ControlCode::Stop)
            .build_shared();
        let rqa = (1..=2)
            .map(|n| {
                CodingPlan::new(
                    &format!("rqa_e{}_raw", n),
                    &format!("e{}", n),
                    vec![CodingConfiguration::new(
                        CodingMode::Multiple,
                        rqa_scheme.clone(),
                        &format!("rqa_e{}_coded", n),
                        Some(format!("rqa_e{}_", n).as_str()),
                        FoldStrategy::ListOfLabels,
                    )],
                    FoldStrategy::Concatenate,
                )
            })
            .collect();
        let gender = CodingPlan::new(
            "gender_raw",
            "gender",
            vec![CodingConfiguration::new(
                CodingMode::Single,
                gender_scheme,
                "gender_coded",
                Some("gender"),
                FoldStrategy::AssertLabelIdsEqual,
            )],
            FoldStrategy::AssertEqual,
        );
        PlanSet {
            rqa,
            demographics: vec![gender],
            follow_ups: Vec::new(),
        }
    }

    fn individual(uid: &str, withdrawn: bool, gender: &str, e1: &[&str], e2: &[&str]) -> Record {
        let mut b = RecordBuilder::new()
            .text("uid", uid)
            .consent_withdrawn(CONSENT, withdrawn)
            .label("gender_coded", gender)
            .labels("rqa_e1_coded", e1)
            .labels("rqa_e2_coded", e2);
        if !e1.is_empty() {
            b = b.text("rqa_e1_raw", "hello");
        }
        if !e2.is_empty() {
            b = b.text("rqa_e2_raw", "hello again");
        }
        b.build()
    }

    fn individuals() -> Vec<Record> {
        vec![
            individual("i1", false, "code-male", &["code-a"], &[]),
            individual("i2", false, "code-female", &["code-b"], &["code-a"]),
            individual("i3", true, "code-stop", &["code-stop"], &["code-stop"]),
            individual("i4", false, "code-male", &["code-stop"], &[]),
        ]
    }

    fn digests(report: &AnalysisReport) -> Vec<String> {
        report.tables().iter().map(|(_, t)| t.digest()).collect()
    }

    #[test]
    fn full_run() {
        let _ = env_logger::builder().is_test(true).try_init();
        let report =
            run_analysis(&[], &individuals(), &plans(), &AnalysisSettings::default()).unwrap();

        let hist_total: u64 = report
            .repeat_participations
            .iter()
            .map(|f| f.number_of_individuals)
            .sum();
        assert_eq!(hist_total, 3);

        let e1 = report.themes.get("rqa_e1_raw").unwrap();
        assert_eq!(e1.relevant.total_participants, 2);
        assert_eq!(
            e1.percent(TOTAL_RELEVANT_PARTICIPANTS, "gender:female"),
            Some(Percentage::Value(50.0))
        );
        assert_eq!(report.stratified.len(), 2);
        assert_eq!(
            report.stratifying_distribution.counts,
            vec![("male".to_string(), 2), ("female".to_string(), 1)]
        );
        assert_eq!(report.season_distributions.len(), 2);
    }

    #[test]
    fn output_does_not_depend_on_record_order() {
        let mut shuffled = individuals();
        shuffled.reverse();
        shuffled.swap(0, 2);
        let settings = AnalysisSettings::default();
        let a = run_analysis(&[], &individuals(), &plans(), &settings).unwrap();
        let b = run_analysis(&[], &shuffled, &plans(), &settings).unwrap();
        assert_eq!(digests(&a), digests(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn silent_individual_aborts_the_run() {
        let mut records = individuals();
        records.push(individual("i5", false, "code-male", &[], &[]));
        let res = run_analysis(&[], &records, &plans(), &AnalysisSettings::default());
        assert_eq!(
            res,
            Err(AnalysisError::NoParticipation {
                individual: "i5".to_string()
            })
        );
    }

    #[test]
    fn resolution_checks_the_coding_mode() {
        let plans = plans();
        let cc = &plans.demographics[0].coding_configurations[0];
        let r = RecordBuilder::new()
            .labels("gender_coded", &["code-male"])
            .build();
        assert_eq!(
            resolve_codes(&r, cc),
            Err(AnalysisError::MalformedLabel {
                field: "gender_coded".to_string(),
                mode: CodingMode::Single
            })
        );
        let r = RecordBuilder::new().label("gender_coded", "code-stop").build();
        assert_eq!(resolve_codes(&r, cc).map(|c| c.len()), Ok(1));
        assert_eq!(resolve_codes_without_stop(&r, cc).map(|c| c.len()), Ok(0));

        let cc = &plans.rqa[0].coding_configurations[0];
        let r = RecordBuilder::new()
            .labels("rqa_e1_coded", &["code-a", "code-a", "code-b"])
            .build();
        let values: Vec<String> = resolve_codes(&r, cc)
            .unwrap()
            .iter()
            .map(|c| c.string_value.clone())
            .collect();
        assert_eq!(values, vec!["A", "B"]);
    }
}
