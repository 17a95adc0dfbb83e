// The series behind each chart, written as JSON.

use crate::analysis::*;

use serde_json::json;
use serde_json::Value as JSValue;
use std::fs;

fn distribution_to_json(d: &VariableDistribution) -> JSValue {
    let counts: Vec<JSValue> = d
        .counts
        .iter()
        .map(|(code, count)| json!({"code": code, "count": count}))
        .collect();
    json!({"variable": d.variable, "counts": counts})
}

fn per_episode(
    engagement: &[EngagementCounts],
    series: &str,
    f: fn(&EngagementCounts) -> u64,
) -> JSValue {
    let points: Vec<JSValue> = engagement
        .iter()
        .filter(|c| c.episode != TOTAL_EPISODE)
        .map(|c| json!({"episode": c.episode, series: f(c)}))
        .collect();
    JSValue::Array(points)
}

/// Every chart of the report, by file stem.
pub fn chart_series(
    report: &AnalysisReport,
    settings: &AnalysisSettings,
) -> Vec<(String, JSValue)> {
    let mut res: Vec<(String, JSValue)> = vec![
        (
            "messages_per_episode".to_string(),
            per_episode(&report.engagement, "messages", |c| c.total_messages_opted_in),
        ),
        (
            "participants_per_episode".to_string(),
            per_episode(&report.engagement, "participants", |c| {
                c.total_participants_opted_in
            }),
        ),
    ];

    let distributions: Vec<&VariableDistribution> = report
        .demographics
        .variables
        .iter()
        .chain(report.season_distributions.iter())
        .collect();
    for d in chartable(&distributions, settings.chart_code_ceiling) {
        res.push((
            format!("season_distribution_{}", d.variable),
            distribution_to_json(d),
        ));
    }
    res.push((
        format!("season_distribution_{}_pie", settings.stratify_by),
        distribution_to_json(&report.stratifying_distribution),
    ));

    for breakdown in report.stratified.iter() {
        let records: Vec<JSValue> = breakdown
            .records
            .iter()
            .map(|r| {
                json!({
                    "theme": r.theme,
                    "stratum": r.stratum,
                    "count": r.count,
                    "fraction": r.fraction_of_stratum,
                })
            })
            .collect();
        res.push((
            format!("{}_by_{}", breakdown.episode, settings.stratify_by),
            JSValue::Array(records),
        ));
    }
    res
}

pub fn write_charts(
    dir: &Path,
    report: &AnalysisReport,
    settings: &AnalysisSettings,
) -> CliResult<()> {
    io_common::ensure_dir(dir)?;
    let series = chart_series(report, settings);
    info!("Writing {} charts to {}", series.len(), dir.display());
    for (stem, js) in series.iter() {
        let path = io_common::output_path(dir, stem, "json");
        let p = path.display().to_string();
        let pretty =
            serde_json::to_string_pretty(js).context(ParsingJsonSnafu { path: p.clone() })?;
        fs::write(&path, pretty).context(WritingFileSnafu { path: p })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coded_survey::builder::{RecordBuilder, SchemeBuilder};

    fn report() -> AnalysisReport {
        let rqa = SchemeBuilder::new("Scheme-rqa", "rqa")
            .normal("code-water", "water", &[])
            .control("code-stop", "STOP", ControlCode::Stop)
            .build_shared();
        let gender = SchemeBuilder::new("Scheme-gender", "gender")
            .normal("code-male", "male", &["male"])
            .normal("code-female", "female", &["female"])
            .control("code-stop", "STOP", ControlCode::Stop)
            .build_shared();
        let plans = PlanSet {
            rqa: vec![CodingPlan::new(
                "rqa_s01e01_raw",
                "kakuma_s01e01",
                vec![CodingConfiguration::new(
                    CodingMode::Multiple,
                    rqa,
                    "rqa_s01e01_coded",
                    Some("rqa_s01e01_"),
                    FoldStrategy::ListOfLabels,
                )],
                FoldStrategy::Concatenate,
            )],
            demographics: vec![CodingPlan::new(
                "gender_raw",
                "kakuma_gender",
                vec![CodingConfiguration::new(
                    CodingMode::Single,
                    gender,
                    "gender_coded",
                    Some("gender"),
                    FoldStrategy::AssertLabelIdsEqual,
                )],
                FoldStrategy::AssertEqual,
            )],
            follow_ups: Vec::new(),
        };
        let individual = |gender: &str| {
            RecordBuilder::new()
                .text("uid", gender)
                .consent_withdrawn("consent_withdrawn", false)
                .text("rqa_s01e01_raw", "water please")
                .labels("rqa_s01e01_coded", &["code-water"])
                .label("gender_coded", gender)
                .build()
        };
        let individuals = vec![individual("code-male"), individual("code-female")];
        run_analysis(&[], &individuals, &plans, &AnalysisSettings::default()).unwrap()
    }

    #[test]
    fn series() {
        let settings = AnalysisSettings::default();
        let series = chart_series(&report(), &settings);
        let stems: Vec<&str> = series.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(
            stems,
            vec![
                "messages_per_episode",
                "participants_per_episode",
                "season_distribution_gender",
                "season_distribution_rqa_s01e01_",
                "season_distribution_gender_pie",
                "rqa_s01e01_raw_by_gender",
            ]
        );
        assert_eq!(
            series[1].1,
            json!([{"episode": "kakuma_s01e01", "participants": 2}])
        );
        assert_eq!(
            series[5].1,
            json!([
                {"theme": "water", "stratum": "male", "count": 1, "fraction": 1.0},
                {"theme": "water", "stratum": "female", "count": 1, "fraction": 1.0},
            ])
        );
    }

    #[test]
    fn ceiling_drops_large_distributions() {
        let settings = AnalysisSettings {
            chart_code_ceiling: 1,
            ..AnalysisSettings::default()
        };
        let series = chart_series(&report(), &settings);
        assert!(series
            .iter()
            .all(|(s, _)| s != "season_distribution_gender"));
        assert!(series.iter().any(|(s, _)| s == "season_distribution_gender_pie"));
    }
}
