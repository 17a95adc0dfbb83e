// The coding plans of the Kakuma and Dadaab pipelines.

use crate::analysis::io_schemes::SchemeRegistry;
use crate::analysis::*;

use std::sync::Arc;

const EPISODES: u32 = 10;

const FOLLOW_UPS: &[&str] = &[
    "learning_from_home_experience",
    "homeschooling_support",
    "show_suggestions",
];

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Pipeline {
    Kakuma,
    Dadaab,
}

impl Pipeline {
    pub fn from_name(name: &str) -> CliResult<Pipeline> {
        match name {
            "kakuma_pipeline" => Ok(Pipeline::Kakuma),
            "dadaab_pipeline" => Ok(Pipeline::Dadaab),
            x => UnknownPipelineSnafu { name: x }.fail(),
        }
    }

    pub fn camp(&self) -> &'static str {
        match self {
            Pipeline::Kakuma => "kakuma",
            Pipeline::Dadaab => "dadaab",
        }
    }

    /// The plans of the camp, with their schemes read from `registry`.
    ///
    /// Every plan is tied to the code of the wrong-scheme correction scheme
    /// that points to it. A missing code fails the whole configuration.
    pub fn plans(&self, registry: &mut SchemeRegistry) -> CliResult<PlanSet> {
        let camp = self.camp();
        let ws_scheme = registry.get(&format!("{}_ws_correct_dataset", camp))?;
        let ws_code = |match_value: String| -> CliResult<Option<Code>> {
            let code = ws_scheme
                .get_code_with_match_value(&match_value)
                .context(AnalysisSnafu {})?;
            Ok(Some(code.clone()))
        };

        let mut rqa: Vec<CodingPlan> = Vec::new();
        for n in 1..=EPISODES {
            let episode = format!("s01e{:02}", n);
            let dataset = format!("{}_{}", camp, episode);
            let cc = CodingConfiguration::new(
                CodingMode::Multiple,
                registry.get(&dataset)?,
                &format!("rqa_{}_coded", episode),
                Some(format!("rqa_{}_", episode).as_str()),
                FoldStrategy::ListOfLabels,
            );
            let mut plan = CodingPlan::new(
                &format!("rqa_{}_raw", episode),
                &dataset,
                vec![cc],
                FoldStrategy::Concatenate,
            );
            plan.time_field = Some("sent_on".to_string());
            plan.run_id_field = Some(format!("rqa_{}_run_id", episode));
            plan.coda_filename = Some(format!("{}.json", dataset));
            plan.icr_filename = Some(format!("{}.csv", dataset));
            plan.ws_code = ws_code(format!("covid19 adaptation {} {}", camp, episode))?;
            rqa.push(plan);
        }

        let demographics = vec![
            demographic_plan(
                camp,
                "location",
                vec![single(
                    registry.get(&format!("{}_location", camp))?,
                    "location",
                )],
                ws_code(format!("{} location", camp))?,
            ),
            demographic_plan(
                camp,
                "gender",
                vec![single(registry.get("gender")?, "gender").with_cleaner(Cleaner::Gender)],
                ws_code(format!("{} gender", camp))?,
            ),
            demographic_plan(
                camp,
                "age",
                vec![
                    single(registry.get("age")?, "age")
                        .with_cleaner(Cleaner::AgeInRange { min: 10, max: 100 }),
                    single(registry.get("age_category")?, "age_category"),
                ],
                ws_code(format!("{} age", camp))?,
            ),
            demographic_plan(
                camp,
                "household_language",
                vec![single(
                    registry.get(&format!("{}_household_language", camp))?,
                    "household_language",
                )],
                ws_code(format!("{} household language", camp))?,
            ),
            demographic_plan(
                camp,
                "nationality",
                vec![single(registry.get("nationality")?, "nationality")],
                ws_code(format!("{} nationality", camp))?,
            ),
        ];

        let mut follow_ups: Vec<CodingPlan> = Vec::new();
        for name in FOLLOW_UPS.iter() {
            let dataset = format!("{}_{}", camp, name);
            let cc = CodingConfiguration::new(
                CodingMode::Multiple,
                registry.get(&dataset)?,
                &format!("{}_coded", dataset),
                Some(format!("{}_", dataset).as_str()),
                FoldStrategy::ListOfLabels,
            );
            let mut plan = CodingPlan::new(
                &format!("{}_raw", name),
                &dataset,
                vec![cc],
                FoldStrategy::Concatenate,
            );
            plan.time_field = Some(format!("{}_time", name));
            plan.coda_filename = Some(format!("{}.json", dataset));
            plan.icr_filename = Some(format!("{}.csv", dataset));
            plan.ws_code = ws_code(format!(
                "covid19 adaptation {} {}",
                camp,
                name.replace('_', " ")
            ))?;
            follow_ups.push(plan);
        }

        Ok(PlanSet {
            rqa,
            demographics,
            follow_ups,
        })
    }
}

fn single(scheme: Arc<CodeScheme>, key: &str) -> CodingConfiguration {
    CodingConfiguration::new(
        CodingMode::Single,
        scheme,
        &format!("{}_coded", key),
        Some(key),
        FoldStrategy::AssertLabelIdsEqual,
    )
}

fn demographic_plan(
    camp: &str,
    name: &str,
    coding_configurations: Vec<CodingConfiguration>,
    ws_code: Option<Code>,
) -> CodingPlan {
    let dataset = format!("{}_{}", camp, name);
    let mut plan = CodingPlan::new(
        &format!("{}_raw", name),
        &dataset,
        coding_configurations,
        FoldStrategy::AssertEqual,
    );
    plan.time_field = Some(format!("{}_time", name));
    plan.coda_filename = Some(format!("{}.json", dataset));
    plan.ws_code = ws_code;
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serde_json::Value as JSValue;
    use std::fs;
    use std::path::PathBuf;

    fn write_scheme(dir: &Path, stem: &str, match_values: &[String]) {
        let codes: Vec<JSValue> = match_values
            .iter()
            .enumerate()
            .map(|(idx, mv)| {
                json!({"CodeID": format!("code-{}", idx), "CodeType": "Normal",
                       "StringValue": mv, "MatchValues": [mv]})
            })
            .chain(std::iter::once(json!({
                "CodeID": "code-stop", "CodeType": "Control", "ControlCode": "STOP",
                "StringValue": "STOP"})))
            .collect();
        let js = json!({"SchemeID": format!("Scheme-{}", stem), "Name": stem, "Codes": codes});
        fs::write(dir.join(format!("{}.json", stem)), js.to_string()).unwrap();
    }

    fn scheme_dir(camp: &str, skip_ws: Option<&str>) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "surveytab-pipelines-{}-{}-{}",
            camp,
            skip_ws.is_some(),
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        let mut ws: Vec<String> = Vec::new();
        for n in 1..=EPISODES {
            write_scheme(&dir, &format!("{}_s01e{:02}", camp, n), &["a".to_string()]);
            ws.push(format!("covid19 adaptation {} s01e{:02}", camp, n));
        }
        for stem in ["gender", "age", "age_category", "nationality"] {
            write_scheme(&dir, stem, &["a".to_string()]);
        }
        for stem in ["location", "household_language"] {
            write_scheme(&dir, &format!("{}_{}", camp, stem), &["a".to_string()]);
        }
        for name in FOLLOW_UPS.iter() {
            write_scheme(&dir, &format!("{}_{}", camp, name), &["a".to_string()]);
            ws.push(format!("covid19 adaptation {} {}", camp, name.replace('_', " ")));
        }
        for demog in ["location", "gender", "age", "household language", "nationality"] {
            ws.push(format!("{} {}", camp, demog));
        }
        ws.retain(|mv| Some(mv.as_str()) != skip_ws);
        write_scheme(&dir, &format!("{}_ws_correct_dataset", camp), &ws);
        dir
    }

    #[test]
    fn pipeline_names() {
        assert_eq!(Pipeline::from_name("dadaab_pipeline").unwrap(), Pipeline::Dadaab);
        assert!(matches!(
            Pipeline::from_name("ifra_pipeline"),
            Err(CliError::UnknownPipeline { .. })
        ));
    }

    #[test]
    fn kakuma_plans() {
        let dir = scheme_dir("kakuma", None);
        let mut registry = SchemeRegistry::new(&dir);
        let plans = Pipeline::Kakuma.plans(&mut registry).unwrap();

        assert_eq!(plans.rqa.len(), 10);
        let e3 = &plans.rqa[2];
        assert_eq!(e3.raw_field, "rqa_s01e03_raw");
        assert_eq!(e3.dataset_name, "kakuma_s01e03");
        assert_eq!(e3.run_id_field.as_deref(), Some("rqa_s01e03_run_id"));
        assert_eq!(
            e3.coding_configurations[0].analysis_file_key.as_deref(),
            Some("rqa_s01e03_")
        );
        assert!(e3.ws_code.is_some());

        let keys: Vec<&str> = plans
            .demographics
            .iter()
            .flat_map(|p| p.analysis_configurations().map(|(_, key)| key))
            .collect();
        assert_eq!(
            keys,
            vec![
                "location",
                "gender",
                "age",
                "age_category",
                "household_language",
                "nationality"
            ]
        );
        let age = &plans.demographics[2].coding_configurations[0];
        assert_eq!(age.cleaner, Some(Cleaner::AgeInRange { min: 10, max: 100 }));

        let follow_up = &plans.follow_ups[1];
        assert_eq!(follow_up.raw_field, "homeschooling_support_raw");
        assert_eq!(
            follow_up.coding_configurations[0].coded_field,
            "kakuma_homeschooling_support_coded"
        );

        // The gender scheme is shared, not read twice.
        assert_eq!(registry.len(), 10 + 4 + 2 + 3 + 1);
    }

    #[test]
    fn missing_ws_code_is_fatal() {
        let dir = scheme_dir("dadaab", Some("dadaab nationality"));
        let mut registry = SchemeRegistry::new(&dir);
        assert!(matches!(
            Pipeline::Dadaab.plans(&mut registry),
            Err(CliError::Analysis {
                source: AnalysisError::UnknownMatchValue { .. }
            })
        ));
    }
}
