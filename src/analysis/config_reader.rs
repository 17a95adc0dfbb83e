use crate::analysis::*;

use serde::{Deserialize, Serialize};
use std::fs;

/// The analysis part of a pipeline configuration file. Other keys of the
/// file are ignored.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(rename = "PipelineName")]
    pub pipeline_name: String,
    #[serde(rename = "ConsentWithdrawnKey")]
    pub consent_withdrawn_key: Option<String>,
    #[serde(rename = "IndividualIdKey")]
    pub individual_id_key: Option<String>,
    #[serde(rename = "StratifyBy")]
    pub stratify_by: Option<String>,
    #[serde(rename = "NonThemeCodes")]
    pub non_theme_codes: Option<Vec<String>>,
    #[serde(rename = "DoNotShareCode")]
    pub do_not_share_code: Option<String>,
    /// Counts from 1.
    #[serde(rename = "SafeToShareFromEpisode")]
    pub safe_to_share_from_episode: Option<usize>,
    #[serde(rename = "ChartCodeCeiling")]
    pub chart_code_ceiling: Option<usize>,
}

impl PipelineConfig {
    pub fn analysis_settings(&self) -> CliResult<AnalysisSettings> {
        let defaults = AnalysisSettings::default();
        let safe_to_share_from_episode = match self.safe_to_share_from_episode {
            Some(0) => {
                whatever!("SafeToShareFromEpisode counts from 1, got 0")
            }
            Some(x) => x - 1,
            None => defaults.safe_to_share_from_episode,
        };
        Ok(AnalysisSettings {
            consent_withdrawn_key: self
                .consent_withdrawn_key
                .clone()
                .unwrap_or(defaults.consent_withdrawn_key),
            individual_id_key: self
                .individual_id_key
                .clone()
                .unwrap_or(defaults.individual_id_key),
            stratify_by: self.stratify_by.clone().unwrap_or(defaults.stratify_by),
            non_theme_codes: self
                .non_theme_codes
                .clone()
                .unwrap_or(defaults.non_theme_codes),
            do_not_share_code: self
                .do_not_share_code
                .clone()
                .unwrap_or(defaults.do_not_share_code),
            safe_to_share_from_episode,
            chart_code_ceiling: self
                .chart_code_ceiling
                .unwrap_or(defaults.chart_code_ceiling),
        })
    }
}

pub fn read_config(path: &str) -> CliResult<PipelineConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    debug!("read config: {:?}", contents);
    let config: PipelineConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(config)
}
