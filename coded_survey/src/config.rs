// ********* Taxonomy ***********

use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

pub use crate::strategies::{Cleaner, FoldStrategy};

/// The classification of a code inside its scheme.
///
/// Only `Normal` codes count as themes and make a participant relevant.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum CodeType {
    Normal,
    Control,
    Meta,
}

/// Control semantics attached to a `Control` code.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum ControlCode {
    /// The respondent opted out while answering this question.
    Stop,
    NotCoded,
    NotReviewed,
    TrueMissing,
    Skipped,
    WrongScheme,
    NotInternallyConsistent,
    CodingError,
    Other(String),
}

impl ControlCode {
    pub fn from_label(label: &str) -> ControlCode {
        match label {
            "STOP" => ControlCode::Stop,
            "NC" => ControlCode::NotCoded,
            "NR" => ControlCode::NotReviewed,
            "NA" => ControlCode::TrueMissing,
            "NS" => ControlCode::Skipped,
            "WS" => ControlCode::WrongScheme,
            "NIC" => ControlCode::NotInternallyConsistent,
            "CE" => ControlCode::CodingError,
            x => ControlCode::Other(x.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ControlCode::Stop => "STOP",
            ControlCode::NotCoded => "NC",
            ControlCode::NotReviewed => "NR",
            ControlCode::TrueMissing => "NA",
            ControlCode::Skipped => "NS",
            ControlCode::WrongScheme => "WS",
            ControlCode::NotInternallyConsistent => "NIC",
            ControlCode::CodingError => "CE",
            ControlCode::Other(x) => x.as_str(),
        }
    }
}

/// One categorical value of a code scheme.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Code {
    pub code_id: String,
    pub code_type: CodeType,
    pub control_code: Option<ControlCode>,
    /// The label used as a row or column key in every output table.
    pub string_value: String,
    pub display_text: String,
    pub match_values: Vec<String>,
}

impl Code {
    pub fn is_stop(&self) -> bool {
        self.control_code == Some(ControlCode::Stop)
    }

    pub fn is_normal(&self) -> bool {
        self.code_type == CodeType::Normal
    }
}

/// An ordered set of codes, unique by id.
///
/// The order of the codes is the output order of every table keyed by code.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CodeScheme {
    pub id: String,
    pub name: String,
    pub version: String,
    codes: Vec<Code>,
    by_id: HashMap<String, usize>,
    by_match_value: HashMap<String, usize>,
}

impl CodeScheme {
    /// Builds a scheme from codes in their canonical order.
    ///
    /// The taxonomy is trusted to be consistent: if an id or a match value
    /// appears twice, the first code holding it wins.
    pub fn new(id: &str, name: &str, version: &str, codes: Vec<Code>) -> CodeScheme {
        let mut by_id: HashMap<String, usize> = HashMap::new();
        let mut by_match_value: HashMap<String, usize> = HashMap::new();
        for (idx, code) in codes.iter().enumerate() {
            by_id.entry(code.code_id.clone()).or_insert(idx);
            for mv in code.match_values.iter() {
                by_match_value.entry(mv.clone()).or_insert(idx);
            }
        }
        CodeScheme {
            id: id.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            codes,
            by_id,
            by_match_value,
        }
    }

    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    /// The codes that take part in distributions: everything except STOP.
    pub fn codes_without_stop(&self) -> impl Iterator<Item = &Code> {
        self.codes.iter().filter(|c| !c.is_stop())
    }

    pub fn get_code_with_code_id(&self, code_id: &str) -> Result<&Code, AnalysisError> {
        self.by_id
            .get(code_id)
            .map(|idx| &self.codes[*idx])
            .ok_or_else(|| AnalysisError::UnknownCodeId {
                scheme_id: self.id.clone(),
                code_id: code_id.to_string(),
            })
    }

    pub fn get_code_with_match_value(&self, match_value: &str) -> Result<&Code, AnalysisError> {
        self.by_match_value
            .get(match_value)
            .map(|idx| &self.codes[*idx])
            .ok_or_else(|| AnalysisError::UnknownMatchValue {
                scheme_id: self.id.clone(),
                match_value: match_value.to_string(),
            })
    }

    pub fn get_code_with_control_code(&self, control_code: &ControlCode) -> Option<&Code> {
        self.codes
            .iter()
            .find(|c| c.control_code.as_ref() == Some(control_code))
    }
}

// ********* Coding plans ***********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum CodingMode {
    /// The coded field holds exactly one label.
    Single,
    /// The coded field holds an ordered list of labels.
    Multiple,
}

impl Display for CodingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodingMode::Single => write!(f, "SINGLE"),
            CodingMode::Multiple => write!(f, "MULTIPLE"),
        }
    }
}

/// How one field of a record is coded.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CodingConfiguration {
    pub coding_mode: CodingMode,
    pub code_scheme: Arc<CodeScheme>,
    pub coded_field: String,
    /// The name under which the aggregates of this configuration are filed.
    /// `None` keeps the configuration out of the analysis-file aggregates.
    pub analysis_file_key: Option<String>,
    pub fold_strategy: FoldStrategy,
    pub cleaner: Option<Cleaner>,
}

impl CodingConfiguration {
    pub fn new(
        coding_mode: CodingMode,
        code_scheme: Arc<CodeScheme>,
        coded_field: &str,
        analysis_file_key: Option<&str>,
        fold_strategy: FoldStrategy,
    ) -> CodingConfiguration {
        CodingConfiguration {
            coding_mode,
            code_scheme,
            coded_field: coded_field.to_string(),
            analysis_file_key: analysis_file_key.map(|s| s.to_string()),
            fold_strategy,
            cleaner: None,
        }
    }

    pub fn with_cleaner(self, cleaner: Cleaner) -> CodingConfiguration {
        CodingConfiguration {
            cleaner: Some(cleaner),
            ..self
        }
    }
}

/// One survey question or one radio episode.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CodingPlan {
    pub raw_field: String,
    pub dataset_name: String,
    pub coding_configurations: Vec<CodingConfiguration>,
    pub raw_field_fold_strategy: FoldStrategy,
    pub time_field: Option<String>,
    pub run_id_field: Option<String>,
    pub coda_filename: Option<String>,
    pub icr_filename: Option<String>,
    pub id_field: String,
    /// The wrong-scheme code that redirects messages into this dataset.
    pub ws_code: Option<Code>,
}

impl CodingPlan {
    pub fn new(
        raw_field: &str,
        dataset_name: &str,
        coding_configurations: Vec<CodingConfiguration>,
        raw_field_fold_strategy: FoldStrategy,
    ) -> CodingPlan {
        CodingPlan {
            raw_field: raw_field.to_string(),
            dataset_name: dataset_name.to_string(),
            coding_configurations,
            raw_field_fold_strategy,
            time_field: None,
            run_id_field: None,
            coda_filename: None,
            icr_filename: None,
            id_field: format!("{}_id", raw_field),
            ws_code: None,
        }
    }

    /// The configurations that file their results under an analysis key.
    pub fn analysis_configurations(&self) -> impl Iterator<Item = (&CodingConfiguration, &str)> {
        self.coding_configurations
            .iter()
            .filter_map(|cc| cc.analysis_file_key.as_deref().map(|key| (cc, key)))
    }
}

/// The plan lists of one pipeline. List order is the row and column order of
/// every derived table.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct PlanSet {
    /// One plan per radio episode (relevant question of the week).
    pub rqa: Vec<CodingPlan>,
    pub demographics: Vec<CodingPlan>,
    pub follow_ups: Vec<CodingPlan>,
}

impl PlanSet {
    /// Demographics followed by follow-up questions.
    pub fn survey_plans(&self) -> Vec<&CodingPlan> {
        self.demographics.iter().chain(self.follow_ups.iter()).collect()
    }

    /// The plans that get a theme cross-tabulation: episodes then follow-ups.
    pub fn episode_plans(&self) -> Vec<&CodingPlan> {
        self.rqa.iter().chain(self.follow_ups.iter()).collect()
    }
}

// ********* Records ***********

/// A reference to a code, as attached to a record by the coders.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Label {
    pub code_id: String,
}

impl Label {
    pub fn new(code_id: &str) -> Label {
        Label {
            code_id: code_id.to_string(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum FieldValue {
    Text(String),
    Label(Label),
    Labels(Vec<Label>),
}

/// One message or one individual: a mapping from field name to value.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Record {
        Record::default()
    }

    pub fn insert(&mut self, key: &str, value: FieldValue) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Whether the respondent withdrew consent. Anything but a true-like flag
    /// under `consent_key` counts as opted in.
    pub fn is_consent_withdrawn(&self, consent_key: &str) -> bool {
        matches!(self.text(consent_key), Some(s) if s.eq_ignore_ascii_case("true"))
    }
}

// ********* Settings **********

/// The knobs of one analysis run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AnalysisSettings {
    pub consent_withdrawn_key: String,
    /// Used to name individuals in error messages.
    pub individual_id_key: String,
    /// The demographic analysis key the stratified breakdowns split on.
    pub stratify_by: String,
    /// Umbrella codes that are never plotted as themes of their own.
    pub non_theme_codes: Vec<String>,
    pub do_not_share_code: String,
    /// 0-based index of the first RQA plan exported as safe to share.
    pub safe_to_share_from_episode: usize,
    /// Distributions with more codes than this are not charted.
    pub chart_code_ceiling: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            consent_withdrawn_key: "consent_withdrawn".to_string(),
            individual_id_key: "uid".to_string(),
            stratify_by: "gender".to_string(),
            non_theme_codes: vec![
                "knowledge".to_string(),
                "attitude".to_string(),
                "behaviour".to_string(),
            ],
            do_not_share_code: "DNS".to_string(),
            safe_to_share_from_episode: 5,
            chart_code_ceiling: 200,
        }
    }
}

// ******** Output data structures *********

/// A count that may not be reportable.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Tally {
    Count(u64),
    /// The underlying values were overwritten upstream.
    Unavailable,
}

impl Display for Tally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tally::Count(x) => write!(f, "{}", x),
            Tally::Unavailable => write!(f, "-"),
        }
    }
}

/// A percentage rounded to one decimal place.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Percentage {
    Value(f64),
    /// The denominator was zero.
    Undefined,
}

impl Percentage {
    pub fn of(count: u64, denominator: u64) -> Percentage {
        if denominator == 0 {
            Percentage::Undefined
        } else {
            Percentage::Value(round_one_decimal(
                count as f64 / denominator as f64 * 100.0,
            ))
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Percentage::Value(x) => Some(*x),
            Percentage::Undefined => None,
        }
    }
}

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Percentage::Value(x) => write!(f, "{:.1}", x),
            Percentage::Undefined => write!(f, "-"),
        }
    }
}

// Rounds through the decimal formatter, which breaks exact ties to even.
fn round_one_decimal(x: f64) -> f64 {
    format!("{:.1}", x).parse::<f64>().unwrap_or(x)
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct EngagementCounts {
    pub episode: String,
    pub total_messages: Tally,
    pub total_messages_opted_in: u64,
    pub total_labelled_messages: u64,
    pub total_relevant_messages: u64,
    pub total_participants: Tally,
    pub total_participants_opted_in: u64,
    pub total_relevant_participants: u64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ParticipationFrequency {
    pub episodes_participated_in: usize,
    pub number_of_individuals: u64,
    pub percent_of_individuals: Percentage,
}

/// Code counts for one analysis variable, in scheme order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VariableDistribution {
    pub variable: String,
    pub counts: Vec<(String, u64)>,
}

impl VariableDistribution {
    pub fn count_for(&self, code_string_value: &str) -> Option<u64> {
        self.counts
            .iter()
            .find(|(sv, _)| sv == code_string_value)
            .map(|(_, c)| *c)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct DemographicDistributions {
    pub variables: Vec<VariableDistribution>,
}

impl DemographicDistributions {
    pub fn get(&self, variable: &str) -> Option<&VariableDistribution> {
        self.variables.iter().find(|d| d.variable == variable)
    }
}

/// One bar of a theme-by-stratum chart.
#[derive(PartialEq, Debug, Clone)]
pub struct StratifiedRecord {
    pub theme: String,
    pub stratum: String,
    pub count: u64,
    /// `None` when no relevant participant falls in this stratum.
    pub fraction_of_stratum: Option<f64>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct StratifiedBreakdown {
    /// The raw field of the episode plan.
    pub episode: String,
    pub records: Vec<StratifiedRecord>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SharedMessage {
    pub question: String,
    pub code: String,
    pub raw_message: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct SafeToShare {
    pub messages: Vec<SharedMessage>,
    pub excluded_do_not_share: u64,
}

// ********* Errors **********

/// Errors that abort an analysis run. None of them is recoverable: the input
/// data or the configuration has to be fixed.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AnalysisError {
    UnknownCodeId {
        scheme_id: String,
        code_id: String,
    },
    UnknownMatchValue {
        scheme_id: String,
        match_value: String,
    },
    /// A non-withdrawn individual sent nothing to any episode.
    NoParticipation {
        individual: String,
    },
    UnsupportedCodingMode {
        plan: String,
        mode: CodingMode,
    },
    MissingAnalysisFileKey {
        plan: String,
    },
    MissingCodedField {
        field: String,
    },
    /// The value under a coded field does not have the shape its mode requires.
    MalformedLabel {
        field: String,
        mode: CodingMode,
    },
    MissingStratifyingVariable {
        variable: String,
    },
    FoldConflict {
        reason: String,
    },
}

impl Error for AnalysisError {}

impl Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::UnknownCodeId { scheme_id, code_id } => {
                write!(f, "code id '{}' not found in scheme '{}'", code_id, scheme_id)
            }
            AnalysisError::UnknownMatchValue {
                scheme_id,
                match_value,
            } => write!(
                f,
                "match value '{}' not found in scheme '{}'",
                match_value, scheme_id
            ),
            AnalysisError::NoParticipation { individual } => write!(
                f,
                "found individual '{}' with no participation in any week",
                individual
            ),
            AnalysisError::UnsupportedCodingMode { plan, mode } => write!(
                f,
                "coding mode {} is not supported for plan '{}'",
                mode, plan
            ),
            AnalysisError::MissingAnalysisFileKey { plan } => {
                write!(f, "plan '{}' has a configuration without analysis key", plan)
            }
            AnalysisError::MissingCodedField { field } => {
                write!(f, "record is missing coded field '{}'", field)
            }
            AnalysisError::MalformedLabel { field, mode } => write!(
                f,
                "field '{}' does not hold labels for coding mode {}",
                field, mode
            ),
            AnalysisError::MissingStratifyingVariable { variable } => write!(
                f,
                "stratifying variable '{}' is not a demographic analysis key",
                variable
            ),
            AnalysisError::FoldConflict { reason } => write!(f, "cannot fold values: {}", reason),
        }
    }
}
