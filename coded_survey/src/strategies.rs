//! Fold and clean strategies attached to coding configurations.
//!
//! Both sets are closed, so they are plain enums dispatched by a match.

use std::collections::HashSet;

use crate::config::{AnalysisError, CodeScheme, ControlCode, FieldValue, Label};

/// How two values of the same field are merged when records of one
/// participant are consolidated.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum FoldStrategy {
    /// Both values must be identical.
    AssertEqual,
    /// Texts are joined with `;`.
    Concatenate,
    /// Both single labels must point to the same code.
    AssertLabelIdsEqual,
    /// Label lists are merged by code id.
    ListOfLabels,
}

impl FoldStrategy {
    /// Merges `a` and `b`.
    ///
    /// `scheme` is only consulted by `ListOfLabels`: when given, the missing
    /// data codes are dropped from a merged list that holds a normal code.
    pub fn fold(
        &self,
        scheme: Option<&CodeScheme>,
        a: &FieldValue,
        b: &FieldValue,
    ) -> Result<FieldValue, AnalysisError> {
        match self {
            FoldStrategy::AssertEqual if a == b => Ok(a.clone()),
            FoldStrategy::AssertEqual => Err(AnalysisError::FoldConflict {
                reason: format!("{:?} differs from {:?}", a, b),
            }),
            FoldStrategy::Concatenate => match (a, b) {
                (FieldValue::Text(x), FieldValue::Text(y)) => {
                    Ok(FieldValue::Text(format!("{};{}", x, y)))
                }
                _ => Err(AnalysisError::FoldConflict {
                    reason: "only texts can be concatenated".to_string(),
                }),
            },
            FoldStrategy::AssertLabelIdsEqual => match (a, b) {
                (FieldValue::Label(x), FieldValue::Label(y)) if x.code_id == y.code_id => {
                    Ok(a.clone())
                }
                _ => Err(AnalysisError::FoldConflict {
                    reason: format!("labels {:?} and {:?} do not agree", a, b),
                }),
            },
            FoldStrategy::ListOfLabels => fold_label_lists(scheme, a, b),
        }
    }
}

fn as_label_list(v: &FieldValue) -> Result<Vec<Label>, AnalysisError> {
    match v {
        FieldValue::Labels(l) => Ok(l.clone()),
        FieldValue::Label(l) => Ok(vec![l.clone()]),
        FieldValue::Text(_) => Err(AnalysisError::FoldConflict {
            reason: "a text cannot be folded as a list of labels".to_string(),
        }),
    }
}

fn fold_label_lists(
    scheme: Option<&CodeScheme>,
    a: &FieldValue,
    b: &FieldValue,
) -> Result<FieldValue, AnalysisError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<Label> = Vec::new();
    for label in as_label_list(a)?.into_iter().chain(as_label_list(b)?) {
        if seen.insert(label.code_id.clone()) {
            merged.push(label);
        }
    }

    if let Some(scheme) = scheme {
        let mut has_normal = false;
        for label in merged.iter() {
            has_normal |= scheme.get_code_with_code_id(&label.code_id)?.is_normal();
        }
        if has_normal {
            let mut kept: Vec<Label> = Vec::new();
            for label in merged {
                let code = scheme.get_code_with_code_id(&label.code_id)?;
                let missing_data = matches!(
                    code.control_code,
                    Some(ControlCode::NotCoded)
                        | Some(ControlCode::TrueMissing)
                        | Some(ControlCode::Skipped)
                );
                if !missing_data {
                    kept.push(label);
                }
            }
            return Ok(FieldValue::Labels(kept));
        }
    }
    Ok(FieldValue::Labels(merged))
}

/// Turns a raw answer into the match value of a code.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Cleaner {
    Gender,
    /// Ages with `min <= age < max`.
    AgeInRange { min: u32, max: u32 },
}

const MALE_WORDS: &[&str] = &[
    "m", "male", "man", "boy", "lab", "wiil", "nin", "mume", "mwanamume", "kiume",
];
const FEMALE_WORDS: &[&str] = &[
    "f", "female", "woman", "girl", "dheddig", "dhedig", "gabar", "naag", "mke", "mwanamke",
    "kike",
];

impl Cleaner {
    pub const NOT_CODED: &'static str = "NC";

    /// Returns the match value for `text`, or `NC` when nothing usable was found.
    pub fn clean(&self, text: &str) -> String {
        match self {
            Cleaner::Gender => clean_gender(text),
            Cleaner::AgeInRange { min, max } => match clean_age(text) {
                Some(age) if *min <= age && age < *max => age.to_string(),
                _ => Cleaner::NOT_CODED.to_string(),
            },
        }
    }
}

fn clean_gender(text: &str) -> String {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();
    let male = words.iter().any(|w| MALE_WORDS.contains(w));
    let female = words.iter().any(|w| FEMALE_WORDS.contains(w));
    match (male, female) {
        (true, false) => "male".to_string(),
        (false, true) => "female".to_string(),
        _ => Cleaner::NOT_CODED.to_string(),
    }
}

// The first run of digits in the text.
fn clean_age(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok()
}
