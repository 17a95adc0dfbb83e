//! Consent, labelling and relevance predicates applied to record collections
//! before they are counted.
//!
//! A record takes part in a plan when it carries a non-empty raw field for
//! it. An absent coded field is never an error here: it simply means the
//! record was not labelled for that plan.

use crate::config::{AnalysisError, CodingPlan, ControlCode, FieldValue, Record};
use crate::resolve_value;

/// Whether the respondent behind `record` withdrew consent.
pub fn opt_out(record: &Record, consent_key: &str) -> bool {
    record.is_consent_withdrawn(consent_key)
}

/// Whether the record holds a non-empty value under the raw field of `plan`.
pub fn participated(record: &Record, plan: &CodingPlan) -> bool {
    match record.get(&plan.raw_field) {
        Some(FieldValue::Text(s)) => !s.is_empty(),
        Some(_) => true,
        None => false,
    }
}

/// Whether the record is opted in and takes part in at least one of `plans`.
pub fn opt_in(record: &Record, consent_key: &str, plans: &[&CodingPlan]) -> bool {
    !opt_out(record, consent_key) && plans.iter().any(|p| participated(record, p))
}

/// Whether every configuration of every plan holds at least one reviewed code.
pub fn labelled(
    record: &Record,
    consent_key: &str,
    plans: &[&CodingPlan],
) -> Result<bool, AnalysisError> {
    if !opt_in(record, consent_key, plans) {
        return Ok(false);
    }
    for plan in plans {
        for cc in plan.coding_configurations.iter() {
            let value = match record.get(&cc.coded_field) {
                Some(v) => v,
                None => return Ok(false),
            };
            let codes = resolve_value(value, cc)?;
            if codes.is_empty() {
                return Ok(false);
            }
            if codes
                .iter()
                .any(|c| c.control_code == Some(ControlCode::NotReviewed))
            {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Whether the record holds a normal code under one of the configurations of `plan`.
pub fn relevant(
    record: &Record,
    consent_key: &str,
    plan: &CodingPlan,
) -> Result<bool, AnalysisError> {
    if !opt_in(record, consent_key, &[plan]) {
        return Ok(false);
    }
    for cc in plan.coding_configurations.iter() {
        if let Some(value) = record.get(&cc.coded_field) {
            if resolve_value(value, cc)?.iter().any(|c| c.is_normal()) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

pub fn filter_opt_ins<'a>(
    records: &[&'a Record],
    consent_key: &str,
    plans: &[&CodingPlan],
) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|r| opt_in(r, consent_key, plans))
        .copied()
        .collect()
}

/// The records labelled for all of `plans`.
pub fn filter_fully_labelled<'a>(
    records: &[&'a Record],
    consent_key: &str,
    plans: &[&CodingPlan],
) -> Result<Vec<&'a Record>, AnalysisError> {
    let mut res: Vec<&'a Record> = Vec::new();
    for r in records.iter() {
        if labelled(r, consent_key, plans)? {
            res.push(*r);
        }
    }
    Ok(res)
}

/// The records labelled for at least one of `plans`.
pub fn filter_partially_labelled<'a>(
    records: &[&'a Record],
    consent_key: &str,
    plans: &[&CodingPlan],
) -> Result<Vec<&'a Record>, AnalysisError> {
    let mut res: Vec<&'a Record> = Vec::new();
    for r in records.iter() {
        for plan in plans {
            if labelled(r, consent_key, &[*plan])? {
                res.push(*r);
                break;
            }
        }
    }
    Ok(res)
}

/// The records relevant to at least one of `plans`.
pub fn filter_relevant<'a>(
    records: &[&'a Record],
    consent_key: &str,
    plans: &[&CodingPlan],
) -> Result<Vec<&'a Record>, AnalysisError> {
    let mut res: Vec<&'a Record> = Vec::new();
    for r in records.iter() {
        for plan in plans {
            if relevant(r, consent_key, plan)? {
                res.push(*r);
                break;
            }
        }
    }
    Ok(res)
}
