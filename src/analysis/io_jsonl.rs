// Reads records from JSON Lines files.

use crate::analysis::*;

use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use std::fs;

pub fn read_records(path: &str) -> CliResult<Vec<Record>> {
    info!("Attempting to read records from {:?}", path);
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let mut res: Vec<Record> = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let lineno = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let js: JSValue =
            serde_json::from_str(line).context(ParsingJsonLineSnafu { path, lineno })?;
        match js {
            JSValue::Object(m) => res.push(read_record(&m, path, lineno)?),
            x => {
                whatever!(
                    "{}:{}: expected a JSON object, found {:?}",
                    path,
                    lineno,
                    x
                )
            }
        }
    }
    info!("Read {} records from {:?}", res.len(), path);
    Ok(res)
}

fn read_record(m: &JSMap<String, JSValue>, path: &str, lineno: usize) -> CliResult<Record> {
    let mut record = Record::new();
    for (key, value) in m.iter() {
        let fv = match value {
            JSValue::Null => continue,
            JSValue::String(s) => FieldValue::Text(s.clone()),
            JSValue::Number(n) => FieldValue::Text(n.to_string()),
            JSValue::Bool(b) => FieldValue::Text(b.to_string()),
            JSValue::Object(label) => FieldValue::Label(read_label(label, path, lineno, key)?),
            JSValue::Array(items) => {
                let mut labels: Vec<Label> = Vec::new();
                for item in items.iter() {
                    match item {
                        JSValue::Object(label) => {
                            labels.push(read_label(label, path, lineno, key)?)
                        }
                        x => {
                            whatever!(
                                "{}:{}: field {}: expected a label, found {:?}",
                                path,
                                lineno,
                                key,
                                x
                            )
                        }
                    }
                }
                FieldValue::Labels(labels)
            }
        };
        record.insert(key, fv);
    }
    Ok(record)
}

fn read_label(
    m: &JSMap<String, JSValue>,
    path: &str,
    lineno: usize,
    key: &str,
) -> CliResult<Label> {
    match m.get("CodeID") {
        Some(JSValue::String(code_id)) => Ok(Label::new(code_id)),
        _ => {
            whatever!(
                "{}:{}: field {}: label without a CodeID",
                path,
                lineno,
                key
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> CliResult<Record> {
        match serde_json::from_str::<JSValue>(line).unwrap() {
            JSValue::Object(m) => read_record(&m, "test.jsonl", 1),
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn values_and_labels() {
        let r = parse(
            r#"{"uid": "avf-1", "consent_withdrawn": false, "age_raw": 23, "location_raw": null,
                "gender_coded": {"CodeID": "code-male", "SchemeID": "Scheme-gender"},
                "rqa_s01e01_coded": [{"CodeID": "code-a"}, {"CodeID": "code-b"}]}"#,
        )
        .unwrap();
        assert_eq!(r.text("uid"), Some("avf-1"));
        assert_eq!(r.text("consent_withdrawn"), Some("false"));
        assert!(!r.is_consent_withdrawn("consent_withdrawn"));
        assert_eq!(r.text("age_raw"), Some("23"));
        assert!(!r.contains("location_raw"));
        assert_eq!(
            r.get("gender_coded"),
            Some(&FieldValue::Label(Label::new("code-male")))
        );
        assert_eq!(
            r.get("rqa_s01e01_coded"),
            Some(&FieldValue::Labels(vec![
                Label::new("code-a"),
                Label::new("code-b")
            ]))
        );
    }

    #[test]
    fn labels_need_a_code_id() {
        assert!(parse(r#"{"gender_coded": {"SchemeID": "Scheme-gender"}}"#).is_err());
        assert!(parse(r#"{"rqa_s01e01_coded": ["code-a"]}"#).is_err());
    }
}
