// Reads code schemes exported by the coding tool.

use crate::analysis::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SchemeFile {
    #[serde(rename = "SchemeID")]
    pub scheme_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version")]
    pub version: Option<String>,
    #[serde(rename = "Codes")]
    pub codes: Vec<CodeEntry>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CodeEntry {
    #[serde(rename = "CodeID")]
    pub code_id: String,
    #[serde(rename = "CodeType")]
    pub code_type: String,
    #[serde(rename = "ControlCode")]
    pub control_code: Option<String>,
    #[serde(rename = "DisplayText")]
    pub display_text: Option<String>,
    #[serde(rename = "StringValue")]
    pub string_value: String,
    #[serde(rename = "MatchValues")]
    pub match_values: Option<Vec<String>>,
}

impl SchemeFile {
    pub fn to_scheme(&self) -> CliResult<CodeScheme> {
        let mut codes: Vec<Code> = Vec::new();
        for entry in self.codes.iter() {
            codes.push(self.to_code(entry)?);
        }
        Ok(CodeScheme::new(
            &self.scheme_id,
            &self.name,
            self.version.as_deref().unwrap_or("0.0.0"),
            codes,
        ))
    }

    fn to_code(&self, entry: &CodeEntry) -> CliResult<Code> {
        let code_type = match entry.code_type.as_str() {
            "Normal" => CodeType::Normal,
            "Control" => CodeType::Control,
            "Meta" => CodeType::Meta,
            x => {
                whatever!(
                    "Scheme {}: code {} has unknown code type {:?}",
                    self.scheme_id,
                    entry.code_id,
                    x
                )
            }
        };
        let control_code = match (code_type, &entry.control_code) {
            (CodeType::Control, Some(cc)) => Some(ControlCode::from_label(cc)),
            (CodeType::Control, None) => {
                whatever!(
                    "Scheme {}: control code {} has no ControlCode",
                    self.scheme_id,
                    entry.code_id
                )
            }
            _ => None,
        };
        Ok(Code {
            code_id: entry.code_id.clone(),
            code_type,
            control_code,
            string_value: entry.string_value.clone(),
            display_text: entry
                .display_text
                .clone()
                .unwrap_or_else(|| entry.string_value.clone()),
            match_values: entry.match_values.clone().unwrap_or_default(),
        })
    }
}

pub fn read_scheme(path: &Path) -> CliResult<CodeScheme> {
    let p = path.display().to_string();
    debug!("Reading code scheme {:?}", p);
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path: p.clone() })?;
    let js: SchemeFile =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path: p })?;
    js.to_scheme()
}

/// Loads the schemes of a directory by file stem. Each scheme is read once
/// and shared between all the plans that use it.
pub struct SchemeRegistry {
    dir: PathBuf,
    schemes: HashMap<String, Arc<CodeScheme>>,
}

impl SchemeRegistry {
    pub fn new(dir: &Path) -> SchemeRegistry {
        SchemeRegistry {
            dir: dir.to_path_buf(),
            schemes: HashMap::new(),
        }
    }

    pub fn get(&mut self, stem: &str) -> CliResult<Arc<CodeScheme>> {
        if let Some(scheme) = self.schemes.get(stem) {
            return Ok(scheme.clone());
        }
        let scheme = Arc::new(read_scheme(&io_common::output_path(
            &self.dir, stem, "json",
        ))?);
        self.schemes.insert(stem.to_string(), scheme.clone());
        Ok(scheme)
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }
}
