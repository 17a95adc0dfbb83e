use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};

use crate::config::*;
use crate::resolve_codes_without_stop;

/// The label of the first row of every episode.
pub const TOTAL_RELEVANT_PARTICIPANTS: &str = "Total Relevant Participants";
pub const TOTAL_PARTICIPANTS: &str = "Total Participants";

/// One demographic code, as a column of the cross-tabulation.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DemographicColumn {
    pub variable: String,
    pub code: String,
}

impl DemographicColumn {
    pub fn header(&self) -> String {
        format!("{}:{}", self.variable, self.code)
    }
}

/// The columns shared by every row of the cross-tabulation.
///
/// Columns follow the demographic plan order, then the scheme order of the
/// codes inside each demographic variable. STOP codes have no column.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnTemplate {
    columns: Vec<DemographicColumn>,
    // One entry per demographic configuration: code id -> column index.
    sources: Vec<(CodingConfiguration, HashMap<String, usize>)>,
}

impl ColumnTemplate {
    pub fn new(demographic_plans: &[&CodingPlan]) -> ColumnTemplate {
        let mut columns: Vec<DemographicColumn> = Vec::new();
        let mut sources: Vec<(CodingConfiguration, HashMap<String, usize>)> = Vec::new();
        for plan in demographic_plans.iter() {
            for (cc, key) in plan.analysis_configurations() {
                let mut positions: HashMap<String, usize> = HashMap::new();
                for code in cc.code_scheme.codes_without_stop() {
                    positions.insert(code.code_id.clone(), columns.len());
                    columns.push(DemographicColumn {
                        variable: key.to_string(),
                        code: code.string_value.clone(),
                    });
                }
                sources.push((cc.clone(), positions));
            }
        }
        ColumnTemplate { columns, sources }
    }

    pub fn columns(&self) -> &[DemographicColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The position of the column named `variable:code`.
    pub fn position(&self, header: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.header() == header)
    }

    /// The column headers, each count followed by its percentage.
    pub fn headers(&self) -> Vec<String> {
        let mut res = vec![TOTAL_PARTICIPANTS.to_string(), format!("{} %", TOTAL_PARTICIPANTS)];
        for c in self.columns.iter() {
            let h = c.header();
            res.push(h.clone());
            res.push(format!("{} %", h));
        }
        res
    }

    /// The columns an individual falls in.
    fn positions_of(&self, individual: &Record) -> Result<Vec<usize>, AnalysisError> {
        let mut res: Vec<usize> = Vec::new();
        for (cc, positions) in self.sources.iter() {
            for code in resolve_codes_without_stop(individual, cc)? {
                if let Some(idx) = positions.get(&code.code_id) {
                    res.push(*idx);
                }
            }
        }
        Ok(res)
    }
}

/// One row of counts over the column template, with its percentages.
#[derive(PartialEq, Debug, Clone)]
pub struct CrossTabRow {
    pub label: String,
    pub total_participants: u64,
    pub total_participants_percent: Percentage,
    pub counts: Vec<u64>,
    pub percents: Vec<Percentage>,
}

impl CrossTabRow {
    fn new(label: String, width: usize) -> CrossTabRow {
        CrossTabRow {
            label,
            total_participants: 0,
            total_participants_percent: Percentage::Undefined,
            counts: vec![0; width],
            percents: vec![Percentage::Undefined; width],
        }
    }

    fn add(&mut self, positions: &[usize]) {
        self.total_participants += 1;
        for idx in positions {
            self.counts[*idx] += 1;
        }
    }
}

/// The row of one theme: a normal code of the episode.
#[derive(PartialEq, Debug, Clone)]
pub struct ThemeRow {
    /// The string value of the code.
    pub theme: String,
    pub row: CrossTabRow,
}

#[derive(PartialEq, Debug, Clone)]
pub struct EpisodeCrossTab {
    /// The raw field of the plan.
    pub episode: String,
    pub columns: Arc<ColumnTemplate>,
    pub relevant: CrossTabRow,
    pub themes: Vec<ThemeRow>,
}

impl EpisodeCrossTab {
    /// The relevant participants row, then the theme rows.
    pub fn rows(&self) -> impl Iterator<Item = &CrossTabRow> {
        std::iter::once(&self.relevant).chain(self.themes.iter().map(|t| &t.row))
    }

    pub fn row(&self, label: &str) -> Option<&CrossTabRow> {
        self.rows().find(|r| r.label == label)
    }

    /// The count of the row `label` in the column `variable:code`.
    pub fn count(&self, label: &str, header: &str) -> Option<u64> {
        let idx = self.columns.position(header)?;
        self.row(label).map(|r| r.counts[idx])
    }

    pub fn percent(&self, label: &str, header: &str) -> Option<Percentage> {
        let idx = self.columns.position(header)?;
        self.row(label).map(|r| r.percents[idx])
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct ThemeCrossTab {
    pub columns: Arc<ColumnTemplate>,
    pub episodes: Vec<EpisodeCrossTab>,
}

impl ThemeCrossTab {
    pub fn get(&self, episode: &str) -> Option<&EpisodeCrossTab> {
        self.episodes.iter().find(|e| e.episode == episode)
    }
}

// The theme rows of a plan and, for each configuration, the row of each normal code.
fn theme_rows(
    plan: &CodingPlan,
    width: usize,
) -> Result<(Vec<ThemeRow>, Vec<HashMap<String, usize>>), AnalysisError> {
    let mut rows: Vec<ThemeRow> = Vec::new();
    let mut lookups: Vec<HashMap<String, usize>> = Vec::new();
    for cc in plan.coding_configurations.iter() {
        if cc.coding_mode != CodingMode::Multiple {
            return Err(AnalysisError::UnsupportedCodingMode {
                plan: plan.raw_field.clone(),
                mode: cc.coding_mode,
            });
        }
        let key = cc
            .analysis_file_key
            .as_deref()
            .ok_or_else(|| AnalysisError::MissingAnalysisFileKey {
                plan: plan.raw_field.clone(),
            })?;
        let mut lookup: HashMap<String, usize> = HashMap::new();
        for code in cc.code_scheme.codes().iter().filter(|c| c.is_normal()) {
            lookup.insert(code.code_id.clone(), rows.len());
            rows.push(ThemeRow {
                theme: code.string_value.clone(),
                row: CrossTabRow::new(format!("{}{}", key, code.string_value), width),
            });
        }
        lookups.push(lookup);
    }
    Ok((rows, lookups))
}

fn set_percentages(relevant: &mut CrossTabRow, themes: &mut [ThemeRow]) {
    let total = relevant.total_participants;
    relevant.total_participants_percent = Percentage::of(total, total);
    relevant.percents = relevant
        .counts
        .iter()
        .map(|c| Percentage::of(*c, total))
        .collect();
    for theme in themes.iter_mut() {
        let row = &mut theme.row;
        row.total_participants_percent = Percentage::of(row.total_participants, total);
        row.percents = row
            .counts
            .iter()
            .zip(relevant.counts.iter())
            .map(|(c, denominator)| Percentage::of(*c, *denominator))
            .collect();
    }
}

fn cross_tabulate_episode(
    plan: &CodingPlan,
    columns: &Arc<ColumnTemplate>,
    individuals: &[(&Record, Vec<usize>)],
) -> Result<EpisodeCrossTab, AnalysisError> {
    let width = columns.len();
    let (mut themes, lookups) = theme_rows(plan, width)?;
    let mut relevant = CrossTabRow::new(TOTAL_RELEVANT_PARTICIPANTS.to_string(), width);

    for (ind, positions) in individuals.iter() {
        let mut is_relevant = false;
        for (cc, lookup) in plan.coding_configurations.iter().zip(lookups.iter()) {
            for code in resolve_codes_without_stop(ind, cc)? {
                if let Some(idx) = lookup.get(&code.code_id) {
                    themes[*idx].row.add(positions);
                    is_relevant = true;
                }
            }
        }
        if is_relevant {
            relevant.add(positions);
        }
    }
    set_percentages(&mut relevant, &mut themes);
    debug!(
        "cross_tabulate_episode: {}: {} relevant participants, {} themes",
        plan.raw_field,
        relevant.total_participants,
        themes.len()
    );

    Ok(EpisodeCrossTab {
        episode: plan.raw_field.clone(),
        columns: columns.clone(),
        relevant,
        themes,
    })
}

/// Cross-tabulates the themes of each episode plan against the demographic
/// codes of the opted-in individuals.
///
/// The percentages of the relevant participants row are taken over its own
/// total. The percentages of a theme row are taken over the matching column
/// of the relevant participants row: they read as "of the relevant
/// participants with this demographic code, the share that holds the theme".
pub fn cross_tabulate_themes(
    individuals: &[&Record],
    episode_plans: &[&CodingPlan],
    demographic_plans: &[&CodingPlan],
    settings: &AnalysisSettings,
) -> Result<ThemeCrossTab, AnalysisError> {
    let columns = Arc::new(ColumnTemplate::new(demographic_plans));
    info!(
        "Cross-tabulating {} episodes over {} demographic columns",
        episode_plans.len(),
        columns.len()
    );

    let mut opted_in: Vec<(&Record, Vec<usize>)> = Vec::new();
    for ind in individuals.iter() {
        if ind.is_consent_withdrawn(&settings.consent_withdrawn_key) {
            continue;
        }
        opted_in.push((*ind, columns.positions_of(ind)?));
    }

    let mut episodes: Vec<EpisodeCrossTab> = Vec::new();
    for plan in episode_plans.iter() {
        episodes.push(cross_tabulate_episode(plan, &columns, &opted_in)?);
    }
    Ok(ThemeCrossTab { columns, episodes })
}
