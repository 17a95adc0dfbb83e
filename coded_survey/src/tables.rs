//! Flat tabular views of the analysis outputs.
//!
//! Cells are already rendered: counts as integers, percentages with one
//! decimal and `-` for every value that cannot be computed.

use crate::config::*;
use crate::themes::ThemeCrossTab;

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: &[&str]) -> Table {
        Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// The SHA-256 of the table, as written in comma separated form.
    pub fn digest(&self) -> String {
        let mut text = self.headers.join(",");
        for row in self.rows.iter() {
            text.push('\n');
            text.push_str(&row.join(","));
        }
        sha256::digest(text)
    }
}

pub fn engagement_table(counts: &[EngagementCounts]) -> Table {
    let mut table = Table::new(&[
        "Episode",
        "Total Messages",
        "Total Messages with Opt-Ins",
        "Total Labelled Messages",
        "Total Relevant Messages",
        "Total Participants",
        "Total Participants with Opt-Ins",
        "Total Relevant Participants",
    ]);
    for c in counts {
        table.rows.push(vec![
            c.episode.clone(),
            c.total_messages.to_string(),
            c.total_messages_opted_in.to_string(),
            c.total_labelled_messages.to_string(),
            c.total_relevant_messages.to_string(),
            c.total_participants.to_string(),
            c.total_participants_opted_in.to_string(),
            c.total_relevant_participants.to_string(),
        ]);
    }
    table
}

pub fn repeat_participations_table(frequencies: &[ParticipationFrequency]) -> Table {
    let mut table = Table::new(&[
        "Episodes Participated In",
        "Number of Individuals",
        "% of Individuals",
    ]);
    for f in frequencies {
        table.rows.push(vec![
            f.episodes_participated_in.to_string(),
            f.number_of_individuals.to_string(),
            f.percent_of_individuals.to_string(),
        ]);
    }
    table
}

/// One row per code of each variable. The first column repeats the variable
/// on every row.
pub fn distributions_table(distributions: &[&VariableDistribution]) -> Table {
    let mut table = Table::new(&["Demographic", "Code", "Number of Individuals"]);
    for d in distributions {
        for (code, count) in d.counts.iter() {
            table
                .rows
                .push(vec![d.variable.clone(), code.clone(), count.to_string()]);
        }
    }
    table
}

pub fn demographic_distributions_table(distributions: &DemographicDistributions) -> Table {
    let refs: Vec<&VariableDistribution> = distributions.variables.iter().collect();
    distributions_table(&refs)
}

/// One row per episode and theme, led by the relevant participants row of
/// the episode. The first column repeats the episode on every row.
pub fn theme_distributions_table(cross_tab: &ThemeCrossTab) -> Table {
    let mut headers = vec!["Question".to_string(), "Variable".to_string()];
    headers.extend(cross_tab.columns.headers());
    let mut table = Table {
        headers,
        rows: Vec::new(),
    };
    for episode in cross_tab.episodes.iter() {
        for row in episode.rows() {
            let mut cells = vec![
                episode.episode.clone(),
                row.label.clone(),
                row.total_participants.to_string(),
                row.total_participants_percent.to_string(),
            ];
            for (count, percent) in row.counts.iter().zip(row.percents.iter()) {
                cells.push(count.to_string());
                cells.push(percent.to_string());
            }
            table.rows.push(cells);
        }
    }
    table
}

pub fn safe_to_share_table(shared: &SafeToShare) -> Table {
    let mut table = Table::new(&["Question", "Code", "Raw Message"]);
    for m in shared.messages.iter() {
        table.rows.push(vec![
            m.question.clone(),
            m.code.clone(),
            m.raw_message.clone(),
        ]);
    }
    table
}
