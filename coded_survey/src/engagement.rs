use log::{debug, info};

use crate::config::*;
use crate::filters::{
    filter_fully_labelled, filter_opt_ins, filter_partially_labelled, filter_relevant,
    participated,
};

/// The label of the row that aggregates every episode.
pub const TOTAL_EPISODE: &str = "Total";

/// Counts messages and participants for each episode, then for all the
/// episodes together.
///
/// The per-episode rows cannot report raw message or participant totals
/// because the raw values of opted-out respondents were overwritten upstream,
/// so these cells are `Tally::Unavailable`. The last row counts every record
/// once, however many episodes it takes part in.
pub fn compute_engagement_counts(
    messages: &[&Record],
    individuals: &[&Record],
    rqa_plans: &[&CodingPlan],
    settings: &AnalysisSettings,
) -> Result<Vec<EngagementCounts>, AnalysisError> {
    let consent = settings.consent_withdrawn_key.as_str();
    let mut res: Vec<EngagementCounts> = Vec::new();
    for plan in rqa_plans.iter() {
        let plans = [*plan];
        let counts = EngagementCounts {
            episode: plan.dataset_name.clone(),
            total_messages: Tally::Unavailable,
            total_messages_opted_in: filter_opt_ins(messages, consent, &plans).len() as u64,
            total_labelled_messages: filter_fully_labelled(messages, consent, &plans)?.len() as u64,
            total_relevant_messages: filter_relevant(messages, consent, &plans)?.len() as u64,
            total_participants: Tally::Unavailable,
            total_participants_opted_in: filter_opt_ins(individuals, consent, &plans).len() as u64,
            total_relevant_participants: filter_relevant(individuals, consent, &plans)?.len()
                as u64,
        };
        debug!("compute_engagement_counts: {:?}", counts);
        res.push(counts);
    }

    let total = EngagementCounts {
        episode: TOTAL_EPISODE.to_string(),
        total_messages: Tally::Count(messages.len() as u64),
        total_messages_opted_in: filter_opt_ins(messages, consent, rqa_plans).len() as u64,
        total_labelled_messages: filter_partially_labelled(messages, consent, rqa_plans)?.len()
            as u64,
        total_relevant_messages: filter_relevant(messages, consent, rqa_plans)?.len() as u64,
        total_participants: Tally::Count(individuals.len() as u64),
        total_participants_opted_in: filter_opt_ins(individuals, consent, rqa_plans).len() as u64,
        total_relevant_participants: filter_relevant(individuals, consent, rqa_plans)?.len()
            as u64,
    };
    info!(
        "Engagement: {} messages, {} participants, {} relevant participants",
        messages.len(),
        individuals.len(),
        total.total_relevant_participants
    );
    res.push(total);
    Ok(res)
}

/// Distributes the opted-in individuals by the number of episodes they sent
/// a message to, for `1..=rqa_plans.len()` episodes.
///
/// An opted-in individual without any episode is a data-integrity violation.
pub fn compute_repeat_participations(
    individuals: &[&Record],
    rqa_plans: &[&CodingPlan],
    settings: &AnalysisSettings,
) -> Result<Vec<ParticipationFrequency>, AnalysisError> {
    let mut counts: Vec<u64> = vec![0; rqa_plans.len()];
    let mut opted_in: u64 = 0;
    for ind in individuals.iter() {
        if ind.is_consent_withdrawn(&settings.consent_withdrawn_key) {
            continue;
        }
        let episodes = rqa_plans.iter().filter(|p| participated(ind, p)).count();
        if episodes == 0 {
            return Err(AnalysisError::NoParticipation {
                individual: ind
                    .text(&settings.individual_id_key)
                    .unwrap_or("<unknown>")
                    .to_string(),
            });
        }
        counts[episodes - 1] += 1;
        opted_in += 1;
    }
    debug!(
        "compute_repeat_participations: {} opted-in individuals: {:?}",
        opted_in, counts
    );

    Ok(counts
        .iter()
        .enumerate()
        .map(|(idx, c)| ParticipationFrequency {
            episodes_participated_in: idx + 1,
            number_of_individuals: *c,
            percent_of_individuals: Percentage::of(*c, opted_in),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{RecordBuilder, SchemeBuilder};

    const CONSENT: &str = "consent_withdrawn";

    fn episode(n: u32) -> CodingPlan {
        let scheme = SchemeBuilder::new("Scheme-rqa", "rqa")
            .normal("code-a", "A", &[])
            .normal("code-b", "B", &[])
            .control("code-stop", "STOP", ControlCode::Stop)
            .build_shared();
        let cc = CodingConfiguration::new(
            CodingMode::Multiple,
            scheme,
            &format!("rqa_e{}_coded", n),
            Some(format!("rqa_e{}_", n).as_str()),
            FoldStrategy::ListOfLabels,
        );
        CodingPlan::new(
            &format!("rqa_e{}_raw", n),
            &format!("e{}", n),
            vec![cc],
            FoldStrategy::Concatenate,
        )
    }

    fn individual(uid: &str, withdrawn: bool, episodes: &[(u32, &str)]) -> Record {
        let mut b = RecordBuilder::new()
            .text("uid", uid)
            .consent_withdrawn(CONSENT, withdrawn);
        for (n, code) in episodes {
            b = b
                .text(&format!("rqa_e{}_raw", n), "some text")
                .labels(&format!("rqa_e{}_coded", n), &[*code]);
        }
        b.build()
    }

    #[test]
    fn engagement_rows_and_total() {
        let e1 = episode(1);
        let e2 = episode(2);
        let plans = [&e1, &e2];
        let i1 = individual("i1", false, &[(1, "code-a"), (2, "code-b")]);
        let i2 = individual("i2", false, &[(2, "code-stop")]);
        let i3 = individual("i3", true, &[(1, "code-a")]);
        let individuals = vec![&i1, &i2, &i3];

        let counts =
            compute_engagement_counts(&[], &individuals, &plans, &AnalysisSettings::default())
                .unwrap();
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[0].episode, "e1");
        assert_eq!(counts[0].total_participants, Tally::Unavailable);
        assert_eq!(counts[0].total_participants_opted_in, 1);
        assert_eq!(counts[1].total_participants_opted_in, 2);
        assert_eq!(counts[1].total_relevant_participants, 1);

        let total = &counts[2];
        assert_eq!(total.episode, TOTAL_EPISODE);
        assert_eq!(total.total_participants, Tally::Count(3));
        assert_eq!(total.total_participants_opted_in, 2);
        // i1 is relevant to both episodes and counted once.
        assert_eq!(total.total_relevant_participants, 1);
    }

    #[test]
    fn histogram_conserves_opted_in_individuals() {
        let e1 = episode(1);
        let e2 = episode(2);
        let e3 = episode(3);
        let plans = [&e1, &e2, &e3];
        let i1 = individual("i1", false, &[(1, "code-a"), (2, "code-b")]);
        let i2 = individual("i2", false, &[(2, "code-stop")]);
        let i3 = individual("i3", false, &[(3, "code-a")]);
        let i4 = individual("i4", true, &[]);
        let individuals = vec![&i1, &i2, &i3, &i4];

        let hist =
            compute_repeat_participations(&individuals, &plans, &AnalysisSettings::default())
                .unwrap();
        assert_eq!(hist.len(), 3);
        let total: u64 = hist.iter().map(|f| f.number_of_individuals).sum();
        assert_eq!(total, 3);
        assert_eq!(hist[0].number_of_individuals, 2);
        assert_eq!(hist[0].percent_of_individuals, Percentage::Value(66.7));
        assert_eq!(hist[1].percent_of_individuals, Percentage::Value(33.3));
        assert_eq!(hist[2].number_of_individuals, 0);
        assert_eq!(hist[2].percent_of_individuals, Percentage::Value(0.0));
    }

    #[test]
    fn histogram_rejects_silent_individuals() {
        let e1 = episode(1);
        let silent = individual("silent", false, &[]);
        let res =
            compute_repeat_participations(&[&silent], &[&e1], &AnalysisSettings::default());
        assert_eq!(
            res,
            Err(AnalysisError::NoParticipation {
                individual: "silent".to_string()
            })
        );
    }

    #[test]
    fn histogram_of_withdrawn_only_is_undefined() {
        let e1 = episode(1);
        let gone = individual("gone", true, &[]);
        let hist =
            compute_repeat_participations(&[&gone], &[&e1], &AnalysisSettings::default()).unwrap();
        assert_eq!(hist[0].number_of_individuals, 0);
        assert_eq!(hist[0].percent_of_individuals, Percentage::Undefined);
    }
}
