use std::collections::HashMap;

use log::info;

use crate::config::*;
use crate::filters::labelled;
use crate::resolve_codes;

/// Selects the raw messages that can be shared with partners.
///
/// A message is shared when it is fully labelled for its plan and none of its
/// codes is the do-not-share code. It is listed once under each of its codes,
/// in scheme order. Messages under one code are sorted by text.
pub fn safe_to_share(
    messages: &[&Record],
    plans: &[&CodingPlan],
    settings: &AnalysisSettings,
) -> Result<SafeToShare, AnalysisError> {
    let consent = settings.consent_withdrawn_key.as_str();
    let mut res = SafeToShare::default();
    for plan in plans.iter() {
        for cc in plan.coding_configurations.iter() {
            let codes: Vec<&Code> = cc.code_scheme.codes_without_stop().collect();
            let positions: HashMap<&str, usize> = codes
                .iter()
                .enumerate()
                .map(|(idx, c)| (c.code_id.as_str(), idx))
                .collect();
            let mut by_code: Vec<Vec<String>> = vec![Vec::new(); codes.len()];

            for msg in messages.iter() {
                if !labelled(msg, consent, &[*plan])? {
                    continue;
                }
                let msg_codes = resolve_codes(msg, cc)?;
                if msg_codes
                    .iter()
                    .any(|c| c.string_value == settings.do_not_share_code)
                {
                    res.excluded_do_not_share += 1;
                    continue;
                }
                let raw = msg.text(&plan.raw_field).unwrap_or("");
                for code in msg_codes {
                    if let Some(idx) = positions.get(code.code_id.as_str()) {
                        by_code[*idx].push(raw.to_string());
                    }
                }
            }

            for (code, mut raws) in codes.iter().zip(by_code.into_iter()) {
                raws.sort();
                for raw in raws {
                    res.messages.push(SharedMessage {
                        question: plan.dataset_name.clone(),
                        code: code.string_value.clone(),
                        raw_message: raw,
                    });
                }
            }
        }
    }
    info!(
        "Selected {} safe to share messages, excluded {} unsafe to share messages",
        res.messages.len(),
        res.excluded_do_not_share
    );
    Ok(res)
}
