//! The per-group select/gate/execute loop (spec §4.5-§4.7, §5): runs
//! sequentially within a group to preserve auditable ordering and make
//! interactive prompts coherent.

pub mod backup;
pub mod executor;
pub mod interactive;

use crate::error::ReasonCode;
use crate::gate::{self, GateVerdict};
use crate::keeper::select_survivor;
use crate::types::{ActionOutcome, DigestGroup, RunConfig};

use interactive::{InteractiveChoice, Prompter};

/// Resolve one group end to end: pick the survivor, then walk the
/// non-survivor members in lexicographic-path order (spec §5 "Ordering
/// guarantees"), running gate -> (interactive prompt) -> executor for each.
///
/// `prompter` is consulted only when `cfg.interactive` is set. Once it
/// returns `ApplyToAllRemaining`, the chosen action is frozen for the rest
/// of this group *and* signalled back to the caller via the returned bool
/// so the run controller can freeze it for the rest of the run.
pub fn resolve_group(
    cfg: &RunConfig,
    group: &DigestGroup,
    prompter: Option<&mut dyn Prompter>,
) -> (Vec<ActionOutcome>, bool) {
    let records = group.records.clone();
    let mut survivor_idx = select_survivor(&records, &cfg.keep_strategy);

    let mut targets: Vec<usize> = (0..records.len()).filter(|&i| i != survivor_idx).collect();
    targets.sort_by(|&a, &b| records[a].path.cmp(&records[b].path));

    let mut outcomes = Vec::with_capacity(targets.len());
    // Once set, stop prompting and apply `cfg.action` to every remaining
    // target in this group (spec §4.7 "apply-to-all-remaining freezes the
    // user's choice for the rest of the run").
    let mut stop_prompting = false;
    let mut froze_for_run = false;
    let mut prompter = prompter;

    let mut i = 0;
    while i < targets.len() {
        let target_idx = targets[i];
        if target_idx == survivor_idx {
            i += 1;
            continue;
        }
        let verdict = gate::check(cfg, &records[target_idx], &records[survivor_idx]);
        let GateVerdict::Allowed = verdict else {
            let GateVerdict::Refused(reason) = verdict else {
                unreachable!()
            };
            // `--skip-system`: drop system-policy refusals entirely rather
            // than recording each one (spec §6 "skip-system, force-system |
            // safety policy") — the operator already expects system paths
            // to be excluded and doesn't want them cluttering the audit log.
            if !(cfg.skip_system && reason == ReasonCode::GateSystem) {
                outcomes.push(ActionOutcome {
                    path: records[target_idx].path.clone(),
                    group_id: group.id,
                    intended: cfg.action,
                    effected: None,
                    bytes_reclaimed: 0,
                    failure_reason: Some(reason),
                    backup_path: None,
                    dry_run: cfg.dry_run,
                });
            }
            i += 1;
            continue;
        };

        let mut effective_cfg = cfg.clone();
        if cfg.interactive && !stop_prompting {
            let choice = match prompter.as_deref_mut() {
                Some(p) => p.prompt(&records[survivor_idx], &records[target_idx]),
                None => InteractiveChoice::Delete,
            };
            match choice {
                InteractiveChoice::Quit => break,
                InteractiveChoice::Skip => {
                    i += 1;
                    continue;
                }
                InteractiveChoice::View | InteractiveChoice::Info => {
                    // No action taken; the caller's prompter already rendered
                    // the requested detail. Re-prompt the same target.
                    continue;
                }
                InteractiveChoice::SwapKeep => {
                    survivor_idx = target_idx;
                    targets = (0..records.len())
                        .filter(|&idx| idx != survivor_idx)
                        .collect();
                    targets.sort_by(|&a, &b| records[a].path.cmp(&records[b].path));
                    i = 0;
                    continue;
                }
                InteractiveChoice::ApplyToAllRemaining => {
                    stop_prompting = true;
                    froze_for_run = true;
                }
                _ => {}
            }
            if let Some(action) = choice.as_action() {
                effective_cfg.action = action;
            }
        }

        outcomes.push(executor::execute(
            &effective_cfg,
            group.id,
            &records[target_idx],
            &records[survivor_idx],
        ));
        i += 1;
    }

    (outcomes, froze_for_run)
}
