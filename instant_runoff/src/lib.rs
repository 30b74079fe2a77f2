mod model;
pub mod builder;
pub mod manual;

use log::{debug, info};

use std::collections::{HashMap, HashSet};

pub use crate::model::*;

// **** Private structures ****

type RoundId = u32;

/// Index of an option in registration order.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct OptionId(u32);

/// A normalized ballot: distinct options in preference order, most preferred
/// first. May be empty, which records an explicit abstention.
///
/// Ballots are anonymous. Once built by [`normalize_ballots`] they are only
/// ever read.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Default)]
pub struct Ballot {
    prefs: Vec<OptionId>,
}

impl Ballot {
    pub fn is_abstention(&self) -> bool {
        self.prefs.is_empty()
    }

    pub fn rank_count(&self) -> usize {
        self.prefs.len()
    }
}

/// Runs the full tally for the given options and raw submissions.
///
/// Equivalent to [`normalize_ballots`] followed by [`tabulate`].
pub fn run_tally(
    options: &[VoteOption],
    submissions: &[Submission],
) -> Result<TallyResult, TallyError> {
    info!(
        "run_tally: processing {:?} submissions over {:?} options",
        submissions.len(),
        options.len()
    );
    let ballots = normalize_ballots(options, submissions)?;
    tabulate(options, &ballots)
}

/// Converts raw submissions into the internal ballot set.
///
/// Submission order becomes preference order. A submission referencing an
/// option outside the registered set, or ranking the same option twice, is an
/// error rather than something to repair: the submission layer is expected to
/// have rejected it already.
pub fn normalize_ballots(
    options: &[VoteOption],
    submissions: &[Submission],
) -> Result<Vec<Ballot>, TallyError> {
    let index = option_index(options)?;

    let mut ballots: Vec<Ballot> = Vec::with_capacity(submissions.len());
    for sub in submissions.iter() {
        let mut prefs: Vec<OptionId> = Vec::with_capacity(sub.ranking.len());
        let mut seen: HashSet<OptionId> = HashSet::new();
        for opt_ref in sub.ranking.iter() {
            let oid = match index.get(opt_ref.as_str()) {
                Some(oid) => *oid,
                None => {
                    return Err(TallyError::UnknownOption {
                        submission: sub.id.clone(),
                        option: opt_ref.clone(),
                    })
                }
            };
            if !seen.insert(oid) {
                return Err(TallyError::DuplicateRanking {
                    submission: sub.id.clone(),
                    option: opt_ref.clone(),
                });
            }
            prefs.push(oid);
        }
        debug!("normalize_ballots: submission {:?} -> {:?}", sub.id, prefs);
        ballots.push(Ballot { prefs });
    }
    Ok(ballots)
}

/// Runs the elimination loop over a normalized ballot set.
///
/// Pure and deterministic: the same input always produces the same
/// [`TallyResult`], so a caller that failed to persist a result simply runs
/// the tally again. Terminates within one round per option.
pub fn tabulate(options: &[VoteOption], ballots: &[Ballot]) -> Result<TallyResult, TallyError> {
    option_index(options)?;
    let num_options = options.len() as u32;

    // The ballots normally come straight from the normalizer, but a corrupt
    // set must fail loudly rather than tally wrong.
    for (ix, ballot) in ballots.iter().enumerate() {
        let mut seen: HashSet<OptionId> = HashSet::new();
        for oid in ballot.prefs.iter() {
            if oid.0 >= num_options || !seen.insert(*oid) {
                return Err(TallyError::MalformedBallot { ballot: ix });
            }
        }
    }

    let total_ballots = ballots.len() as u64;
    let ranked: Vec<&Ballot> = ballots.iter().filter(|b| !b.prefs.is_empty()).collect();
    let ranked_ballots = ranked.len() as u64;
    // Majority over ranked ballots only, so abstentions cannot block a win.
    let majority_threshold = (ranked_ballots + 1) / 2;

    info!(
        "tabulate: {:?} ballots ({:?} ranked), majority threshold {:?}",
        total_ballots, ranked_ballots, majority_threshold
    );
    for (ix, opt) in options.iter().enumerate() {
        info!("Option {}: {}", ix + 1, opt.label);
    }

    let mut eliminated: HashSet<OptionId> = HashSet::new();
    let mut rounds: Vec<RoundRecord> = Vec::new();

    let outcome = loop {
        // Each round eliminates one option, so one round per option is
        // already the ceiling.
        if rounds.len() >= options.len() {
            return Err(TallyError::NoConvergence);
        }
        let round_id = rounds.len() as RoundId + 1;
        let remaining: Vec<OptionId> = (0..num_options)
            .map(OptionId)
            .filter(|oid| !eliminated.contains(oid))
            .collect();
        info!(
            "tabulate: round {:?}: {:?} options remaining",
            round_id,
            remaining.len()
        );

        if let [survivor] = remaining.as_slice() {
            // Whittled down to one option: it wins by default. Its tally is
            // the number of ranked ballots that list it at any rank.
            let support = ranked
                .iter()
                .filter(|b| b.prefs.contains(survivor))
                .count() as u64;
            let winner = options[survivor.0 as usize].id.clone();
            info!(
                "tabulate: round {:?}: {:?} is the last option standing",
                round_id, winner
            );
            rounds.push(RoundRecord {
                round: round_id,
                tally: vec![(winner.clone(), support)],
                eliminated: None,
                winner: Some(winner.clone()),
            });
            break Outcome::LastStanding { winner };
        }

        let tally = first_preference_tally(&ranked, &remaining, &eliminated);
        debug!("tabulate: round {:?} tally: {:?}", round_id, tally);

        let max_count = tally.iter().map(|(_, c)| *c).max().unwrap();
        let min_count = tally.iter().map(|(_, c)| *c).min().unwrap();

        let leaders: Vec<OptionId> = tally
            .iter()
            .filter(|(_, c)| *c == max_count)
            .map(|(oid, _)| *oid)
            .collect();
        if leaders.len() == 1 && max_count >= majority_threshold {
            let winner = options[leaders[0].0 as usize].id.clone();
            info!(
                "tabulate: round {:?}: {:?} reaches the majority with {:?} votes",
                round_id, winner, max_count
            );
            rounds.push(RoundRecord {
                round: round_id,
                tally: public_tally(options, &tally),
                eliminated: None,
                winner: Some(winner.clone()),
            });
            break Outcome::Majority { winner };
        }

        if min_count == max_count {
            // Every remaining option holds the same count. Without this
            // short-circuit the loop could never terminate. The earliest
            // registered option is named for display only.
            let nominal_winner = options[remaining[0].0 as usize].id.clone();
            info!(
                "tabulate: round {:?}: all {:?} remaining options tied at {:?}",
                round_id,
                remaining.len(),
                max_count
            );
            rounds.push(RoundRecord {
                round: round_id,
                tally: public_tally(options, &tally),
                eliminated: None,
                winner: Some(nominal_winner.clone()),
            });
            break Outcome::Tie {
                nominal_winner,
                tied: remaining
                    .iter()
                    .map(|oid| options[oid.0 as usize].id.clone())
                    .collect(),
            };
        }

        // Eliminate the weakest option. The tally is in registration order,
        // so the first minimum is the earliest registered of any tied set.
        let loser = tally
            .iter()
            .find(|(_, c)| *c == min_count)
            .map(|(oid, _)| *oid)
            .unwrap();
        let (transfers, exhausted) = transfer_stats(options, &ranked, &eliminated, loser);
        info!(
            "tabulate: round {:?}: eliminating {:?} with {:?} votes ({:?} exhausted)",
            round_id, options[loser.0 as usize].id, min_count, exhausted
        );
        rounds.push(RoundRecord {
            round: round_id,
            tally: public_tally(options, &tally),
            eliminated: Some(EliminationRecord {
                option: options[loser.0 as usize].id.clone(),
                transfers,
                exhausted,
            }),
            winner: None,
        });
        eliminated.insert(loser);
    };

    Ok(TallyResult {
        total_ballots,
        ranked_ballots,
        majority_threshold,
        rounds,
        outcome,
    })
}

/// Validates the option registration and maps option ids to their index.
fn option_index(options: &[VoteOption]) -> Result<HashMap<&str, OptionId>, TallyError> {
    if options.is_empty() {
        return Err(TallyError::EmptyOptionSet);
    }
    let mut index: HashMap<&str, OptionId> = HashMap::with_capacity(options.len());
    for (ix, opt) in options.iter().enumerate() {
        if index.insert(opt.id.as_str(), OptionId(ix as u32)).is_some() {
            return Err(TallyError::DuplicateOption {
                option: opt.id.clone(),
            });
        }
    }
    Ok(index)
}

/// Counts the first surviving preference of every ranked ballot.
///
/// Built fresh every round. Ballots whose whole preference list has been
/// eliminated count for no one. The result is in registration order.
fn first_preference_tally(
    ranked: &[&Ballot],
    remaining: &[OptionId],
    eliminated: &HashSet<OptionId>,
) -> Vec<(OptionId, u64)> {
    let mut counts: HashMap<OptionId, u64> = remaining.iter().map(|oid| (*oid, 0)).collect();
    for ballot in ranked.iter() {
        if let Some(first) = ballot.prefs.iter().find(|oid| !eliminated.contains(*oid)) {
            if let Some(c) = counts.get_mut(first) {
                *c += 1;
            }
        }
    }
    remaining.iter().map(|oid| (*oid, counts[oid])).collect()
}

/// For every ballot currently counting for `loser`, finds where it goes once
/// `loser` is eliminated. Returns the per-option transfers in registration
/// order and the number of exhausted ballots.
fn transfer_stats(
    options: &[VoteOption],
    ranked: &[&Ballot],
    eliminated: &HashSet<OptionId>,
    loser: OptionId,
) -> (Vec<(String, u64)>, u64) {
    let mut gains: HashMap<OptionId, u64> = HashMap::new();
    let mut exhausted: u64 = 0;
    for ballot in ranked.iter() {
        let first = ballot.prefs.iter().find(|oid| !eliminated.contains(*oid));
        if first != Some(&loser) {
            continue;
        }
        let next = ballot
            .prefs
            .iter()
            .find(|oid| !eliminated.contains(*oid) && **oid != loser);
        match next {
            Some(next) => *gains.entry(*next).or_insert(0) += 1,
            None => exhausted += 1,
        }
    }
    let transfers: Vec<(String, u64)> = (0..options.len() as u32)
        .map(OptionId)
        .filter_map(|oid| {
            gains
                .get(&oid)
                .map(|c| (options[oid.0 as usize].id.clone(), *c))
        })
        .collect();
    (transfers, exhausted)
}

fn public_tally(options: &[VoteOption], tally: &[(OptionId, u64)]) -> Vec<(String, u64)> {
    tally
        .iter()
        .map(|(oid, c)| (options[oid.0 as usize].id.clone(), *c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn options(names: &[&str]) -> Vec<VoteOption> {
        names
            .iter()
            .map(|n| VoteOption {
                id: n.to_string(),
                label: n.to_string(),
            })
            .collect()
    }

    fn submissions(rankings: &[&[&str]]) -> Vec<Submission> {
        rankings
            .iter()
            .enumerate()
            .map(|(ix, r)| Submission {
                id: format!("sub-{:03}", ix + 1),
                ranking: r.iter().map(|s| s.to_string()).collect(),
            })
            .collect()
    }

    fn counts(pairs: &[(&str, u64)]) -> Vec<(String, u64)> {
        pairs.iter().map(|(n, c)| (n.to_string(), *c)).collect()
    }

    #[test]
    fn two_way_tie_names_earliest_option() {
        init_logs();
        let opts = options(&["picnic", "bowling"]);
        let mut rankings: Vec<&[&str]> = Vec::new();
        for _ in 0..5 {
            rankings.push(&["picnic"]);
        }
        for _ in 0..5 {
            rankings.push(&["bowling"]);
        }
        rankings.push(&[]);

        let res = run_tally(&opts, &submissions(&rankings)).unwrap();
        assert_eq!(res.total_ballots, 11);
        assert_eq!(res.ranked_ballots, 10);
        assert_eq!(res.majority_threshold, 5);
        assert_eq!(res.rounds.len(), 1);

        let round = &res.rounds[0];
        assert_eq!(round.round, 1);
        assert_eq!(round.tally, counts(&[("picnic", 5), ("bowling", 5)]));
        assert_eq!(round.eliminated, None);
        assert_eq!(round.winner.as_deref(), Some("picnic"));

        assert_eq!(
            res.outcome,
            Outcome::Tie {
                nominal_winner: "picnic".to_string(),
                tied: vec!["picnic".to_string(), "bowling".to_string()],
            }
        );
        assert_eq!(res.winner(), None);
        assert_eq!(res.outcome.display_winner(), "picnic");
    }

    #[test]
    fn elimination_transfers_to_next_preference() {
        init_logs();
        let opts = options(&["ramen", "tacos", "pasta"]);
        let rankings: Vec<&[&str]> = vec![
            &["ramen"],
            &["ramen"],
            &["ramen"],
            &["ramen"],
            &["tacos", "ramen"],
            &["tacos", "ramen"],
            &["tacos", "ramen"],
            &["pasta"],
            &["pasta"],
            &["pasta"],
        ];

        let res = run_tally(&opts, &submissions(&rankings)).unwrap();
        assert_eq!(res.majority_threshold, 5);
        assert_eq!(res.rounds.len(), 2);

        let first = &res.rounds[0];
        assert_eq!(
            first.tally,
            counts(&[("ramen", 4), ("tacos", 3), ("pasta", 3)])
        );
        assert_eq!(first.winner, None);
        assert_eq!(
            first.eliminated,
            Some(EliminationRecord {
                option: "tacos".to_string(),
                transfers: counts(&[("ramen", 3)]),
                exhausted: 0,
            })
        );

        let second = &res.rounds[1];
        assert_eq!(second.round, 2);
        assert_eq!(second.tally, counts(&[("ramen", 7), ("pasta", 3)]));
        assert_eq!(second.eliminated, None);
        assert_eq!(second.winner.as_deref(), Some("ramen"));
        assert_eq!(
            res.outcome,
            Outcome::Majority {
                winner: "ramen".to_string()
            }
        );
    }

    #[test]
    fn single_option_zero_ballots() {
        let opts = options(&["solo"]);
        let res = run_tally(&opts, &[]).unwrap();
        assert_eq!(res.total_ballots, 0);
        assert_eq!(res.ranked_ballots, 0);
        assert_eq!(res.rounds.len(), 1);
        assert_eq!(res.rounds[0].tally, counts(&[("solo", 0)]));
        assert_eq!(res.rounds[0].eliminated, None);
        assert_eq!(res.rounds[0].winner.as_deref(), Some("solo"));
        assert_eq!(
            res.outcome,
            Outcome::LastStanding {
                winner: "solo".to_string()
            }
        );
    }

    #[test]
    fn unknown_option_is_rejected() {
        let opts = options(&["a", "b"]);
        let subs = submissions(&[&["a", "bogus"]]);
        let err = run_tally(&opts, &subs).unwrap_err();
        assert_eq!(
            err,
            TallyError::UnknownOption {
                submission: "sub-001".to_string(),
                option: "bogus".to_string(),
            }
        );
    }

    #[test]
    fn duplicate_ranking_is_rejected() {
        let opts = options(&["a", "b"]);
        let subs = submissions(&[&["a", "b", "a"]]);
        let err = run_tally(&opts, &subs).unwrap_err();
        assert_eq!(
            err,
            TallyError::DuplicateRanking {
                submission: "sub-001".to_string(),
                option: "a".to_string(),
            }
        );
    }

    #[test]
    fn empty_option_set_is_rejected() {
        let err = run_tally(&[], &[]).unwrap_err();
        assert_eq!(err, TallyError::EmptyOptionSet);
        let err = normalize_ballots(&[], &[]).unwrap_err();
        assert_eq!(err, TallyError::EmptyOptionSet);
    }

    #[test]
    fn duplicate_option_id_is_rejected() {
        let mut opts = options(&["a", "b"]);
        opts.push(VoteOption {
            id: "a".to_string(),
            label: "A again".to_string(),
        });
        let err = run_tally(&opts, &[]).unwrap_err();
        assert_eq!(
            err,
            TallyError::DuplicateOption {
                option: "a".to_string()
            }
        );
    }

    #[test]
    fn abstentions_do_not_block_a_majority() {
        let opts = options(&["a", "b"]);
        let rankings: Vec<&[&str]> = vec![&["a"], &["a"], &["a"], &["b"], &["b"], &[], &[], &[], &[]];
        let res = run_tally(&opts, &submissions(&rankings)).unwrap();
        assert_eq!(res.total_ballots, 9);
        assert_eq!(res.ranked_ballots, 5);
        assert_eq!(res.majority_threshold, 3);
        assert_eq!(res.rounds.len(), 1);
        assert_eq!(
            res.outcome,
            Outcome::Majority {
                winner: "a".to_string()
            }
        );
    }

    #[test]
    fn normalizer_preserves_abstentions() {
        let opts = options(&["a"]);
        let subs = submissions(&[&[], &["a"], &[]]);
        let ballots = normalize_ballots(&opts, &subs).unwrap();
        assert_eq!(ballots.len(), 3);
        assert!(ballots[0].is_abstention());
        assert!(!ballots[1].is_abstention());
        assert_eq!(ballots[1].rank_count(), 1);
        assert!(ballots[2].is_abstention());
    }

    // A tie at the top below the majority threshold does not end the race; the
    // weakest option is still eliminated as usual.
    #[test]
    fn top_tie_below_majority_still_eliminates() {
        let opts = options(&["a", "b", "c", "d"]);
        let rankings: Vec<&[&str]> = vec![
            &["a"],
            &["a"],
            &["a"],
            &["b"],
            &["b"],
            &["b"],
            &["c", "b"],
            &["c", "b"],
            &["d", "a"],
            &["d", "a"],
        ];
        let res = run_tally(&opts, &submissions(&rankings)).unwrap();
        assert_eq!(res.majority_threshold, 5);

        let first = &res.rounds[0];
        assert_eq!(
            first.tally,
            counts(&[("a", 3), ("b", 3), ("c", 2), ("d", 2)])
        );
        assert_eq!(first.winner, None);
        assert_eq!(
            first.eliminated,
            Some(EliminationRecord {
                option: "c".to_string(),
                transfers: counts(&[("b", 2)]),
                exhausted: 0,
            })
        );

        let second = &res.rounds[1];
        assert_eq!(second.tally, counts(&[("a", 3), ("b", 5), ("d", 2)]));
        assert_eq!(second.winner.as_deref(), Some("b"));
        assert_eq!(
            res.outcome,
            Outcome::Majority {
                winner: "b".to_string()
            }
        );
    }

    #[test]
    fn tiebreak_eliminates_earliest_registered() {
        let opts = options(&["a", "b", "c", "d"]);
        let rankings: Vec<&[&str]> =
            vec![&["a"], &["a"], &["b"], &["b"], &["c"], &["d"]];
        let res = run_tally(&opts, &submissions(&rankings)).unwrap();

        // c and d are tied for last; c was registered first and goes first.
        let first = &res.rounds[0];
        assert_eq!(
            first.eliminated.as_ref().map(|e| e.option.as_str()),
            Some("c")
        );

        let second = &res.rounds[1];
        assert_eq!(second.tally, counts(&[("a", 2), ("b", 2), ("d", 1)]));
        assert_eq!(
            second.eliminated.as_ref().map(|e| e.option.as_str()),
            Some("d")
        );

        // Two options left with equal counts: a declared tie.
        let third = &res.rounds[2];
        assert_eq!(third.round, 3);
        assert_eq!(third.tally, counts(&[("a", 2), ("b", 2)]));
        assert_eq!(
            res.outcome,
            Outcome::Tie {
                nominal_winner: "a".to_string(),
                tied: vec!["a".to_string(), "b".to_string()],
            }
        );

        // Every option was either eliminated exactly once or survived to the
        // terminal round; round numbers are contiguous from 1.
        let eliminated: Vec<&str> = res
            .rounds
            .iter()
            .filter_map(|r| r.eliminated.as_ref().map(|e| e.option.as_str()))
            .collect();
        assert_eq!(eliminated, vec!["c", "d"]);
        for (ix, round) in res.rounds.iter().enumerate() {
            assert_eq!(round.round as usize, ix + 1);
        }
        assert!(res.rounds.len() <= opts.len());
    }

    #[test]
    fn exhausted_ballots_leave_the_tally_but_keep_the_threshold() {
        let opts = options(&["a", "b", "c"]);
        let rankings: Vec<&[&str]> = vec![
            &["a"],
            &["a"],
            &["a"],
            &["a"],
            &["b"],
            &["b"],
            &["b"],
            &["b"],
            &["c"],
            &["c"],
            &["c"],
        ];
        let res = run_tally(&opts, &submissions(&rankings)).unwrap();
        assert_eq!(res.ranked_ballots, 11);
        assert_eq!(res.majority_threshold, 6);

        let first = &res.rounds[0];
        assert_eq!(
            first.eliminated,
            Some(EliminationRecord {
                option: "c".to_string(),
                transfers: vec![],
                exhausted: 3,
            })
        );

        // The exhausted ballots are gone from the second tally but the
        // threshold still counts them, so nobody reaches a majority.
        let second = &res.rounds[1];
        assert_eq!(second.tally, counts(&[("a", 4), ("b", 4)]));
        assert!(res.outcome.is_tie());
    }

    #[test]
    fn last_standing_support_counts_any_rank() {
        let opts = options(&["a", "b", "c"]);
        let rankings: Vec<&[&str]> = vec![
            &["a"],
            &["a"],
            &["a"],
            &["a"],
            &["b"],
            &["b"],
            &["b"],
            &["c"],
            &["c"],
            &["c", "a"],
        ];
        let res = run_tally(&opts, &submissions(&rankings)).unwrap();
        assert_eq!(res.majority_threshold, 5);
        assert_eq!(res.rounds.len(), 3);

        let first = &res.rounds[0];
        assert_eq!(
            first.eliminated,
            Some(EliminationRecord {
                option: "b".to_string(),
                transfers: vec![],
                exhausted: 3,
            })
        );

        let second = &res.rounds[1];
        assert_eq!(second.tally, counts(&[("a", 4), ("c", 3)]));
        assert_eq!(
            second.eliminated,
            Some(EliminationRecord {
                option: "c".to_string(),
                transfers: counts(&[("a", 1)]),
                exhausted: 2,
            })
        );

        // The survivor's final tally counts every ballot that ranks it
        // anywhere, even behind options eliminated along the way.
        let third = &res.rounds[2];
        assert_eq!(third.tally, counts(&[("a", 5)]));
        assert_eq!(
            res.outcome,
            Outcome::LastStanding {
                winner: "a".to_string()
            }
        );
    }

    #[test]
    fn tabulation_is_idempotent() {
        let opts = options(&["ramen", "tacos", "pasta"]);
        let rankings: Vec<&[&str]> = vec![
            &["ramen"],
            &["tacos", "ramen"],
            &["tacos", "pasta"],
            &["pasta", "tacos"],
            &["pasta"],
            &[],
        ];
        let subs = submissions(&rankings);
        let first = run_tally(&opts, &subs).unwrap();
        let second = run_tally(&opts, &subs).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_ballots_are_rejected() {
        let opts = options(&["a", "b"]);
        let out_of_range = Ballot {
            prefs: vec![OptionId(7)],
        };
        let err = tabulate(&opts, &[out_of_range]).unwrap_err();
        assert_eq!(err, TallyError::MalformedBallot { ballot: 0 });

        let duplicated = Ballot {
            prefs: vec![OptionId(1), OptionId(1)],
        };
        let err = tabulate(&opts, &[Ballot::default(), duplicated]).unwrap_err();
        assert_eq!(err, TallyError::MalformedBallot { ballot: 1 });
    }
}
