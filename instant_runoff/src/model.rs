// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// An option that voters can rank.
///
/// The position of an option in the registration slice is its creation order,
/// which is the only tie-break key used during tabulation. It never affects
/// the weight of a vote.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct VoteOption {
    /// Opaque identifier, unique within one vote.
    pub id: String,
    /// Human-readable label for results pages.
    pub label: String,
}

/// A raw ranked submission, as received from the voting front end.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Submission {
    pub id: String,
    /// Option ids, most preferred first. An empty ranking is an abstention.
    pub ranking: Vec<String>,
}

// ******** Output data structures *********

/// Where the ballots of an eliminated option went.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct EliminationRecord {
    /// Id of the eliminated option.
    pub option: String,
    /// (option id, ballots received) for every option that picked up votes,
    /// in creation order.
    pub transfers: Vec<(String, u64)>,
    /// Ballots with no surviving preference left after this elimination.
    pub exhausted: u64,
}

/// Tally of a single elimination round.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundRecord {
    /// 1-based round number, contiguous.
    pub round: u32,
    /// (option id, first-preference count) for every option still in the
    /// running, in creation order.
    pub tally: Vec<(String, u64)>,
    /// Present on every round except the terminal one.
    pub eliminated: Option<EliminationRecord>,
    /// Present only on the terminal round. For a tied terminal round this is
    /// the nominal winner.
    pub winner: Option<String>,
}

/// How the tabulation ended.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Outcome {
    /// A single option reached the majority threshold on first preferences.
    Majority { winner: String },
    /// Elimination left one option standing without a numeric majority.
    LastStanding { winner: String },
    /// Every remaining option held the same count. The nominal winner is the
    /// earliest-registered of the tied options and is meant for display only.
    Tie {
        nominal_winner: String,
        tied: Vec<String>,
    },
}

impl Outcome {
    /// The winning option id, if the vote produced an actual winner.
    pub fn winner(&self) -> Option<&str> {
        match self {
            Outcome::Majority { winner } | Outcome::LastStanding { winner } => Some(winner),
            Outcome::Tie { .. } => None,
        }
    }

    /// The option to show first on a results page, tie or not.
    pub fn display_winner(&self) -> &str {
        match self {
            Outcome::Majority { winner } | Outcome::LastStanding { winner } => winner,
            Outcome::Tie { nominal_winner, .. } => nominal_winner,
        }
    }

    pub fn is_tie(&self) -> bool {
        matches!(self, Outcome::Tie { .. })
    }
}

/// The complete outcome of one tabulation run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyResult {
    /// All ballots considered, abstentions included.
    pub total_ballots: u64,
    /// Ballots carrying at least one preference. This is the denominator of
    /// the majority threshold.
    pub ranked_ballots: u64,
    /// ceil(ranked_ballots / 2).
    pub majority_threshold: u64,
    pub rounds: Vec<RoundRecord>,
    pub outcome: Outcome,
}

impl TallyResult {
    pub fn winner(&self) -> Option<&str> {
        self.outcome.winner()
    }
}

/// Errors that prevent a tally from completing.
///
/// None of these are recoverable mid-run: the caller fixes its input and
/// re-runs the whole tabulation.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyError {
    EmptyOptionSet,
    DuplicateOption { option: String },
    UnknownOption { submission: String, option: String },
    DuplicateRanking { submission: String, option: String },
    /// A ballot handed to the tabulator references an option out of range or
    /// repeats one. Means the ballots did not come from the normalizer.
    MalformedBallot { ballot: usize },
    /// The elimination loop exceeded its round bound.
    NoConvergence,
}

impl Error for TallyError {}

impl Display for TallyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyError::EmptyOptionSet => write!(f, "the vote has no options"),
            TallyError::DuplicateOption { option } => {
                write!(f, "option {:?} is registered more than once", option)
            }
            TallyError::UnknownOption { submission, option } => {
                write!(
                    f,
                    "submission {:?} references unknown option {:?}",
                    submission, option
                )
            }
            TallyError::DuplicateRanking { submission, option } => {
                write!(
                    f,
                    "submission {:?} ranks option {:?} more than once",
                    submission, option
                )
            }
            TallyError::MalformedBallot { ballot } => {
                write!(f, "ballot #{} is internally inconsistent", ballot)
            }
            TallyError::NoConvergence => write!(f, "the elimination loop did not converge"),
        }
    }
}
