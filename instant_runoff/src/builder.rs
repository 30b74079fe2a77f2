pub use crate::model::*;
use crate::run_tally;

/// A builder for assembling a vote and its submissions in code.
///
/// ```
/// pub use instant_runoff::builder::Builder;
/// # use instant_runoff::TallyError;
///
/// let mut builder = Builder::new()
///     .option("opt-anna", "Anna")?
///     .option("opt-bob", "Bob")?;
///
/// builder.add_ranking(&["opt-anna", "opt-bob"])?;
/// builder.add_abstention();
///
/// let result = builder.tally()?;
/// assert_eq!(result.winner(), Some("opt-anna"));
/// # Ok::<(), TallyError>(())
/// ```
pub struct Builder {
    pub(crate) _options: Vec<VoteOption>,
    pub(crate) _submissions: Vec<Submission>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _options: Vec::new(),
            _submissions: Vec::new(),
        }
    }

    /// Registers an option. Registration order is the tie-break order.
    pub fn option(mut self, id: &str, label: &str) -> Result<Builder, TallyError> {
        if self._options.iter().any(|o| o.id == id) {
            return Err(TallyError::DuplicateOption {
                option: id.to_string(),
            });
        }
        self._options.push(VoteOption {
            id: id.to_string(),
            label: label.to_string(),
        });
        Ok(self)
    }

    /// Adds a ranked submission with a generated id.
    ///
    /// It is the simplest use case for most cases.
    pub fn add_ranking(&mut self, ranking: &[&str]) -> Result<(), TallyError> {
        let id = self.next_submission_id();
        self.add_submission(Submission {
            id,
            ranking: ranking.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Adds an empty submission, recording an explicit abstention.
    pub fn add_abstention(&mut self) {
        let id = self.next_submission_id();
        self._submissions.push(Submission {
            id,
            ranking: Vec::new(),
        });
    }

    pub fn add_submission(&mut self, submission: Submission) -> Result<(), TallyError> {
        self._submissions.push(submission);
        Ok(())
    }

    /// Runs the tally over everything collected so far.
    pub fn tally(&self) -> Result<TallyResult, TallyError> {
        run_tally(&self._options, &self._submissions)
    }

    fn next_submission_id(&self) -> String {
        format!("ballot-{:06}", self._submissions.len() + 1)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_option_is_rejected() {
        let res = Builder::new()
            .option("opt-a", "A")
            .unwrap()
            .option("opt-a", "A again");
        assert!(matches!(res, Err(TallyError::DuplicateOption { .. })));
    }

    #[test]
    fn abstentions_count_toward_totals() {
        let mut builder = Builder::new()
            .option("opt-a", "A")
            .unwrap()
            .option("opt-b", "B")
            .unwrap();
        builder.add_ranking(&["opt-a"]).unwrap();
        builder.add_abstention();
        builder.add_abstention();

        let result = builder.tally().unwrap();
        assert_eq!(result.total_ballots, 3);
        assert_eq!(result.ranked_ballots, 1);
        assert_eq!(result.winner(), Some("opt-a"));
    }
}
