use log::{debug, info, warn};

use instant_runoff::*;
use snafu::{prelude::*, Snafu};

use std::collections::{HashMap, HashSet};
use std::fs;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::tally::config_reader::*;

pub mod io_common;
pub mod io_csv;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum CountError {
    #[snafu(display("Error opening vote description {path}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing vote description"))]
    ParsingConfig { source: serde_json::Error },
    #[snafu(display("Error opening reference summary"))]
    OpeningReference { source: std::io::Error },
    #[snafu(display("Error parsing reference summary"))]
    ParsingReference { source: serde_json::Error },
    #[snafu(display("Error rendering results summary"))]
    RenderingSummary { source: serde_json::Error },
    #[snafu(display("Error writing results summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening ballot file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook contains no readable worksheet"))]
    EmptyExcel {},
    #[snafu(display("No worksheet named {name} in the workbook"))]
    MissingWorksheet { name: String },
    #[snafu(display("Cell on line {lineno} has an unexpected type: {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display("Error opening ballot file"))]
    CsvOpen { source: csv::Error },
    #[snafu(display("Error reading line {lineno} of the ballot file"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display(
        "Submission {submission} references {choice:?}, which is not an option of this vote"
    ))]
    UnknownChoice { submission: String, choice: String },
    #[snafu(display(
        "{choice:?} matches more than one option label; use option ids in the ballot file"
    ))]
    AmbiguousChoice { choice: String },
    #[snafu(display("Unknown input type {input_type}"))]
    UnknownInputType { input_type: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CountResult<T> = Result<T, CountError>;

pub mod config_reader {
    use log::debug;
    use serde::{Deserialize, Serialize};
    use serde_json::Value as JSValue;
    use snafu::prelude::*;
    use std::fs;

    use crate::tally::*;

    /// One option of the vote, in creation order.
    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct OptionDef {
        pub id: String,
        pub label: String,
    }

    /// One recorded submission: the ranked option ids, most preferred first.
    /// An empty ranking is an abstention.
    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct SubmissionDef {
        pub id: Option<String>,
        pub ranking: Vec<String>,
    }

    /// The JSON description of a closed vote.
    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct VoteConfig {
        #[serde(rename = "voteName")]
        pub vote_name: String,
        pub options: Vec<OptionDef>,
        pub submissions: Option<Vec<SubmissionDef>>,
    }

    pub fn read_vote_config(path: &str) -> CountResult<VoteConfig> {
        let contents = fs::read_to_string(path).context(OpeningConfigSnafu {
            path: path.to_string(),
        })?;
        let config: VoteConfig =
            serde_json::from_str(contents.as_str()).context(ParsingConfigSnafu {})?;
        debug!("read_vote_config: {:?}", config);
        Ok(config)
    }

    pub fn read_summary(path: String) -> CountResult<JSValue> {
        let contents = fs::read_to_string(path).context(OpeningReferenceSnafu {})?;
        let js: JSValue =
            serde_json::from_str(contents.as_str()).context(ParsingReferenceSnafu {})?;
        Ok(js)
    }
}

/// A submission as parsed by the ballot file readers, before choice
/// resolution.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedSubmission {
    pub id: Option<String>,
    pub choices: Vec<String>,
}

/// Resolves raw choice references to option ids. Ids take precedence over
/// labels; a label shared by several options cannot be resolved.
pub fn resolve_choices(
    options: &[OptionDef],
    parsed: &[ParsedSubmission],
) -> CountResult<Vec<Submission>> {
    let ids: HashSet<&str> = options.iter().map(|o| o.id.as_str()).collect();
    let mut by_label: HashMap<&str, Vec<&str>> = HashMap::new();
    for o in options.iter() {
        by_label
            .entry(o.label.as_str())
            .or_default()
            .push(o.id.as_str());
    }

    let mut res: Vec<Submission> = Vec::new();
    for (idx, p) in parsed.iter().enumerate() {
        let id = p
            .id
            .clone()
            .unwrap_or_else(|| format!("sub-{:06}", idx + 1));
        let mut ranking: Vec<String> = Vec::with_capacity(p.choices.len());
        for choice in p.choices.iter() {
            if ids.contains(choice.as_str()) {
                ranking.push(choice.clone());
                continue;
            }
            match by_label.get(choice.as_str()).map(|v| v.as_slice()) {
                Some([single]) => ranking.push(single.to_string()),
                Some(_) => {
                    return AmbiguousChoiceSnafu {
                        choice: choice.clone(),
                    }
                    .fail()
                }
                None => {
                    return UnknownChoiceSnafu {
                        submission: id.clone(),
                        choice: choice.clone(),
                    }
                    .fail()
                }
            }
        }
        debug!("resolve_choices: submission {:?}: {:?}", id, ranking);
        res.push(Submission { id, ranking });
    }
    Ok(res)
}

fn inline_submissions(config: &VoteConfig) -> Vec<Submission> {
    config
        .submissions
        .clone()
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(idx, s)| Submission {
            id: s.id.unwrap_or_else(|| format!("sub-{:06}", idx + 1)),
            ranking: s.ranking,
        })
        .collect()
}

fn read_ballot_file(path: &str, args: &Args) -> CountResult<Vec<ParsedSubmission>> {
    let input_type = args.input_type.clone().unwrap_or_else(|| "csv".to_string());
    info!("Attempting to read ballot file {:?} as {}", path, input_type);
    match input_type.as_str() {
        "csv" => io_csv::read_csv_submissions(path),
        "xlsx" => io_xlsx::read_xlsx_submissions(path, args.excel_worksheet_name.as_deref()),
        _ => UnknownInputTypeSnafu { input_type }.fail(),
    }
}

fn label_of(labels: &HashMap<String, String>, option_id: &str) -> String {
    labels
        .get(option_id)
        .cloned()
        .unwrap_or_else(|| option_id.to_string())
}

fn result_stats_to_json(result: &TallyResult, labels: &HashMap<String, String>) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    let num_rounds = result.rounds.len();
    for (idx, round) in result.rounds.iter().enumerate() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for (option_id, count) in round.tally.iter() {
            tally.insert(label_of(labels, option_id), json!(count.to_string()));
        }

        let mut tally_results: Vec<JSValue> = Vec::new();
        if let Some(elimination) = &round.eliminated {
            let mut transfers: JSMap<String, JSValue> = JSMap::new();
            for (option_id, count) in elimination.transfers.iter() {
                transfers.insert(label_of(labels, option_id), json!(count.to_string()));
            }
            if elimination.exhausted > 0 {
                transfers.insert(
                    "exhausted".to_string(),
                    json!(elimination.exhausted.to_string()),
                );
            }
            tally_results.push(json!({
                "eliminated": label_of(labels, &elimination.option),
                "transfers": transfers
            }));
        }
        if idx == num_rounds - 1 {
            match &result.outcome {
                Outcome::Majority { winner } | Outcome::LastStanding { winner } => {
                    tally_results.push(json!({
                        "elected": label_of(labels, winner),
                        "transfers": {}
                    }));
                }
                Outcome::Tie { tied, .. } => {
                    let tied_labels: Vec<String> =
                        tied.iter().map(|t| label_of(labels, t)).collect();
                    tally_results.push(json!({ "tied": tied_labels }));
                }
            }
        }

        let js = json!({"round": round.round, "tally": tally, "tallyResults": tally_results});
        l.push(js);
    }
    l
}

fn outcome_to_json(outcome: &Outcome, labels: &HashMap<String, String>) -> JSValue {
    match outcome {
        Outcome::Majority { winner } => {
            json!({"kind": "majority", "winner": label_of(labels, winner)})
        }
        Outcome::LastStanding { winner } => {
            json!({"kind": "lastStanding", "winner": label_of(labels, winner)})
        }
        Outcome::Tie {
            nominal_winner,
            tied,
        } => json!({
            "kind": "tie",
            "nominalWinner": label_of(labels, nominal_winner),
            "tied": tied.iter().map(|t| label_of(labels, t)).collect::<Vec<String>>()
        }),
    }
}

fn build_summary_js(config: &VoteConfig, result: &TallyResult) -> JSValue {
    let labels: HashMap<String, String> = config
        .options
        .iter()
        .map(|o| (o.id.clone(), o.label.clone()))
        .collect();
    json!({
        "config": {
            "vote": config.vote_name,
            "totalBallots": result.total_ballots.to_string(),
            "rankedBallots": result.ranked_ballots.to_string(),
            "threshold": result.majority_threshold.to_string(),
        },
        "results": result_stats_to_json(result, &labels),
        "outcome": outcome_to_json(&result.outcome, &labels),
    })
}

pub fn run_count(args: &Args) -> CountResult<()> {
    let config = read_vote_config(&args.config)?;
    info!(
        "run_count: vote {:?} with {:?} options",
        config.vote_name,
        config.options.len()
    );

    let submissions: Vec<Submission> = match &args.input {
        Some(input) => {
            let parsed = read_ballot_file(input, args)?;
            resolve_choices(&config.options, &parsed)?
        }
        None => inline_submissions(&config),
    };
    info!("run_count: {:?} submissions", submissions.len());

    let options: Vec<VoteOption> = config
        .options
        .iter()
        .map(|o| VoteOption {
            id: o.id.clone(),
            label: o.label.clone(),
        })
        .collect();

    let result = match run_tally(&options, &submissions) {
        Ok(r) => r,
        Err(e) => {
            whatever!("Tabulation error: {}", e)
        }
    };
    match result.winner() {
        Some(winner) => info!("run_count: winner is {:?}", winner),
        None => info!(
            "run_count: declared tie, nominal winner {:?}",
            result.outcome.display_winner()
        ),
    }

    let summary = build_summary_js(&config, &result);
    let pretty_js_stats =
        serde_json::to_string_pretty(&summary).context(RenderingSummarySnafu {})?;

    match args.out.as_deref() {
        Some("stdout") | None => println!("{}", pretty_js_stats),
        Some(path) => {
            fs::write(path, &pretty_js_stats).context(WritingSummarySnafu {
                path: path.to_string(),
            })?;
            info!("run_count: summary written to {:?}", path);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(reference_path) = &args.reference {
        let reference = read_summary(reference_path.clone())?;
        if reference != summary {
            warn!("Found differences with the reference summary");
            let pretty_reference =
                serde_json::to_string_pretty(&reference).context(RenderingSummarySnafu {})?;
            print_diff(pretty_reference.as_str(), pretty_js_stats.as_str(), "\n");
            whatever!("Difference detected between calculated summary and reference summary");
        }
    }

    Ok(())
}
