/*!

This is the long-form manual for `instant_runoff` and `rankedpoll`.

## How a poll is counted

Every submission ranks some of the vote's options, most preferred first.
Counting proceeds in rounds. In each round every ballot counts for its
highest-ranked option that is still in the running. An option whose count
reaches the majority of ranked ballots (abstentions are left out of the
denominator) wins outright. Otherwise the weakest option is eliminated and
its ballots transfer to their next surviving preference; ballots with no
surviving preference are exhausted and sit out the following rounds, though
they still count toward the majority denominator.

Two situations end the count without a numeric majority:

* a single option is left standing, which wins by default;
* every remaining option holds exactly the same count, which is reported as
  a tie. The earliest-created option is named as the nominal winner so that
  results pages have something to show first, but callers can tell the two
  outcomes apart.

When several options are tied for elimination, the one created earliest is
eliminated. There is no randomness anywhere: the same options and the same
submissions always produce the same rounds.

## Vote description format

`rankedpoll --config vote.json` expects a JSON document like:

```text
{
  "voteName": "Team dinner",
  "options": [
    {"id": "opt-ramen", "label": "Ramen"},
    {"id": "opt-tacos", "label": "Tacos"}
  ],
  "submissions": [
    {"id": "sub-001", "ranking": ["opt-tacos", "opt-ramen"]},
    {"id": "sub-002", "ranking": []}
  ]
}
```

The options must be listed in the order they were created; that order breaks
elimination ties. An empty `ranking` records an abstention. The `submissions`
section may be omitted when the ballots come from a separate file (see
below). Submission ids are optional and generated when missing.

## Ballot file formats

With `--input <file>`, submissions are read from a spreadsheet export
instead of the vote description. The expected layout is one submission per
row, choices in rank order:

```text
id,first choice,second choice,third choice
s-01,Ramen,Tacos,
s-02,Tacos,,Ramen
```

The first row is a header. The leading `id` column is optional (it is
recognized by its header); without it, submission ids are derived from the
file name and line number. Blank cells are skipped, so the second row above
ranks `Tacos` first and `Ramen` second. Cells may hold either option labels
or option ids; a label shared by several options cannot be resolved and is
an error.

* `--input-type csv` (the default) reads a comma-separated file.
* `--input-type xlsx` reads an Excel workbook. The first worksheet is used
  unless `--excel-worksheet-name` says otherwise.

A choice that matches no option at all is an error: this tool never guesses
what a voter meant, and write-ins are not a thing in this system.

## Results summary

The summary written by `--out` (or checked with `--reference`) contains one
entry per round with the tally and what ended the round:

```text
{
  "config": {"vote": "Team dinner", "totalBallots": "2", "rankedBallots": "1", "threshold": "1"},
  "results": [
    {
      "round": 1,
      "tally": {"Ramen": "0", "Tacos": "1"},
      "tallyResults": [{"elected": "Tacos", "transfers": {}}]
    }
  ],
  "outcome": {"kind": "majority", "winner": "Tacos"}
}
```

`outcome.kind` is `majority`, `lastStanding` or `tie`. A tie carries the
tied options and a `nominalWinner` instead of a `winner`, and the terminal
round lists the tied options in `tallyResults`. Elimination rounds list the
eliminated option together with where its ballots went, including an
`exhausted` count when some ballots had no surviving preference left.

*/
