/*!

This is the long-form manual for `coded_survey` and `surveytab`.

`surveytab` reads the coded messages and individuals of one camp, runs every
aggregation of this crate over them and writes the resulting tables and
chart series to an output directory.

## Inputs

### Records

Messages and individuals are read from JSON Lines files: one JSON object per
line, one record per object. Each key of the object becomes a field of the
record:

* `{"CodeID": "code-abc"}` is a single label
* a list of such objects is an ordered list of labels
* strings, numbers and booleans are text, as written
* `null` values are skipped, as if the field was absent

Individuals carry the consent flag (`consent_withdrawn` by default) as a
string or a boolean. Only a true-like value withdraws consent.

```text
{"uid": "avf-1", "consent_withdrawn": "false", "gender_raw": "male", "gender_coded": {"CodeID": "code-male"}}
```

### Code schemes

Schemes are read from the `code_schemes` directory (see `--code-schemes`),
one JSON file per scheme, in the export format of the coding tool:

```text
{
  "SchemeID": "Scheme-gender",
  "Name": "gender",
  "Version": "0.0.0.1",
  "Codes": [
    {"CodeID": "code-male", "CodeType": "Normal", "DisplayText": "male",
     "StringValue": "male", "MatchValues": ["male", "man"]},
    {"CodeID": "code-stop", "CodeType": "Control", "ControlCode": "STOP",
     "DisplayText": "STOP", "StringValue": "STOP"}
  ]
}
```

The order of `Codes` is the order of every row and column keyed by the scheme.
`CodeType` is one of `Normal`, `Control` or `Meta`. `Control` codes must
have a `ControlCode` (`STOP`, `NC`, `NR`, `NA`, `NS`, `WS`, `NIC`, `CE`).

The file names follow the pipeline: `kakuma_s01e01.json` to
`kakuma_s01e10.json` for the episodes, `gender.json`, `age.json`,
`age_category.json`, `nationality.json` and `kakuma_location.json`,
`kakuma_household_language.json`, `kakuma_ws_correct_dataset.json` and the
follow-up schemes. Replace `kakuma` by `dadaab` for the other camp.

### Pipeline configuration

The configuration is a JSON object. Only `PipelineName` is mandatory:

| key                      | default             | meaning |
|--------------------------|---------------------|---------|
| `PipelineName`           |                     | `kakuma_pipeline` or `dadaab_pipeline` |
| `ConsentWithdrawnKey`    | `consent_withdrawn` | the consent flag of every record |
| `IndividualIdKey`        | `uid`               | names individuals in error messages |
| `StratifyBy`             | `gender`            | the demographic used for the theme breakdowns |
| `NonThemeCodes`          | knowledge, attitude, behaviour | codes left out of the theme breakdowns |
| `DoNotShareCode`         | `DNS`               | the string value that keeps a message private |
| `SafeToShareFromEpisode` | `6`                 | the first episode (counting from 1) with shareable messages |
| `ChartCodeCeiling`       | `200`               | distributions with more codes are not charted |

Other keys of the wider pipeline configuration are ignored.

## Outputs

The following files are written to the output directory:

* `engagement_counts.csv` one row per episode, and a `Total` row
* `repeat_participations.csv` the number of individuals per count of episodes participated in
* `demographic_distributions.csv` the individuals per code of each demographic
* `theme_distributions.csv` each theme of each episode against each demographic code
* `safe_to_share_messages.csv` the raw messages that may be quoted
* `graphs/` one JSON file per chart series

In every table the first column is only written on the first row of its group.
Percentages carry one decimal. A `-` marks a value that cannot be computed:
a percentage of nothing, or a total that the pipeline overwrote.

### `theme_distributions.csv`

The columns after `Question` and `Variable` come in pairs of a count and its
percentage: first the totals, then one pair per `demographic:code`. Each
episode starts with a `Total Relevant Participants` row, then has one row per
normal code of the episode scheme. The percentages of a theme row are taken
against the relevant participants of the same column.

### Charts

The `graphs` directory holds the series behind each chart:

* `messages_per_episode.json` and `participants_per_episode.json`
* `season_distribution_<variable>.json` for each demographic and each
  variable of the season, unless it has more codes than `ChartCodeCeiling`
* `season_distribution_<stratify by>_pie.json` the normal codes of the
  stratifying variable
* `<episode>_by_<stratify by>.json` the count and fraction of every theme in
  every stratum

## Checking against a reference

With `--reference <dir>`, each table is compared with the file of the same
name in `<dir>`. Differences are printed as a diff and the run fails.

*/
