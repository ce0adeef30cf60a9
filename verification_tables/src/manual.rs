/*!

This is the long-form manual for `verification_tables` and `kobotab`.

## Data types

KoboToolbox has no notion of the kind of a project. `kobotab` classifies projects by name:
* `kii`: the name contains `kii` or `survey` (case-insensitive). These are key informant
  interviews and surveys: one flat record per respondent.
* `fgd`: the name contains `fgd`. These are focus group discussions: one record per
  verification visit, with repeating groups holding one entry per participant.

A name may match both families.

### `kii`

The submissions are sorted by submission time and turned into one table, with one row per
submission. The first columns are `Start`, `End`, `Latitude` and `Longitude` (taken from the
`_geolocation` field of the submission). Every answered question then adds a column headed by
its label:

|  Start   |   End    | Latitude | Longitude | Do you consent? | Fruits liked by |
|----------|----------|----------|-----------|-----------------|-----------------|
| 09:00:00 | 09:20:00 | -1.28    | 36.82     | Yes             | Apple, Banana   |

The table is then shown with the questions as rows and the respondents as columns, like the
`fgd` tables.

Notes:
- the metadata fields (`start`, `end`, `today`, `deviceid`, `__version__`, and the fields
  starting with `_`, `meta/` or `formhub/`) are not answers
- only the fields that are questions of the form are kept
- the columns computed by the form whose label starts with `Time difference in` are dropped
- the answers of `select_multiple` questions are resolved code by code and joined with `, `

### `fgd`

Each submission becomes its own verification table. The repeating groups of the submission
are flattened side by side, one row per participant, then the table is transposed:

| Question  | Respondent 1 | Respondent 2 |
|-----------|--------------|--------------|
| Start     | 09:00:00     | 09:00:00     |
| End       | 10:00:00     | 10:00:00     |
| Latitude  | -1.28        | -1.28        |
| Longitude | 36.82        | 36.82        |
| Attends   | Yes          | Maybe        |

The table is named after the label of the verification number of the submission. Submissions
without a verification number are named `df_<n>`, `n` being the position of the submission.
When two submissions share a name, the later ones get the suffixes `_1`, `_2`, and so on.

A submission is skipped, with a warning, when:
- it has no repeating group
- it has no location, or the location has fewer than two coordinates
- its repeating groups do not all have the same number of entries

## Labels and choices

The labels are cleaned before they are used as headers: only the first line is kept, and a
reference to another field (`${name}`) is removed together with the rest of the line.
Labels of fields whose name contains `section_` are not used, these fields are headers in
the form.

Coded answers are replaced by the label of the choice. A code that is not in its choice list
is kept as is.

## Review and export

With `--review <file.csv>`, the first run writes the table to the CSV file and stops: nothing
is exported until the table is reviewed. Edit the file, then run the same command again. The
edited table is then exported as `<name> Reviewed Data.xlsx`, instead of `<name> data.xlsx`.

With `--reference <file.xlsx>`, the produced table is compared with the first worksheet of a
previous export. The differences are printed and the program fails if there are any.

## Configuration

`kobotab` comes with defaults suited to the verification forms. The program accepts a
configuration file in JSON:

```json
{
  "server": {
    "url": "https://kf.kobotoolbox.org/api/v2",
    "tokenEnv": "KOBO_TOKEN",
    "timeoutSecs": 60
  },
  "pipeline": {
    "locationField": "consented_grp/section_b/precise_location",
    "verificationField": "consented_grp/section_b/verification_no",
    "verificationList": "verification_no",
    "questionRoot": "consented_grp",
    "sectionMarker": "section_",
    "indexSuffix": "_index",
    "timeDifferencePrefix": "Time difference in"
  },
  "output": {
    "outputDirectory": "exports"
  }
}
```

All the fields are optional. The values given on the command line (`--url`, `--token`, `--out`)
take precedence. The token may also be stored in the configuration file (`server.token`), but
reading it from the environment variable is preferred.

Setting `questionRoot` to `""` uses the whole form for the labels and choice lists of the
verification tables.

 */
