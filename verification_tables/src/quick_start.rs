/*!

# Quick start with KoboToolbox

This example goes from a deployed KoboToolbox form to an Excel file of verification tables.

You need an account on a KoboToolbox server and an API token. The token is in the account
settings of the web interface ("Security", then "API Key"). Store it in the environment:

```bash
export KOBO_TOKEN=0123456789abcdef
```

**Listing the projects** Without `--project`, `kobotab` lists the projects of the selected
data type (`fgd` by default):

```bash
kobotab --url https://kf.kobotoolbox.org/api/v2 --data-type fgd
```

```text
aBcDeF123456	ELMI FGD verification
```

**Listing the verification tables** Pass the project, by name or by uid. For focus group
discussions, `kobotab` builds one table per submission and prints their names:

```bash
kobotab --data-type fgd --project "ELMI FGD verification"
```

```text
Visit 1
Visit 1_1
Visit 2
```

Submissions that could not be turned into a table are reported in the log, for example:

```text
[2024-03-01T10:00:00Z WARN  kobotab::kobo] Submission 4 (id 1234) was skipped: missing location field consented_grp/section_b/precise_location
```

**Exporting a table** Select the table with `--verification` and pass a directory with `--out`:

```bash
kobotab --data-type fgd --project "ELMI FGD verification" --verification "Visit 1" --out exports
```

The table is printed and written to `exports/Visit 1 data.xlsx`. Use `--out stdout` to get
the table in JSON format instead.

**Key informant interviews** For `kii` projects there is a single table, with one respondent
per column:

```bash
kobotab --data-type kii --project "ELMI KII" --out exports
```

**Reviewing before export** Add `--review` to go through a CSV file first:

```bash
kobotab --data-type kii --project "ELMI KII" --out exports --review review.csv
# edit review.csv
kobotab --data-type kii --project "ELMI KII" --out exports --review review.csv
```

The second run writes `exports/ELMI KII Reviewed Data.xlsx`.

It is the end of this quick start. See the [manual](../manual/index.html) for the details of
the tables and for the configuration file.

The library can also be used directly, without a server, through
[`Builder`](../builder/struct.Builder.html).

*/
