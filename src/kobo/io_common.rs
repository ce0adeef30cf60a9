use verification_tables::{Cell, Table};

fn cell_text(cell: &Cell) -> &str {
    cell.as_deref().unwrap_or("")
}

/// Replaces the characters that cannot appear in a file name.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

/// `<name> data.xlsx`, or `<name> Reviewed Data.xlsx` once the table was reviewed.
pub fn export_file_name(name: &str, reviewed: bool) -> String {
    if reviewed {
        format!("{} Reviewed Data.xlsx", file_stem(name))
    } else {
        format!("{} data.xlsx", file_stem(name))
    }
}

/// Aligned plain-text rendering, for the terminal.
pub fn render_text(table: &Table) -> String {
    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.chars().count()).collect();
    for row in table.rows.iter() {
        for (idx, cell) in row.iter().enumerate() {
            let w = cell_text(cell).chars().count();
            if w > widths[idx] {
                widths[idx] = w;
            }
        }
    }
    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<String>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };
    let mut lines: Vec<String> = vec![line(table.columns.iter().map(|c| c.as_str()).collect())];
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<String>>()
            .join("-+-"),
    );
    for row in table.rows.iter() {
        lines.push(line(row.iter().map(cell_text).collect()));
    }
    lines.join("\n")
}

/// One tab-separated line per row, header first. Used to compare tables.
pub fn render_lines(table: &Table) -> String {
    let mut lines: Vec<String> = vec![table.columns.join("\t")];
    for row in table.rows.iter() {
        lines.push(row.iter().map(cell_text).collect::<Vec<&str>>().join("\t"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new(vec!["Question".to_string(), "Respondent 1".to_string()]);
        t.push_row(vec![Some("Start".to_string()), Some("2024".to_string())]);
        t.push_row(vec![Some("Age".to_string()), None]);
        t
    }

    #[test]
    fn file_names() {
        assert_eq!(export_file_name("Visit 1", false), "Visit 1 data.xlsx");
        assert_eq!(
            export_file_name("ELMI KII", true),
            "ELMI KII Reviewed Data.xlsx"
        );
        assert_eq!(export_file_name("a/b", false), "a_b data.xlsx");
    }

    #[test]
    fn text_rendering() {
        let s = render_text(&sample());
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines[0], "Question | Respondent 1");
        assert_eq!(lines[1], "---------+-------------");
        assert_eq!(lines[2], "Start    | 2024");
        assert_eq!(lines[3], "Age");
    }

    #[test]
    fn line_rendering() {
        assert_eq!(
            render_lines(&sample()),
            "Question\tRespondent 1\nStart\t2024\nAge\t"
        );
    }
}
