use crate::stats::ResponseTimeSummary;

const HEADER: &str = "\\begin{tabular}{lrrrrrr}\n\\hline\nTest ID & Avg & Fastest & Slowest & 1\\% & Median & 90\\% \\\\\n\\hline";
const FOOTER: &str = "\\hline\n\\end{tabular}";

pub(crate) fn render_table<'a>(
    rows: impl IntoIterator<Item = (&'a str, &'a ResponseTimeSummary)>,
) -> String {
    let mut lines = vec![HEADER.to_string()];
    for (test_id, s) in rows {
        lines.push(format!(
            "{test_id} & {:.3} & {:.3} & {:.3} & {:.3} & {:.3} & {:.3} \\\\",
            s.avg, s.fastest, s.slowest, s.p1, s.median, s.p90
        ));
    }
    lines.push(FOOTER.to_string());
    lines.join("\n")
}
