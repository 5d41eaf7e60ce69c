/// Default bar width, in columns.
pub const DEFAULT_WIDTH: usize = 64;

/// Render a horizontal ASCII bar chart.
///
/// `data` is a list of `(label, value)` pairs; bars scale linearly so the
/// largest value spans `width` columns. Returns the chart lines, title
/// first.
pub fn render(title: &str, data: &[(String, u64)], width: usize) -> Vec<String> {
    let mut lines = vec![title.to_string()];
    let max = data.iter().map(|(_, v)| *v).max().unwrap_or(0);
    let label_width = data.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    for (label, value) in data {
        let bar_len = if max == 0 {
            0
        } else {
            (*value as usize * width) / max as usize
        };
        lines.push(format!(
            "{label:>label_width$}  {:<width$} {value}",
            "█".repeat(bar_len)
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(values: &[(&str, u64)]) -> Vec<(String, u64)> {
        values.iter().map(|(l, v)| (l.to_string(), *v)).collect()
    }

    #[test]
    fn bars_scale_to_the_maximum() {
        let lines = render("t", &data(&[("a", 2), ("b", 4)]), 8);
        assert_eq!(lines[0], "t");
        assert_eq!(lines[1].matches('█').count(), 4);
        assert_eq!(lines[2].matches('█').count(), 8);
    }

    #[test]
    fn zero_values_render_empty_bars() {
        let lines = render("t", &data(&[("a", 0), ("b", 0)]), 8);
        assert!(lines[1..].iter().all(|l| !l.contains('█')));
    }

    #[test]
    fn counts_are_appended() {
        let lines = render("t", &data(&[("10.000", 3)]), 4);
        assert!(lines[1].ends_with(" 3"));
        assert!(lines[1].starts_with("10.000"));
    }
}
