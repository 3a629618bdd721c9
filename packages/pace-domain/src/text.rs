const ELLIPSIS: &str = "...";

/// Caps `text` at `max_chars` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
	let text = text.trim();

	match text.char_indices().nth(max_chars) {
		None => text.to_string(),
		Some((cut, _)) => {
			let mut out = text[..cut].trim_end().to_string();

			out.push_str(ELLIPSIS);

			out
		},
	}
}

/// Collapses runs of whitespace, including newlines, into single spaces.
pub fn single_line(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}
