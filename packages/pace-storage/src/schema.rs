pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"00_extensions.sql" => out.push_str(include_str!("../../../sql/00_extensions.sql")),
				"tables/001_tasks.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_tasks.sql")),
				"tables/002_tags.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_tags.sql")),
				"tables/003_task_indexing_outbox.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_task_indexing_outbox.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn expands_every_include() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS tasks"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS tags"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS task_indexing_outbox"));
	}

	#[test]
	fn unknown_includes_pass_through() {
		let sql = expand_includes("\\ir missing.sql\nSELECT 1;");

		assert_eq!(sql, "\\ir missing.sql\nSELECT 1;\n");
	}
}
