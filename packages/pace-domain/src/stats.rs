use serde::Serialize;

use crate::HistoricalTask;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
	pub count: u32,
	pub average: f64,
	pub min: u32,
	pub max: u32,
}
impl SeriesStats {
	pub fn from_values<I>(values: I) -> Option<Self>
	where
		I: IntoIterator<Item = u32>,
	{
		let mut count = 0_u32;
		let mut sum = 0_u64;
		let mut min = u32::MAX;
		let mut max = 0_u32;

		for value in values {
			count += 1;
			sum += u64::from(value);
			min = min.min(value);
			max = max.max(value);
		}

		if count == 0 {
			return None;
		}

		Some(Self { count, average: sum as f64 / f64::from(count), min, max })
	}
}

/// Duration and cost are summarized independently; a task missing one still counts toward the
/// other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HistoricalStats {
	pub duration: Option<SeriesStats>,
	pub cost: Option<SeriesStats>,
}
impl HistoricalStats {
	pub fn from_tasks(tasks: &[HistoricalTask]) -> Self {
		Self {
			duration: SeriesStats::from_values(tasks.iter().filter_map(|task| task.duration_minutes)),
			cost: SeriesStats::from_values(tasks.iter().filter_map(|task| task.cost)),
		}
	}
}

/// Count of distinct tags carried by the retrieved tasks.
pub fn distinct_tag_count(tasks: &[HistoricalTask]) -> u32 {
	let mut tags = std::collections::BTreeSet::new();

	for task in tasks {
		tags.extend(task.tags.iter().map(String::as_str));
	}

	tags.len() as u32
}
