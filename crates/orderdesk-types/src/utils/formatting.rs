//! Display formatting for the operator view.

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Formats a timestamp as `dd.mm.yyyy, HH:MM` at a fixed UTC offset.
///
/// Offsets outside ±24h fall back to UTC.
pub fn format_display_time(timestamp: &DateTime<Utc>, utc_offset_minutes: i32) -> String {
	let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
		.unwrap_or_else(|| Utc.fix());
	timestamp
		.with_timezone(&offset)
		.format("%d.%m.%Y, %H:%M")
		.to_string()
}

/// Joins first and optional last name for display.
pub fn display_name(first_name: &str, last_name: Option<&str>) -> String {
	match last_name.map(str::trim).filter(|last| !last.is_empty()) {
		Some(last) => format!("{} {}", first_name, last),
		None => first_name.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn test_format_display_time_applies_offset() {
		let timestamp = Utc.with_ymd_and_hms(2025, 3, 9, 22, 30, 0).unwrap();

		assert_eq!(format_display_time(&timestamp, 180), "10.03.2025, 01:30");
		assert_eq!(format_display_time(&timestamp, 0), "09.03.2025, 22:30");
	}

	#[test]
	fn test_format_display_time_rejects_absurd_offset() {
		let timestamp = Utc.with_ymd_and_hms(2025, 3, 9, 22, 30, 0).unwrap();
		assert_eq!(format_display_time(&timestamp, 100_000), "09.03.2025, 22:30");
	}

	#[test]
	fn test_display_name() {
		assert_eq!(display_name("Ivan", Some("Petrov")), "Ivan Petrov");
		assert_eq!(display_name("Ivan", Some("  ")), "Ivan");
		assert_eq!(display_name("Ivan", None), "Ivan");
	}
}
