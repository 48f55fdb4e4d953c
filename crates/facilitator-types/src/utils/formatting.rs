//! String formatting utilities.
//!
//! Provides functions for formatting amounts and identifiers for display.

/// Utility function to truncate an identifier for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

/// Formats a base-unit amount with a fixed number of fractional digits.
///
/// The amount is scaled down by `decimals` and rounded half-up to
/// `precision` digits, so `format_amount(50_000, 6, 2)` yields "0.05" and
/// `format_amount(1_000_000, 9, 4)` yields "0.0010".
pub fn format_amount(amount: u64, decimals: u8, precision: u8) -> String {
	let scale = 10u128.pow(u32::from(decimals));
	let shown = 10u128.pow(u32::from(precision));
	let scaled = (u128::from(amount) * shown + scale / 2) / scale;

	let whole = scaled / shown;
	if precision == 0 {
		return whole.to_string();
	}
	let fraction = scaled % shown;
	format!(
		"{}.{:0width$}",
		whole,
		fraction,
		width = usize::from(precision)
	)
}
