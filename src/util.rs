// Console formatting helpers.
use num_format::{Locale, ToFormattedString};

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thousands separators for counts in console messages
    // (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

/// Scientific rendering for per-capita magnitudes, which sit around 1e-5
/// in TWh runs and would print as a wall of zeroes in fixed notation.
pub fn display_per_capita(v: &f64) -> String {
    format!("{:.6e}", v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_int_inserts_separators() {
        assert_eq!(format_int(9855usize), "9,855");
        assert_eq!(format_int(1_000_000i64), "1,000,000");
    }

    #[test]
    fn per_capita_uses_scientific_notation() {
        assert_eq!(display_per_capita(&1.2084e-5), "1.208400e-5");
    }
}
