//! Utility modules shared across the pipeline.

pub mod exec;
pub mod fs;
pub mod vars;

/// Format count with noun, handling pluralization
///
/// - `plural_count(1, "page")` -> `"1 page"`
/// - `plural_count(3, "page")` -> `"3 pages"`
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, if count == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use super::plural_count;

    #[test]
    fn test_plural_count() {
        assert_eq!(plural_count(0, "worker"), "0 workers");
        assert_eq!(plural_count(1, "worker"), "1 worker");
        assert_eq!(plural_count(7, "page"), "7 pages");
    }
}
