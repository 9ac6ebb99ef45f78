// Call number normalisation for holding records
use regex::Regex;
use std::sync::LazyLock;

static DIGIT_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9])([a-zA-Z])").expect("Invalid regex pattern"));
static DIGIT_PERIOD_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9])\.([a-zA-Z])").expect("Invalid regex pattern"));
static SPACE_PERIODS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \.\.+").expect("Invalid regex pattern"));
static PERIOD_SPACES_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\. +([0-9])").expect("Invalid regex pattern"));

/// MARC holdings field carrying the call number
pub const CALL_NUMBER_TAG: &str = "852";

/// Subfields of the call number field that get cleaned
pub const CALL_NUMBER_SUBFIELDS: [&str; 2] = ["h", "i"];

/// Human-readable list of the rules, in the order they run
pub const RULES: [&str; 5] = [
    "Add a space between a number then a letter.",
    "Add a space between a number and a period when the period is followed by a letter.",
    "Remove the extra periods from any substring matching space period period...",
    "Remove any spaces between a period and a number.",
    "Remove any leading or trailing whitespace.",
];

/// Apply the cleanup rules to one call number subfield.
///
/// `BR115.C5L43` becomes `BR115 .C5 L43`.
pub fn clean_call_number(call_number: &str) -> String {
    let cleaned = DIGIT_LETTER.replace_all(call_number, "$1 $2");
    let cleaned = DIGIT_PERIOD_LETTER.replace_all(&cleaned, "$1 .$2");
    let cleaned = SPACE_PERIODS.replace_all(&cleaned, " .");
    let cleaned = PERIOD_SPACES_DIGIT.replace_all(&cleaned, ".$1");
    cleaned.trim().to_string()
}
