/// Convert a snake_case or kebab-case identifier into a display title.
///
/// Words separated by `_`, `-`, or `.` are capitalized and joined with
/// spaces. Input that already contains spaces is left as-is apart from
/// capitalization of each word.
///
/// # Examples
/// ```
/// use trellis_core::utils::titleize;
/// assert_eq!(titleize("enrolled_at"), "Enrolled At");
/// assert_eq!(titleize("study"), "Study");
/// ```
pub fn titleize(s: &str) -> String {
    fn is_separator(c: char) -> bool {
        matches!(c, '_' | '-' | '.' | ' ')
    }

    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;
    for c in s.chars() {
        if is_separator(c) {
            if !result.ends_with(' ') && !result.is_empty() {
                result.push(' ');
            }
            capitalize_next = true;
            continue;
        }
        if capitalize_next {
            result.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}
