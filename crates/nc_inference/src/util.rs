/// Shorten `s` for log output, cutting at a character boundary.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_cuts_on_char_boundary() {
        // "é" spans bytes 5..7, so a 6 byte cut backs off to 5
        let body = "Erroré from upstream";
        assert_eq!(truncate_for_log(body, 6), format!("Error…(+{} bytes)", body.len() - 5));
        assert_eq!(truncate_for_log(body, body.len()), body);
    }
}
