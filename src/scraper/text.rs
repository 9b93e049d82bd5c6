//! Plain-text heuristics over `innerText`.

/// True when `ticker` occurs in `text` as a standalone token, i.e. not glued to
/// other letters or digits. "SPX Dealers" mentions SPX; "SPXW" and "XSPX" do not.
pub fn mentions_ticker(text: &str, ticker: &str) -> bool {
    if ticker.is_empty() {
        return false;
    }
    text.match_indices(ticker).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + ticker.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric())
    })
}

/// First line that carries both the marker and the ticker.
pub fn find_code_line<'a>(body: &'a str, ticker: &str, marker: &str) -> Option<&'a str> {
    body.lines()
        .find(|line| line.contains(marker) && mentions_ticker(line, ticker))
}

/// Strip the quotes and padding the page wraps around a code line.
pub fn clean_code_line(line: &str) -> String {
    line.trim_matches(|c: char| c == '"' || c.is_whitespace()).to_string()
}

/// The visible toast line for `needle`, or the needle itself.
pub fn toast_message(body: &str, needle: &str) -> String {
    body.lines()
        .map(str::trim)
        .find(|l| l.contains(needle))
        .unwrap_or(needle)
        .to_string()
}
