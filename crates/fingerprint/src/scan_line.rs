//! Discovery output: one `<addr> <name...>` pair per line.

use bluefang_common::{BdAddr, Device};

/// Parse one scan line. Lines whose first token is not a colon-hex address
/// (headers such as `Scanning ...`) yield `None`. An empty remainder gives
/// the default name.
pub fn parse_scan_line(line: &str) -> Option<(BdAddr, String)> {
    let line = line.trim();
    let mut parts = line.splitn(2, char::is_whitespace);
    let addr: BdAddr = parts.next()?.parse().ok()?;
    let name = parts
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(Device::UNKNOWN_NAME)
        .to_string();
    Some((addr, name))
}

/// Parse every recognisable line, keeping the last name seen per address.
pub fn parse_scan_output<'a, I>(lines: I) -> Vec<(BdAddr, String)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out: Vec<(BdAddr, String)> = Vec::new();
    for (addr, name) in lines.into_iter().filter_map(parse_scan_line) {
        match out.iter_mut().find(|(a, _)| *a == addr) {
            Some(entry) => entry.1 = name,
            None => out.push((addr, name)),
        }
    }
    out
}
