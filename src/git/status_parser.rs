//! Parsing for `git status --porcelain=v2 --branch` and `git diff --name-only`.
//!
//! The parser is lenient: git is a trusted producer, so records that do not
//! have the expected shape are dropped instead of failing the whole status.

use super::types::{BranchInfo, FileStatus, StatusCode};

/// Fields after the `XY` code, the last one being the path.
/// `1 XY sub mH mI mW hH hI <path>`
const ORDINARY_FIELDS: usize = 7;
/// `2 XY sub mH mI mW hH hI Xscore <path>\t<origPath>`
const RENAME_FIELDS: usize = 8;
/// `u XY sub m1 m2 m3 mW h1 h2 h3 <path>`
const UNMERGED_FIELDS: usize = 9;

/// Parse porcelain v2 output into file records, in input order.
pub fn parse_status(output: &str) -> Vec<FileStatus> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<FileStatus> {
    let (kind, rest) = line.split_at_checked(2)?;
    match kind {
        "1 " => {
            let ((x, y), path) = split_record(rest, ORDINARY_FIELDS)?;
            Some(FileStatus::new(
                unquote(path),
                StatusCode::from_char(x),
                StatusCode::from_char(y),
            ))
        }
        "2 " => {
            let ((x, y), paths) = split_record(rest, RENAME_FIELDS)?;
            // Keep the new path; the original follows the tab.
            let path = paths.split('\t').next().unwrap_or(paths);
            Some(FileStatus::new(
                unquote(path),
                StatusCode::from_char(x),
                StatusCode::from_char(y),
            ))
        }
        "u " => {
            let (_, path) = split_record(rest, UNMERGED_FIELDS)?;
            Some(FileStatus::new(
                unquote(path),
                StatusCode::Unmerged,
                StatusCode::Unmerged,
            ))
        }
        "? " => Some(FileStatus::new(
            unquote(rest),
            StatusCode::Untracked,
            StatusCode::Untracked,
        )),
        "! " => Some(FileStatus::new(
            unquote(rest),
            StatusCode::Ignored,
            StatusCode::Ignored,
        )),
        // Headers (`# branch.*`) and anything unknown.
        _ => None,
    }
}

/// Split `XY <fields...>` into the two status characters and the path.
///
/// `XY` is positional rather than whitespace-delimited because a column may
/// legitimately be a space. The path is the last of `field_count` fields and
/// keeps any embedded spaces.
fn split_record(rest: &str, field_count: usize) -> Option<((char, char), &str)> {
    let mut chars = rest.char_indices();
    let (_, x) = chars.next()?;
    let (_, y) = chars.next()?;
    let (sep, ' ') = chars.next()? else {
        return None;
    };

    let fields: Vec<&str> = rest[sep + 1..].splitn(field_count, ' ').collect();
    match fields.last() {
        Some(path) if fields.len() == field_count && !path.is_empty() => Some(((x, y), path)),
        _ => None,
    }
}

/// Undo git's C-style quoting of unusual path names. Octal escapes are
/// bytes of the UTF-8 encoded name.
fn unquote(raw: &str) -> String {
    let trimmed = raw.trim_end_matches(['\r', '\n']);
    let Some(inner) = trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return trimmed.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut rest = inner.as_bytes();
    while let Some((&b, tail)) = rest.split_first() {
        rest = tail;
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        let Some((&esc, tail)) = rest.split_first() else {
            bytes.push(b'\\');
            break;
        };
        rest = tail;
        let decoded = match esc {
            b'a' => 0x07,
            b'b' => 0x08,
            b't' => b'\t',
            b'n' => b'\n',
            b'v' => 0x0b,
            b'f' => 0x0c,
            b'r' => b'\r',
            b'0'..=b'3' => match rest {
                [d1 @ b'0'..=b'7', d2 @ b'0'..=b'7', tail @ ..] => {
                    rest = tail;
                    ((esc - b'0') << 6) | ((d1 - b'0') << 3) | (d2 - b'0')
                }
                _ => esc,
            },
            other => other,
        };
        bytes.push(decoded);
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Ahead/behind counts from the `# branch.ab +<ahead> -<behind>` header.
pub fn parse_branch_info(output: &str) -> BranchInfo {
    output
        .lines()
        .find_map(|line| line.strip_prefix("# branch.ab "))
        .and_then(|counts| {
            let mut parts = counts.split_whitespace();
            let ahead = parts.next()?.strip_prefix('+')?.parse().ok()?;
            let behind = parts.next()?.strip_prefix('-')?.parse().ok()?;
            Some(BranchInfo { ahead, behind })
        })
        .unwrap_or_default()
}

/// Newline-delimited path list, as printed by `git diff --name-only`.
pub fn parse_file_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(unquote)
        .collect()
}
