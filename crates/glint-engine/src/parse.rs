//! Parsing of free-text model replies into structured candidates.

use glint_types::{Candidate, GlintError, GlintResult};

/// Extract a candidate configuration from one reply.
///
/// The reply must contain a single `## ... ##` segment of comma-separated
/// `name: value` pairs. Any malformed pair (missing colon, non-numeric
/// value) or a missing delimiter fails parsing of this one reply; the
/// caller drops it and the batch continues.
pub fn parse_candidate(text: &str) -> GlintResult<Candidate> {
    let parse_error = || GlintError::Parse {
        response: text.trim().to_string(),
    };

    let payload = text.split("##").nth(1).ok_or_else(parse_error)?;
    if payload.trim().is_empty() {
        return Err(parse_error());
    }

    let mut candidate = Candidate::new();
    for pair in payload.split(',') {
        let (name, value) = pair.split_once(':').ok_or_else(parse_error)?;
        let value: f64 = value.trim().parse().map_err(|_| parse_error())?;
        candidate.insert(name.trim().to_string(), value);
    }
    Ok(candidate)
}
