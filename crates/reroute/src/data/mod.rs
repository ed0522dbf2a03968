//! Reference data, indices and the expansion pipeline.

pub mod advisory;
pub mod airway;
pub mod context;
pub mod coordinates;
pub mod directive;
pub mod expand;
pub mod playbook;
pub mod point;
pub mod procedure;
pub mod reference;
pub mod segment;

/// Normalize an airport identifier to its folded equivalents: `KDFW` also
/// matches `DFW`, and `DFW` also matches `KDFW`.
pub(crate) fn airport_equivalents(code: &str) -> Vec<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return vec![];
    }
    let mut out = vec![code.clone()];
    if code.len() == 4 && code.starts_with('K') {
        out.push(code[1..].to_string());
    }
    if code.len() == 3 {
        out.push(format!("K{code}"));
    }
    out
}

/// Split a whitespace separated field into upper-case tokens.
pub(crate) fn split_tokens(field: &str) -> Vec<String> {
    field.split_whitespace().map(|s| s.to_uppercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn airport_folding() {
        assert_eq!(airport_equivalents("kdfw"), vec!["KDFW", "DFW"]);
        assert_eq!(airport_equivalents("DFW"), vec!["DFW", "KDFW"]);
        assert_eq!(airport_equivalents("CYYZ"), vec!["CYYZ"]);
        assert!(airport_equivalents(" ").is_empty());
    }
}
