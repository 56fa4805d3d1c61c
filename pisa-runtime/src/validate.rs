//! Execution-result validation
//!
//! Compares device memory read-back against expected vectors. Mismatches are
//! reported, not fatal; the consolidated success flag reflects them.

use pisa_spec::Word;

/// Comparison outcome for one output or intermediate.
#[derive(Debug, Clone)]
pub struct ValidationEntry {
    pub name: String,
    pub expected_len: usize,
    pub actual_len: usize,
    /// (index, expected, actual) for each diverging position
    pub mismatches: Vec<(usize, Word, Word)>,
}

impl ValidationEntry {
    pub fn passed(&self) -> bool {
        self.expected_len == self.actual_len && self.mismatches.is_empty()
    }
}

/// Accumulated comparisons for a program run.
#[derive(Debug, Default, Clone)]
pub struct ValidationReport {
    pub entries: Vec<ValidationEntry>,
}

impl ValidationReport {
    pub fn success(&self) -> bool {
        self.entries.iter().all(ValidationEntry::passed)
    }

    /// Compare one vector pair and record the result. With `verbose` set,
    /// every position is logged; otherwise one consolidated line per name.
    pub fn compare(&mut self, name: &str, expected: &[Word], actual: &[Word], verbose: bool) {
        let mut entry = ValidationEntry {
            name: name.to_string(),
            expected_len: expected.len(),
            actual_len: actual.len(),
            mismatches: Vec::new(),
        };

        if expected.len() != actual.len() {
            tracing::warn!(
                name,
                expected = expected.len(),
                actual = actual.len(),
                "size of output does not match ground truth"
            );
            self.entries.push(entry);
            return;
        }

        for (index, (&want, &got)) in expected.iter().zip(actual).enumerate() {
            if want != got {
                entry.mismatches.push((index, want, got));
            }
            if verbose {
                let status = if want == got { "SUCCESS" } else { "FAILURE" };
                tracing::info!(name, index, expected = want, actual = got, status);
            }
        }

        let status = if entry.passed() { "SUCCESS" } else { "FAILURE" };
        tracing::info!(name, status, "result comparison");
        self.entries.push(entry);
    }
}
