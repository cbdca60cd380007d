//! Static, syntactic pre-filter over generated rule code.
//!
//! This is a coarse screen, not a security boundary — the sandbox is. Its
//! job is to fail cheaply on obviously unsafe drafts before paying for
//! sandbox provisioning (spec.md §4.1).

/// Case-insensitive substrings that indicate an attempt to escape the rule
/// sandbox: OS access, process spawning, file I/O, dynamic imports, or
/// mutating standard I/O channels.
const DENYLIST: &[&str] = &[
    "import os",
    "import subprocess",
    "from subprocess",
    "open(",
    "exec(",
    "eval(",
    "__import__",
    "os.system",
    "sys.stdout",
    "sys.stderr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenResult {
    Ok,
    Reject { pattern: String },
}

pub struct StaticScreener;

impl StaticScreener {
    pub fn screen(code: &str) -> ScreenResult {
        let lowered = code.to_ascii_lowercase();
        for pattern in DENYLIST {
            if lowered.contains(pattern) {
                return ScreenResult::Reject {
                    pattern: pattern.to_string(),
                };
            }
        }
        ScreenResult::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_code_passes() {
        let code = "def rule(employee, security, trade_date):\n    return {'allowed': True}\n";
        assert_eq!(StaticScreener::screen(code), ScreenResult::Ok);
    }

    #[test]
    fn rejects_os_import() {
        let code = "import os\ndef rule(e, s, d):\n    return {'allowed': True}\n";
        assert_eq!(
            StaticScreener::screen(code),
            ScreenResult::Reject {
                pattern: "import os".into()
            }
        );
    }

    #[test]
    fn rejects_case_insensitively() {
        let code = "IMPORT OS\ndef rule(e, s, d): return {'allowed': True}";
        assert!(matches!(
            StaticScreener::screen(code),
            ScreenResult::Reject { .. }
        ));
    }

    #[test]
    fn rejects_subprocess_variants() {
        assert!(matches!(
            StaticScreener::screen("import subprocess"),
            ScreenResult::Reject { .. }
        ));
        assert!(matches!(
            StaticScreener::screen("from subprocess import Popen"),
            ScreenResult::Reject { .. }
        ));
    }

    #[test]
    fn rejects_dynamic_import_and_exec() {
        for snippet in ["__import__('os')", "exec('1')", "eval('1')", "open('x')"] {
            assert!(
                matches!(StaticScreener::screen(snippet), ScreenResult::Reject { .. }),
                "expected rejection for {snippet}"
            );
        }
    }
}
