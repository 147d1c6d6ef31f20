//! Detection of upgrades that portage refuses to perform unattended.
//!
//! When a requested package is gated behind a keyword, mask, USE or license
//! change, `emerge --pretend` announces the required change with one of a
//! fixed set of phrases. This module is the single place where collaborator
//! output text is load-bearing; everything else consumes exit codes only.

/// Phrases portage prints when it needs a policy change it cannot make
/// itself. Checked against the combined pre-check output.
const INTERVENTION_PHRASES: [&str; 4] = [
    "The following keyword changes are necessary to proceed",
    "The following mask changes are necessary to proceed",
    "The following USE changes are necessary to proceed",
    "The following license changes are necessary to proceed",
];

/// Returns true when `output` shows that the upgrade cannot converge without
/// the operator editing portage policy out-of-band.
pub fn requires_operator_action(output: &str) -> bool {
    INTERVENTION_PHRASES
        .iter()
        .any(|phrase| output.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_pretend_output_needs_no_action() {
        let output = "\
These are the packages that would be merged, in order:

Calculating dependencies... done!
[ebuild     U  ] sys-apps/portage-3.0.66 [3.0.65]

Total: 1 package (1 upgrade), Size of downloads: 3,149 KiB
";
        assert!(!requires_operator_action(output));
    }

    #[test]
    fn keyword_change_needs_action() {
        let output = "\
!!! All ebuilds that could satisfy \"dev-lang/rust\" have been masked.

The following keyword changes are necessary to proceed:
 (see \"package.accept_keywords\" in the portage(5) man page for more details)
# required by @world (argument)
=dev-lang/rust-1.80.0 ~amd64
";
        assert!(requires_operator_action(output));
    }

    #[test]
    fn mask_use_and_license_changes_need_action() {
        for line in [
            "The following mask changes are necessary to proceed:",
            "The following USE changes are necessary to proceed:",
            "The following license changes are necessary to proceed:",
        ] {
            assert!(requires_operator_action(line), "missed: {line}");
        }
    }

    #[test]
    fn scan_is_case_sensitive_like_portage_output() {
        // Portage prints these phrases verbatim; a lowercased echo of one in
        // an ebuild log must not trigger the loop.
        assert!(!requires_operator_action(
            "the following use changes are necessary to proceed"
        ));
    }
}
