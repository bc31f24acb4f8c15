use crate::model::{SourceVerdict, Verdict};

/// Pass iff every per-source verdict is Pass. NA anywhere is a Fail.
pub fn final_verdict<'a, I>(verdicts: I) -> Verdict
where
    I: IntoIterator<Item = &'a Verdict>,
{
    let mut any = false;
    for v in verdicts {
        any = true;
        if *v != Verdict::Pass {
            return Verdict::Fail;
        }
    }
    if any {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}

/// Fold several sources into one column of the grouped report.
///
/// A source carrying a fixed diagnostic is a Fail. Otherwise all-Pass is a
/// Pass, all-NA is NA, and any mix is a Fail.
pub fn group_verdict(members: &[&SourceVerdict]) -> Verdict {
    if members.is_empty() || members.iter().any(|m| m.diagnostic.is_some()) {
        return Verdict::Fail;
    }
    if members.iter().all(|m| m.verdict == Verdict::Pass) {
        Verdict::Pass
    } else if members.iter().all(|m| m.verdict == Verdict::NA) {
        Verdict::NA
    } else {
        Verdict::Fail
    }
}

/// `source=[r1, r2]; source2=[r3]` in the given source order.
///
/// Exact duplicate strings are dropped per source; sources without
/// reasons are omitted.
pub fn consolidate_reasons<'a, I>(verdicts: I) -> String
where
    I: IntoIterator<Item = &'a SourceVerdict>,
{
    let mut parts = Vec::new();
    for sv in verdicts {
        let mut seen: Vec<String> = Vec::new();
        for reason in &sv.reasons {
            let text = reason.to_string();
            if !seen.contains(&text) {
                seen.push(text);
            }
        }
        if !seen.is_empty() {
            parts.push(format!("{}=[{}]", sv.source, seen.join(", ")));
        }
    }
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Diagnostic, Reason};

    fn sv(source: &str, verdict: Verdict, reasons: &[&str]) -> SourceVerdict {
        SourceVerdict {
            source: source.into(),
            verdict,
            reasons: reasons
                .iter()
                .map(|t| Reason {
                    source: source.into(),
                    column: None,
                    text: t.to_string(),
                })
                .collect(),
            diagnostic: None,
        }
    }

    #[test]
    fn pass_only_when_all_pass() {
        use Verdict::*;
        assert_eq!(final_verdict(&[Pass, Pass]), Pass);
        assert_eq!(final_verdict(&[Pass, NA]), Fail);
        assert_eq!(final_verdict(&[NA, NA]), Fail);
        assert_eq!(final_verdict(&[Fail, Pass]), Fail);
        assert_eq!(final_verdict(&[]), Fail);
    }

    #[test]
    fn flipping_any_single_source_flips_final() {
        use Verdict::*;
        let base = [Pass, Pass, Pass, Pass];
        assert_eq!(final_verdict(&base), Pass);
        for i in 0..base.len() {
            for other in [Fail, NA] {
                let mut flipped = base;
                flipped[i] = other;
                assert_eq!(final_verdict(&flipped), Fail);
            }
        }
    }

    #[test]
    fn reasons_are_ordered_deduplicated_and_bracketed() {
        let rows = vec![
            sv("producer", Verdict::Pass, &[]),
            sv("consumer", Verdict::Fail, &["a", "b", "a"]),
            sv("cmp", Verdict::Fail, &["x"]),
        ];
        assert_eq!(consolidate_reasons(&rows), "consumer=[a, b]; cmp=[x]");
    }

    #[test]
    fn no_reasons_is_empty_string() {
        let rows = vec![sv("p", Verdict::Fail, &[])];
        assert_eq!(consolidate_reasons(&rows), "");
    }

    #[test]
    fn group_fold() {
        let pass = sv("a", Verdict::Pass, &[]);
        let na = sv("b", Verdict::NA, &[]);
        let fail = sv("c", Verdict::Fail, &[]);
        let mut missing = sv("d", Verdict::Fail, &[]);
        missing.diagnostic = Some(Diagnostic::SourceUnreadable);

        assert_eq!(group_verdict(&[&pass, &pass]), Verdict::Pass);
        assert_eq!(group_verdict(&[&na, &na]), Verdict::NA);
        assert_eq!(group_verdict(&[&pass, &na]), Verdict::Fail);
        assert_eq!(group_verdict(&[&pass, &fail]), Verdict::Fail);
        assert_eq!(group_verdict(&[&pass, &missing]), Verdict::Fail);
    }
}
