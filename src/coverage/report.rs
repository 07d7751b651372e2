//! Per-line coverage reports and the pointwise merge rule.

/// Per-line execution counts for one source file.
///
/// `None` marks a line that is uninstrumented or intentionally excluded;
/// `Some(0)` is a reported never-executed line.
pub type LineReport = Vec<Option<u64>>;

/// Merge `add` into `base`, pointwise:
/// - `None` is overridden by any concrete count,
/// - zero is overridden by any nonzero count,
/// - otherwise counts accumulate by addition,
/// - the shorter report is extended as needed.
pub fn merge_reports(base: &mut LineReport, add: &[Option<u64>]) {
    for (line, &count) in add.iter().enumerate() {
        if line >= base.len() {
            base.push(count);
        } else {
            match (base[line], count) {
                (None, _) => base[line] = count,
                (Some(0), Some(_)) => base[line] = count,
                (Some(current), Some(value)) => base[line] = Some(current + value),
                (Some(_), None) => {}
            }
        }
    }
}
