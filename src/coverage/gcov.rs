//! `.gcov` text report parsing.
//!
//! Each report line has the form `count:lineno:source`. Counts map to
//! per-line entries: `-` means the line is not instrumented (`None`),
//! `#####` means never executed (zero, unless a suppression rule applies),
//! `=====` means never executed on an exceptional path (zero), anything
//! else is the execution count.
//!
//! Suppression rules turn a never-executed line into `None` instead of a
//! reported zero: inside an `LCOV_EXCL_START`/`LCOV_EXCL_END` block, a
//! source line starting with `inline` or `static`, a bare closing brace,
//! or an explicit `LCOV_EXCL_LINE` marker.

use regex::Regex;

use crate::coverage::report::LineReport;

/// Parse a `.gcov` report into a per-line coverage array.
pub fn parse_gcov(content: &str) -> LineReport {
    let excl_start = Regex::new(r"\bLCOV_EXCL_START\b").unwrap();
    let excl_end = Regex::new(r"\bLCOV_EXCL_END\b").unwrap();
    let excl_line = Regex::new(r"\bLCOV_EXCL_LINE\b").unwrap();

    let mut report = LineReport::new();
    let mut ignore_block = 0i32;

    for line in content.lines() {
        let mut tokens = line.splitn(3, ':');
        let (Some(count), Some(lineno), Some(source)) =
            (tokens.next(), tokens.next(), tokens.next())
        else {
            continue;
        };

        let count = count.trim();
        let Ok(lineno) = lineno.trim().parse::<u64>() else {
            continue;
        };
        if lineno == 0 {
            // line 0 carries gcov metadata (Source:, Graph:, ...)
            continue;
        }

        if excl_start.is_match(source) {
            ignore_block += 1;
        } else if excl_end.is_match(source) {
            ignore_block -= 1;
        }

        if count == "-" {
            report.push(None);
        } else if count == "#####" {
            let trimmed = source.trim();
            if ignore_block > 0
                || trimmed.starts_with("inline")
                || trimmed.starts_with("static")
                || trimmed == "}"
                || excl_line.is_match(source)
            {
                report.push(None);
            } else {
                report.push(Some(0));
            }
        } else if count == "=====" {
            report.push(Some(0));
        } else if let Ok(value) = count.parse::<u64>() {
            report.push(Some(value));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_counts() {
        let content = "\
        -:    0:Source:array.c\n\
        -:    1:#include <foundation.h>\n\
        5:    2:int counter = 0;\n\
    #####:    3:void never_called(void) {\n\
        -:    4:\n\
    =====:    5:  abort();\n";
        let report = parse_gcov(content);
        assert_eq!(
            report,
            vec![None, Some(5), Some(0), None, Some(0)]
        );
    }

    #[test]
    fn test_static_inline_suppression() {
        // a never-executed static inline is excluded, not a reported zero
        let content = "#####:   42:  static inline int foo() { return 1; }\n";
        let report = parse_gcov(content);
        assert_eq!(report, vec![None]);

        let content = "#####:   43:  inline int bar() { return 2; }\n";
        assert_eq!(parse_gcov(content), vec![None]);
    }

    #[test]
    fn test_closing_brace_suppression() {
        let content = "#####:   10:}\n";
        assert_eq!(parse_gcov(content), vec![None]);
    }

    #[test]
    fn test_lcov_exclusion_markers() {
        let content = "\
        1:    1:int used;\n\
        -:    2://LCOV_EXCL_START\n\
    #####:    3:int unreachable(void) {\n\
    #####:    4:  return -1;\n\
        -:    5://LCOV_EXCL_END\n\
    #####:    6:int reported(void) { return 0; }\n\
    #####:    7:int skipped(void) { return 0; } //LCOV_EXCL_LINE\n";
        let report = parse_gcov(content);
        assert_eq!(
            report,
            vec![Some(1), None, None, None, None, Some(0), None]
        );
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let content = "not a gcov line\n\ngarbage:also\n";
        assert!(parse_gcov(content).is_empty());
    }
}
