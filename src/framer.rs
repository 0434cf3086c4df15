//! Record framing: groups raw log lines into per-record line buffers.
//!
//! A line that starts with a record header opens a new record. Lines that do
//! not look like a header are continuation lines and attach to the record
//! currently being buffered. Anything before the first header is dropped.

use tracing::trace;

use crate::record::line_begins_with_record_header;

/// Lazy iterator over the line groups of a log.
///
/// Only the record currently being assembled is buffered.
pub struct RecordFramer<I> {
    lines: I,
    buffer: Vec<String>,
    exhausted: bool,
}

impl<I> RecordFramer<I> {
    pub fn new(lines: I) -> Self {
        Self {
            lines,
            buffer: Vec::new(),
            exhausted: false,
        }
    }
}

impl<I, S> Iterator for RecordFramer<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        for line in self.lines.by_ref() {
            let line = line.as_ref();
            let starts_record = line_begins_with_record_header(line);

            if starts_record && !self.buffer.is_empty() {
                let record = std::mem::take(&mut self.buffer);
                self.buffer.push(line.trim_end().to_string());
                trace!(lines = record.len(), "framed record");
                return Some(record);
            }

            if starts_record || !self.buffer.is_empty() {
                self.buffer.push(line.trim_end().to_string());
            }
        }

        self.exhausted = true;
        if self.buffer.is_empty() {
            None
        } else {
            let record = std::mem::take(&mut self.buffer);
            trace!(lines = record.len(), "framed final record");
            Some(record)
        }
    }
}

/// Split `lines` into record line groups.
pub fn gather_records<I>(lines: I) -> RecordFramer<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    RecordFramer::new(lines.into_iter())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "2014/Oct/24 19:16:48.062933 111 SYSCALL ExampleComponentTest.ttcn:313(function:ExampleTestedFunction) open(0x7F323232) = -1";

    #[test]
    fn test_garbage_yields_no_records() {
        let input = "
            This does not quite
            look anything like
            a log record to parse.
        ";
        assert_eq!(gather_records(input.lines()).count(), 0);
    }

    #[test]
    fn test_empty_input_yields_no_records() {
        let lines: Vec<String> = vec![];
        assert_eq!(gather_records(lines).count(), 0);
    }

    #[test]
    fn test_single_line_record() {
        let records: Vec<_> = gather_records([SAMPLE]).collect();
        assert_eq!(records, vec![vec![SAMPLE.to_string()]]);
    }

    #[test]
    fn test_multiple_singleline_records() {
        let records: Vec<_> = gather_records([SAMPLE; 3]).collect();
        assert_eq!(records.len(), 3);
        for record in records {
            assert_eq!(record, vec![SAMPLE.to_string()]);
        }
    }

    #[test]
    fn test_continuation_lines_attach_to_header() {
        let lines = [SAMPLE, "/me glares at the log with malicious intent.", "  still here"];
        let records: Vec<_> = gather_records(lines).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0],
            vec![
                SAMPLE.to_string(),
                "/me glares at the log with malicious intent.".to_string(),
                "  still here".to_string(),
            ]
        );
    }

    #[test]
    fn test_leading_noise_is_discarded() {
        let lines = ["preamble", "more preamble", SAMPLE, "body"];
        let records: Vec<_> = gather_records(lines).collect();
        assert_eq!(records, vec![vec![SAMPLE.to_string(), "body".to_string()]]);
    }

    #[test]
    fn test_trailing_whitespace_stripped() {
        let padded = format!("{SAMPLE}   \t");
        let records: Vec<_> = gather_records([padded.as_str(), "body  "]).collect();
        assert_eq!(records[0], vec![SAMPLE.to_string(), "body".to_string()]);
    }

    #[test]
    fn test_exhausted_framer_stays_exhausted() {
        let mut framer = gather_records([SAMPLE]);
        assert!(framer.next().is_some());
        assert!(framer.next().is_none());
        assert!(framer.next().is_none());
    }
}
