#[cfg(feature = "chrono")]
use chrono::prelude::*;

/// A parsed PDF date string: `D:YYYYMMDDHHmmSSOHH'mm'`.
///
/// Relaxed-mode validation never normalizes a date it cannot parse this way; it
/// preserves the original bytes verbatim and lets this type be used explicitly
/// by callers who want a structured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Signed offset from UTC in minutes; `None` means the producer omitted the
    /// timezone entirely (legal, if discouraged, under ISO 32000-1 7.9.4).
    pub tz_offset_minutes: Option<i16>,
}

impl PdfDate {
    /// Parse bytes of the form `D:YYYYMMDDHHmmSSOHH'mm'`, where trailing fields
    /// down to the year may be omitted, and `O` is one of `+`, `-`, `Z`.
    pub fn parse(bytes: &[u8]) -> Option<PdfDate> {
        let s = std::str::from_utf8(bytes).ok()?;
        let s = s.strip_prefix("D:").unwrap_or(s);
        if s.len() < 4 {
            return None;
        }
        let year: u16 = s[..4].parse().ok()?;

        let take = |s: &str, at: usize, len: usize, default: u8| -> Option<u8> {
            if s.len() >= at + len {
                s[at..at + len].parse().ok()
            } else {
                Some(default)
            }
        };

        let month = take(s, 4, 2, 1)?;
        let day = take(s, 6, 2, 1)?;
        let hour = take(s, 8, 2, 0)?;
        let minute = take(s, 10, 2, 0)?;
        let second = take(s, 12, 2, 0)?;

        if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 || second > 60 {
            return None;
        }

        let tz_offset_minutes = if s.len() > 14 {
            match s.as_bytes()[14] {
                b'Z' => Some(0),
                sign_byte @ (b'+' | b'-') => {
                    let sign: i16 = if sign_byte == b'+' { 1 } else { -1 };
                    let rest = s[15..].trim_end_matches('\'');
                    let mut parts = rest.splitn(2, '\'');
                    let tz_hour: i16 = parts.next()?.parse().ok()?;
                    let tz_minute: i16 = parts.next().unwrap_or("0").parse().ok()?;
                    Some(sign * (tz_hour * 60 + tz_minute))
                }
                _ => return None,
            }
        } else {
            None
        };

        Some(PdfDate {
            year,
            month,
            day,
            hour,
            minute,
            second,
            tz_offset_minutes,
        })
    }

    pub fn format(&self) -> String {
        let mut out = format!(
            "D:{:04}{:02}{:02}{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        );
        match self.tz_offset_minutes {
            None => {}
            Some(0) => out.push('Z'),
            Some(off) => {
                let sign = if off < 0 { '-' } else { '+' };
                let off = off.unsigned_abs();
                out.push_str(&format!("{sign}{:02}'{:02}'", off / 60, off % 60));
            }
        }
        out
    }
}

#[cfg(feature = "chrono")]
impl From<DateTime<Local>> for PdfDate {
    fn from(date: DateTime<Local>) -> Self {
        let offset_minutes = date.offset().local_minus_utc() / 60;
        PdfDate {
            year: date.year() as u16,
            month: date.month() as u8,
            day: date.day() as u8,
            hour: date.hour() as u8,
            minute: date.minute() as u8,
            second: date.second() as u8,
            tz_offset_minutes: Some(offset_minutes as i16),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PdfDate;

    #[test]
    fn round_trips_with_offset() {
        let raw = b"D:20230131120000+02'30'";
        let date = PdfDate::parse(raw).unwrap();
        assert_eq!(date.year, 2023);
        assert_eq!(date.tz_offset_minutes, Some(150));
        assert_eq!(date.format(), "D:20230131120000+02'30'");
    }

    #[test]
    fn round_trips_with_zulu() {
        let date = PdfDate::parse(b"D:19990101000000Z").unwrap();
        assert_eq!(date.tz_offset_minutes, Some(0));
        assert_eq!(date.format(), "D:19990101000000Z");
    }

    #[test]
    fn truncated_date_uses_defaults() {
        let date = PdfDate::parse(b"D:2020").unwrap();
        assert_eq!((date.month, date.day), (1, 1));
    }

    #[test]
    fn rejects_garbage() {
        assert!(PdfDate::parse(b"not a date").is_none());
    }
}
